#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Face Scan Core
//!
//! Task lifecycle and concurrent face-recognition orchestration for image
//! scanning tasks.
//!
//! ## Overview
//!
//! Users submit images grouped into a task. Starting the task sends every
//! image to an external recognition provider concurrently, records each
//! per-image outcome as it arrives, and settles the task in `Success`,
//! `PartiallySuccess` or `Failed` depending on how many calls succeeded.
//! Reading a task aggregates face counts, gender split and average ages
//! from the stored results.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Task statuses, transition guards and the CAS-backed state machine
//! - [`orchestration`] - Recognition fan-out, aggregation and the service operations
//! - [`store`] - Task persistence contract with in-memory and PostgreSQL implementations
//! - [`blob`] - Raw image storage
//! - [`recognition`] - Rate-limited recognition provider client
//! - [`models`] - Tasks, images and recognition results
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use face_scan_core::config::ConfigManager;
//! use face_scan_core::orchestration::{FaceScanService, NewTaskImage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! face_scan_core::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//! let service = FaceScanService::from_config(manager.config()).await?;
//!
//! let task_uuid = service.create_task(NewTaskImage::new(std::fs::read("face.jpeg")?)).await?;
//! let summary = service.start_task(task_uuid).await?.wait().await?;
//! let view = service.get_task(task_uuid).await?;
//! println!("{:?}: {} faces", summary.final_status, view.stats.faces_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                                   # Unit and in-memory integration tests
//! DATABASE_URL=postgresql://... cargo test -- --ignored   # PostgreSQL store tests
//! ```

pub mod blob;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod recognition;
pub mod state_machine;
pub mod store;

pub use blob::{BlobError, BlobStore, FsBlobStore, InMemoryBlobStore};
pub use config::{ConfigManager, FaceScanConfig};
pub use constants::TaskStatus;
pub use error::{FaceScanError, FaceScanResult};
pub use models::{ImageOutcome, RecognitionResult, Task};
pub use orchestration::{
    FaceScanService, NewTaskImage, RecognitionOrchestrator, TaskRunSummary, TaskStart, TaskStats,
    TaskView,
};
pub use recognition::{HttpRecognitionClient, RecognitionClient, RecognitionError};
pub use state_machine::{TaskState, TaskStateMachine};
pub use store::{InMemoryTaskStore, PgTaskStore, StoreError, TaskStore};
