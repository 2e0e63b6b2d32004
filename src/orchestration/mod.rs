//! # Orchestration
//!
//! Task lifecycle operations and the concurrent recognition run.
//!
//! ## Core Components
//!
//! - **RecognitionOrchestrator**: claims a New task, fans out one recognition
//!   unit per image and drives the task to its terminal status
//! - **Aggregator**: face statistics computed from the stored results on read
//! - **FaceScanService**: create, extend, start, read and delete operations
//!   over the task store and blob store

pub mod aggregator;
pub mod orchestrator;
pub mod task_service;
pub mod types;

pub use aggregator::{aggregate, TaskStats};
pub use orchestrator::RecognitionOrchestrator;
pub use task_service::FaceScanService;
pub use types::{ImageStatus, ImageView, NewTaskImage, TaskRunSummary, TaskStart, TaskView};
