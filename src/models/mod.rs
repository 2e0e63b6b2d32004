//! # Data Models
//!
//! Task, image and recognition models shared by the store, the orchestrator
//! and the aggregator.

pub mod image;
pub mod recognition;
pub mod task;

// Re-export core models for easy access
pub use image::{ImageOutcome, ImageRecord, NewImage};
pub use recognition::{
    BoundingBox, DetectedFace, Gender, ProviderFace, ProviderResponse, RecognitionResult,
};
pub use task::Task;
