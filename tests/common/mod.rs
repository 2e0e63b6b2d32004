#![allow(dead_code)] // Each test binary uses a different subset of these helpers

pub mod builders;
pub mod mock_recognition;
pub mod strategies;

pub use builders::*;
pub use mock_recognition::*;
