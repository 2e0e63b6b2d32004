//! # System Constants
//!
//! Core constants that define the operational boundaries of the face scan
//! task system: status aliases, provider query flags, and defaults shared by
//! configuration and the collaborator implementations.

// Re-export state types for convenience
pub use crate::state_machine::TaskState as TaskStatus;

/// Query flags sent with every recognition request
pub mod provider {
    pub const ORIENTATION_CLASSIFIER: &str = "orientation_classifier";
    pub const ROTATE_UNTIL_FACES_FOUND: &str = "rotate_until_faces_found";
    pub const DEMOGRAPHICS: &str = "demographics";

    /// All flags are enabled for every request
    pub const ENABLED_FLAGS: [&str; 3] = [ORIENTATION_CLASSIFIER, ROTATE_UNTIL_FACES_FOUND, DEMOGRAPHICS];

    pub const GENDER_MALE: &str = "male";
    pub const GENDER_FEMALE: &str = "female";
}

/// Task lifecycle operations used as structured log values
pub mod operations {
    pub const CREATE_TASK: &str = "create_task";
    pub const EXTEND_TASK: &str = "extend_task";
    pub const START_TASK: &str = "start_task";
    pub const GET_TASK: &str = "get_task";
    pub const DELETE_TASK: &str = "delete_task";
    pub const RECORD_IMAGE_OUTCOME: &str = "record_image_outcome";
    pub const FINALIZE_TASK: &str = "finalize_task";
}

/// Defaults applied when configuration omits a value
pub mod defaults {
    pub const DATABASE_URL: &str = "postgresql://localhost/face_scan_development";
    pub const DATABASE_MAX_CONNECTIONS: u32 = 10;
    pub const DATABASE_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

    pub const RECOGNITION_URL: &str = "https://backend.facecloud.tevian.ru/api/v1/detect";
    pub const RECOGNITION_MIME_TYPE: &str = "image/jpeg";
    pub const RECOGNITION_REQUESTS_PER_SECOND: u32 = 1;
    pub const RECOGNITION_BURST: u32 = 1;
    pub const RECOGNITION_REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const BLOB_ROOT_DIR: &str = "./files/images";
    pub const BLOB_FILE_EXTENSION: &str = "jpeg";

    pub const CONFIG_FILE: &str = "config/face-scan.yaml";
    pub const ENV_PREFIX: &str = "FACE_SCAN";
}

/// Reason recorded on images whose recognition call was abandoned
pub const CANCELLED_REASON: &str = "cancelled";
