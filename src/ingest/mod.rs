//! Audio intake.
//!
//! Validates local audio files before they are submitted to the backend
//! as a new run.

pub mod upload;

pub use upload::{AudioUpload, UploadError, MAX_UPLOAD_BYTES};
