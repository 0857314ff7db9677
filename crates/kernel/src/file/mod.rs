//! Uploaded-file management.

mod service;
mod storage;

pub use service::{FileService, MAX_FILE_SIZE, sanitize_filename};
pub use storage::{FileStorage, LocalFileStorage};
