//! Service layer for Filedepot.

mod files;
mod storage;
mod unit_of_work;

pub use files::{FileService, NewUpload, ALLOWED_EXTENSIONS, MAX_FILE_SIZE};
pub use storage::{resolve_extension, sanitize_file_name, FileStorage};
pub use unit_of_work::UnitOfWork;
