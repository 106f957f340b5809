//! Upload jobs and the FIFO queue the worker drains.

mod store;
mod types;

pub use store::QueueStore;
pub use types::{JobStatus, UploadJob, UploadRequest};
