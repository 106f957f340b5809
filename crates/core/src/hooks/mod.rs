//! Post-upload hooks.
//!
//! Hooks run after a job completes successfully. A failing hook is logged and
//! counted but never changes the job's outcome. Before a dry run each hook
//! may describe what it would do through [`PostUploadHook::plan`].

mod archive;
mod collection;
mod config;

pub use archive::ArchiveHook;
pub use collection::{find_matching_collection, CollectionHook};
pub use config::{ArchiveConfig, CollectionConfig};

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::queue::UploadJob;
use crate::sink::{CollectionInfo, SinkError};

/// Errors from post-upload hooks.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to add {remote_id} to collection {collection}: {source}")]
    Collection {
        remote_id: String,
        collection: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to list collections: {0}")]
    CollectionLookup(#[source] SinkError),

    #[error("no collection matches '{0}'")]
    CollectionNotFound(String),

    #[error("failed to create collection '{collection}': {source}")]
    CollectionCreate {
        collection: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source path has no file name: {0}")]
    NoFileName(PathBuf),
}

/// What a hook would do for a batch, reported by dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HookPlan {
    Collections {
        /// Existing collections the batch would be added to.
        existing: Vec<CollectionInfo>,
        /// Names that would be created.
        to_create: Vec<String>,
        /// Names with no match that would not be created.
        missing: Vec<String>,
    },
    Archive {
        destination: PathBuf,
    },
}

/// Work to run once a job has been confirmed by the remote sink.
#[async_trait]
pub trait PostUploadHook: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &str;

    async fn after_upload(&self, job: &UploadJob, remote_id: &str) -> Result<(), HookError>;

    /// Describe what this hook would do for `jobs` without side effects.
    async fn plan(&self, _jobs: &[UploadJob]) -> Result<Option<HookPlan>, HookError> {
        Ok(None)
    }
}
