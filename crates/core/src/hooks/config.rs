//! Post-upload hook configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where finished uploads are moved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Move uploaded files into `archive_dir` after a successful upload.
    #[serde(default)]
    pub enabled: bool,

    /// Root of the archive. Files land in `archive_dir/YYYY-MM/`.
    #[serde(default)]
    pub archive_dir: PathBuf,

    /// Directory holding pending copies of queued files. A same-named file
    /// here is deleted once the upload is archived.
    #[serde(default)]
    pub pending_dir: Option<PathBuf>,
}

/// How collection names on upload requests are resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Create a collection when no existing one matches the requested name.
    #[serde(default)]
    pub auto_create: bool,

    /// Privacy of created collections.
    #[serde(default = "default_collection_privacy")]
    pub privacy: String,
}

fn default_collection_privacy() -> String {
    "private".to_string()
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            auto_create: false,
            privacy: default_collection_privacy(),
        }
    }
}
