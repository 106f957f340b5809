//! Adds completed uploads to their target collection.
//!
//! The collection named on a request is resolved against the account's
//! collections: exact id, then title equal ignoring case, then title prefix,
//! then title substring. With `auto_create` set an unmatched name becomes a
//! new collection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CollectionConfig, HookError, HookPlan, PostUploadHook};
use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::queue::UploadJob;
use crate::sink::{CollectionInfo, RemoteSink};

/// Pick the collection a requested name refers to.
pub fn find_matching_collection<'a>(
    name: &str,
    collections: &'a [CollectionInfo],
) -> Option<&'a CollectionInfo> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    collections
        .iter()
        .find(|c| c.id == name.trim())
        .or_else(|| collections.iter().find(|c| c.title.to_lowercase() == wanted))
        .or_else(|| {
            collections
                .iter()
                .find(|c| c.title.to_lowercase().starts_with(&wanted))
        })
        .or_else(|| {
            collections
                .iter()
                .find(|c| c.title.to_lowercase().contains(&wanted))
        })
}

pub struct CollectionHook {
    sink: Arc<dyn RemoteSink>,
    auto_create: bool,
    privacy: String,
    /// Requested name to resolved collection. Held across a lookup so one
    /// name is never created twice.
    resolved: Mutex<HashMap<String, CollectionInfo>>,
    audit: Option<AuditHandle>,
}

impl CollectionHook {
    pub fn new(sink: Arc<dyn RemoteSink>, config: &CollectionConfig) -> Self {
        Self {
            sink,
            auto_create: config.auto_create,
            privacy: config.privacy.clone(),
            resolved: Mutex::new(HashMap::new()),
            audit: None,
        }
    }

    /// Set the audit handle for logging collection changes
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Find or create the collection for `name`.
    async fn resolve(&self, name: &str) -> Result<CollectionInfo, HookError> {
        let mut resolved = self.resolved.lock().await;
        if let Some(hit) = resolved.get(name) {
            return Ok(hit.clone());
        }

        let collections = self
            .sink
            .list_collections()
            .await
            .map_err(HookError::CollectionLookup)?;

        let collection = match find_matching_collection(name, &collections) {
            Some(found) => {
                debug!("Collection '{}' resolved to {} ('{}')", name, found.id, found.title);
                found.clone()
            }
            None if self.auto_create => {
                let created = self
                    .sink
                    .create_collection(name, &self.privacy)
                    .await
                    .map_err(|source| HookError::CollectionCreate {
                        collection: name.to_string(),
                        source,
                    })?;
                info!("Created collection '{}' ({})", created.title, created.id);
                emit_to(
                    &self.audit,
                    AuditEvent::CollectionCreated {
                        collection_id: created.id.clone(),
                        title: created.title.clone(),
                    },
                )
                .await;
                created
            }
            None => return Err(HookError::CollectionNotFound(name.to_string())),
        };

        resolved.insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    async fn add(&self, remote_id: &str, name: &str) -> Result<CollectionInfo, HookError> {
        let collection = self.resolve(name).await?;
        self.sink
            .add_to_collection(remote_id, &collection.id)
            .await
            .map_err(|source| HookError::Collection {
                remote_id: remote_id.to_string(),
                collection: collection.id.clone(),
                source,
            })?;
        Ok(collection)
    }
}

#[async_trait]
impl PostUploadHook for CollectionHook {
    fn name(&self) -> &str {
        "collection"
    }

    async fn after_upload(&self, job: &UploadJob, remote_id: &str) -> Result<(), HookError> {
        let Some(name) = job.collection.as_deref().filter(|c| !c.trim().is_empty()) else {
            return Ok(());
        };

        match self.add(remote_id, name).await {
            Ok(collection) => {
                info!(
                    "Added {} to collection '{}' ({})",
                    remote_id, collection.title, collection.id
                );
                emit_to(
                    &self.audit,
                    AuditEvent::CollectionItemAdded {
                        job_id: job.id.clone(),
                        remote_id: remote_id.to_string(),
                        collection_id: collection.id,
                        collection_title: collection.title,
                    },
                )
                .await;
                Ok(())
            }
            Err(e) => {
                emit_to(
                    &self.audit,
                    AuditEvent::CollectionItemFailed {
                        job_id: job.id.clone(),
                        remote_id: remote_id.to_string(),
                        collection: name.to_string(),
                        error: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn plan(&self, jobs: &[UploadJob]) -> Result<Option<HookPlan>, HookError> {
        let mut names: Vec<&str> = Vec::new();
        for name in jobs
            .iter()
            .filter_map(|job| job.collection.as_deref())
            .filter(|c| !c.trim().is_empty())
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if names.is_empty() {
            return Ok(None);
        }

        let collections = self
            .sink
            .list_collections()
            .await
            .map_err(HookError::CollectionLookup)?;

        let mut existing: Vec<CollectionInfo> = Vec::new();
        let mut to_create = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match find_matching_collection(name, &collections) {
                Some(found) => {
                    if !existing.iter().any(|c| c.id == found.id) {
                        existing.push(found.clone());
                    }
                }
                None if self.auto_create => to_create.push(name.to_string()),
                None => missing.push(name.to_string()),
            }
        }

        Ok(Some(HookPlan::Collections {
            existing,
            to_create,
            missing,
        }))
    }
}
