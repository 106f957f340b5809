//! Moves uploaded files into a dated archive directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::fs;
use tracing::{debug, info, warn};

use super::{ArchiveConfig, HookError, HookPlan, PostUploadHook};
use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::queue::UploadJob;

pub struct ArchiveHook {
    archive_dir: PathBuf,
    pending_dir: Option<PathBuf>,
    audit: Option<AuditHandle>,
}

impl ArchiveHook {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            archive_dir: config.archive_dir.clone(),
            pending_dir: config.pending_dir.clone(),
            audit: None,
        }
    }

    /// Set the audit handle for logging archive moves
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// `archive_dir/YYYY-MM` for the given time.
    pub fn month_dir(&self, now: DateTime<Local>) -> PathBuf {
        self.archive_dir.join(now.format("%Y-%m").to_string())
    }

    /// Attempts a rename, returning false if source and destination are on
    /// different filesystems.
    async fn try_rename(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn move_file(source: &Path, destination: &Path) -> Result<(), std::io::Error> {
        if !Self::try_rename(source, destination).await? {
            debug!(
                "Cross-device move of {}, copying instead",
                source.display()
            );
            fs::copy(source, destination).await?;
            fs::remove_file(source).await?;
        }
        Ok(())
    }

    /// Move the job's file into this month's directory, returning the destination.
    async fn archive(&self, job: &UploadJob) -> Result<PathBuf, HookError> {
        let source = &job.source_path;
        let file_name = source
            .file_name()
            .ok_or_else(|| HookError::NoFileName(source.clone()))?;
        let archive_err = |source| HookError::Archive {
            path: job.source_path.clone(),
            source,
        };

        let month_dir = self.month_dir(Local::now());
        fs::create_dir_all(&month_dir).await.map_err(archive_err)?;

        let destination = month_dir.join(file_name);
        Self::move_file(source, &destination)
            .await
            .map_err(archive_err)?;
        info!("Archived {} to {}", source.display(), destination.display());

        if let Some(pending_dir) = &self.pending_dir {
            let pending_copy = pending_dir.join(file_name);
            if pending_copy != *source {
                match fs::remove_file(&pending_copy).await {
                    Ok(()) => debug!("Removed pending copy {}", pending_copy.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(
                        "Failed to remove pending copy {}: {}",
                        pending_copy.display(),
                        e
                    ),
                }
            }
        }

        Ok(destination)
    }
}

#[async_trait]
impl PostUploadHook for ArchiveHook {
    fn name(&self) -> &str {
        "archive"
    }

    async fn after_upload(&self, job: &UploadJob, _remote_id: &str) -> Result<(), HookError> {
        let event = match self.archive(job).await {
            Ok(destination) => AuditEvent::FileArchived {
                job_id: job.id.clone(),
                source: job.source_path.clone(),
                destination,
            },
            Err(e) => {
                emit_to(
                    &self.audit,
                    AuditEvent::ArchiveFailed {
                        job_id: job.id.clone(),
                        source: job.source_path.clone(),
                        error: e.to_string(),
                    },
                )
                .await;
                return Err(e);
            }
        };
        emit_to(&self.audit, event).await;
        Ok(())
    }

    async fn plan(&self, _jobs: &[UploadJob]) -> Result<Option<HookPlan>, HookError> {
        Ok(Some(HookPlan::Archive {
            destination: self.month_dir(Local::now()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::UploadRequest;
    use crate::testing::fixtures;
    use chrono::TimeZone;

    fn hook_for(archive: &Path, pending: Option<&Path>) -> ArchiveHook {
        ArchiveHook::new(&ArchiveConfig {
            enabled: true,
            archive_dir: archive.to_path_buf(),
            pending_dir: pending.map(Path::to_path_buf),
        })
    }

    #[test]
    fn test_month_dir() {
        let hook = hook_for(Path::new("/archive"), None);
        let when = Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(hook.month_dir(when), PathBuf::from("/archive/2024-03"));
    }

    #[tokio::test]
    async fn test_archives_uploaded_file() {
        let temp = tempfile::tempdir().unwrap();
        let source = fixtures::write_media_file(temp.path(), "clip.mp4", 64);
        let archive = temp.path().join("archive");
        let hook = hook_for(&archive, None);

        let job = UploadJob::from_request("job-1", UploadRequest::new(&source, "Clip"), 64);
        hook.after_upload(&job, "remote-1").await.unwrap();

        let archived = hook.month_dir(Local::now()).join("clip.mp4");
        assert!(!source.exists());
        assert_eq!(std::fs::metadata(&archived).unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_removes_pending_copy() {
        let temp = tempfile::tempdir().unwrap();
        let upload_dir = temp.path().join("upload");
        let pending_dir = temp.path().join("pending");
        std::fs::create_dir_all(&upload_dir).unwrap();
        std::fs::create_dir_all(&pending_dir).unwrap();

        let source = fixtures::write_media_file(&upload_dir, "clip.mp4", 32);
        let pending_copy = fixtures::write_media_file(&pending_dir, "clip.mp4", 32);
        let hook = hook_for(&temp.path().join("archive"), Some(&pending_dir));

        let job = UploadJob::from_request("job-1", UploadRequest::new(&source, "Clip"), 32);
        hook.after_upload(&job, "remote-1").await.unwrap();

        assert!(!pending_copy.exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let hook = hook_for(&temp.path().join("archive"), None);
        let job = UploadJob::from_request(
            "job-1",
            UploadRequest::new(temp.path().join("gone.mp4"), "Gone"),
            0,
        );

        let err = hook.after_upload(&job, "remote-1").await.unwrap_err();
        assert!(matches!(err, HookError::Archive { .. }));
    }

    #[tokio::test]
    async fn test_plan_moves_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let source = fixtures::write_media_file(temp.path(), "clip.mp4", 16);
        let hook = hook_for(&temp.path().join("archive"), None);
        let job = UploadJob::from_request("job-1", UploadRequest::new(&source, "Clip"), 16);

        let plan = hook.plan(std::slice::from_ref(&job)).await.unwrap();
        assert_eq!(
            plan,
            Some(HookPlan::Archive {
                destination: hook.month_dir(Local::now()),
            })
        );
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_audit_records_move_and_failure() {
        use crate::audit::{create_audit_system, AuditFilter, AuditStore, MemoryAuditStore};
        use std::sync::Arc;

        let store = Arc::new(MemoryAuditStore::new(10));
        let (handle, writer) = create_audit_system(store.clone(), 10);
        let writer = tokio::spawn(writer.run());

        let temp = tempfile::tempdir().unwrap();
        let source = fixtures::write_media_file(temp.path(), "clip.mp4", 16);
        let hook = hook_for(&temp.path().join("archive"), None).with_audit(handle);
        let job = UploadJob::from_request("job-1", UploadRequest::new(&source, "Clip"), 16);
        hook.after_upload(&job, "remote-1").await.unwrap();
        // Second attempt finds the source gone
        assert!(hook.after_upload(&job, "remote-1").await.is_err());
        drop(hook);
        writer.await.unwrap();

        let records = store.query(&AuditFilter::new().with_job_id("job-1")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type, "archive_failed");
        assert_eq!(records[1].event_type, "file_archived");
    }
}
