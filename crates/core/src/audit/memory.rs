use std::collections::VecDeque;
use std::sync::Mutex;

use super::{AuditError, AuditFilter, AuditRecord, AuditStore};

/// Bounded in-memory audit log. The oldest records are dropped first.
pub struct MemoryAuditStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: VecDeque<AuditRecord>,
}

impl MemoryAuditStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AuditStore for MemoryAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;

        let mut stored = record.clone();
        stored.id = id;
        inner.records.push_back(stored);
        while inner.records.len() > self.capacity {
            inner.records.pop_front();
        }
        Ok(id)
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let offset = usize::try_from(filter.offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .lock()
            .records
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let count = self
            .lock()
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .count();
        i64::try_from(count).map_err(|e| AuditError::Storage(e.to_string()))
    }
}
