use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use ringline_core::CallRecord;

/// A mutation applied to a call record inside the store's atomic
/// read-modify-write. Runs while the store holds its write lock, so two
/// concurrent handlers can never interleave partial updates on one record.
pub type CallMutator = Box<dyn FnOnce(&mut CallRecord) + Send>;

/// Abstract interface for durable call-record storage, keyed by call SID.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Look up a record by carrier call SID.
    async fn find_by_call_sid(&self, call_sid: &str) -> Result<Option<CallRecord>>;

    /// Insert a record unless one already exists for its call SID.
    /// Returns `true` if the record was inserted. Idempotent by design:
    /// carrier delivery retries must never create duplicates.
    async fn insert_if_absent(&self, record: &CallRecord) -> Result<bool>;

    /// Atomically load, mutate, and persist the record for `call_sid`.
    /// Returns the updated record, or `None` if no record exists.
    async fn update(&self, call_sid: &str, mutate: CallMutator) -> Result<Option<CallRecord>>;

    /// All records, sorted by start time descending (activity feed order).
    async fn list_all(&self) -> Result<Vec<CallRecord>>;
}

/// Simple in-memory call store for tests.
pub struct InMemoryCallStore {
    records: Arc<RwLock<HashMap<String, CallRecord>>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCallStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn find_by_call_sid(&self, call_sid: &str) -> Result<Option<CallRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.get(call_sid).cloned())
    }

    async fn insert_if_absent(&self, record: &CallRecord) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&record.call_sid) {
            return Ok(false);
        }
        records.insert(record.call_sid.clone(), record.clone());
        Ok(true)
    }

    async fn update(&self, call_sid: &str, mutate: CallMutator) -> Result<Option<CallRecord>> {
        let mut records = self.records.write().unwrap();
        match records.get_mut(call_sid) {
            Some(record) => {
                mutate(record);
                record.updated_at = Utc::now();
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<CallRecord>> {
        let records = self.records.read().unwrap();
        let mut all: Vec<CallRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ringline_core::CallStatus;

    #[tokio::test]
    async fn test_insert_if_absent_is_idempotent() {
        let store = InMemoryCallStore::new();
        let record = CallRecord::new_inbound("CA1", "+1A", "+1B");

        assert!(store.insert_if_absent(&record).await.unwrap());
        assert!(!store.insert_if_absent(&record).await.unwrap());

        let found = store.find_by_call_sid("CA1").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn test_update_mutates_and_bumps_updated_at() {
        let store = InMemoryCallStore::new();
        let record = CallRecord::new_inbound("CA1", "+1A", "+1B");
        store.insert_if_absent(&record).await.unwrap();

        let updated = store
            .update("CA1", Box::new(|call| call.status = CallStatus::Completed))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, CallStatus::Completed);
        assert!(updated.updated_at >= record.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_sid_is_none() {
        let store = InMemoryCallStore::new();
        let result = store
            .update("CA-missing", Box::new(|_| {}))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_all_sorted_newest_first() {
        let store = InMemoryCallStore::new();
        let mut older = CallRecord::new_inbound("CA1", "+1A", "+1B");
        older.start_time = older.start_time - Duration::seconds(60);
        let newer = CallRecord::new_inbound("CA2", "+1C", "+1D");

        store.insert_if_absent(&older).await.unwrap();
        store.insert_if_absent(&newer).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].call_sid, "CA2");
        assert_eq!(all[1].call_sid, "CA1");
    }
}
