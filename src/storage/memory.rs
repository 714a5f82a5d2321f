//! In-process backend for tests and local experiments.

use super::{ObjectPage, ObjectStore};
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{Mutex, MutexGuard},
};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a raw object into the store, the way the mail provider would.
    pub fn insert(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: "message/rfc822".to_string(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn url_for(key: &str) -> String {
        format!("memory://{key}")
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // a poisoned map is still a valid map
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
        page_size: i32,
    ) -> IngestResult<ObjectPage> {
        let objects = self.lock();
        let start = match &token {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Included(prefix.to_string()),
        };
        let limit = page_size.max(1) as usize;
        let mut keys: Vec<String> = objects
            .range((start, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(limit + 1)
            .cloned()
            .collect();
        let next = if keys.len() > limit {
            keys.truncate(limit);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ObjectPage { keys, next })
    }

    async fn get(&self, key: &str) -> IngestResult<Vec<u8>> {
        self.lock()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| IngestError::StorageUnavailable(format!("no such object: {key}")))
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> IngestResult<String> {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(Self::url_for(key))
    }

    async fn delete(&self, key: &str) -> IngestResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}
