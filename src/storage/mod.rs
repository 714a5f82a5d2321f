//! Object storage: raw inbound mail is listed and fetched here, attachments are relocated here.

use crate::{app::config::StorageConfig, error::IngestResult};
use async_trait::async_trait;
use std::sync::Arc;

pub mod local;
pub mod memory;
pub mod s3;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

/// One page of a prefix listing. `next` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    pub next: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
        page_size: i32,
    ) -> IngestResult<ObjectPage>;

    async fn get(&self, key: &str) -> IngestResult<Vec<u8>>;

    /// Store `data` under `key` and return its public URL.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> IngestResult<String>;

    /// Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> IngestResult<()>;
}

/// Build the backend selected by the environment.
pub async fn from_config(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config {
        StorageConfig::S3(s3) => Arc::new(S3Store::connect(s3).await),
        StorageConfig::Local {
            base_dir,
            public_base_url,
        } => Arc::new(LocalStore::new(base_dir, public_base_url.clone())),
    }
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
