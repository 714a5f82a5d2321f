//! Filesystem backend used when no bucket is configured.

use super::{ObjectPage, ObjectStore, join_url};
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

pub struct LocalStore {
    base_dir: PathBuf,
    public_base_url: Option<String>,
}

/// A directory entry with its key. Directory keys end in `/`, so sorting
/// siblings by key yields the bucket's lexicographic order.
struct Entry {
    key: String,
    path: PathBuf,
    is_dir: bool,
}

impl LocalStore {
    pub fn new(base_dir: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_base_url,
        }
    }

    /// Keys map one-to-one onto relative paths; anything that would leave the
    /// base dir is refused.
    fn path_for(&self, key: &str) -> IngestResult<PathBuf> {
        let mut path = self.base_dir.clone();
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." || part.contains('\0') {
                return Err(IngestError::StorageUnavailable(format!(
                    "key {key:?} has no file path under the store"
                )));
            }
            path.push(part);
        }
        Ok(path)
    }

    async fn sorted_children(&self, dir: &Path, dir_key: &str) -> IngestResult<Vec<Entry>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("read dir", dir_key, e)),
        };
        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("read dir", dir_key, e))?
        {
            // keys are strings; other names are not addressable
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| storage_err("stat", &name, e))?
                .is_dir();
            let key = if is_dir {
                format!("{dir_key}{name}/")
            } else {
                format!("{dir_key}{name}")
            };
            children.push(Entry {
                key,
                path: entry.path(),
                is_dir,
            });
        }
        children.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(children)
    }
}

/// Whether a directory can hold keys that match `prefix` and sort after `after`.
fn may_contain(dir_key: &str, prefix: &str, after: Option<&str>) -> bool {
    let prefix_ok = dir_key.starts_with(prefix) || prefix.starts_with(dir_key);
    let after_ok = after.map_or(true, |t| t.starts_with(dir_key) || dir_key > t);
    prefix_ok && after_ok
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
        page_size: i32,
    ) -> IngestResult<ObjectPage> {
        let limit = page_size.max(1) as usize;
        let after = token.as_deref();
        let mut keys = Vec::new();

        // depth-first in key order, stopping one past the page
        let mut stack = vec![self.sorted_children(&self.base_dir, "").await?.into_iter()];
        while let Some(level) = stack.last_mut() {
            let Some(entry) = level.next() else {
                stack.pop();
                continue;
            };
            if entry.is_dir {
                if may_contain(&entry.key, prefix, after) {
                    stack.push(self.sorted_children(&entry.path, &entry.key).await?.into_iter());
                }
            } else if entry.key.starts_with(prefix) && after.map_or(true, |t| entry.key.as_str() > t) {
                keys.push(entry.key);
                if keys.len() > limit {
                    break;
                }
            }
        }

        let next = if keys.len() > limit {
            keys.truncate(limit);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ObjectPage { keys, next })
    }

    async fn get(&self, key: &str) -> IngestResult<Vec<u8>> {
        tokio::fs::read(self.path_for(key)?)
            .await
            .map_err(|e| storage_err("read", key, e))
    }

    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> IngestResult<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create dir", key, e))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| storage_err("write", key, e))?;
        Ok(match &self.public_base_url {
            Some(base) => join_url(base, key),
            None => format!("file://{}", path.display()),
        })
    }

    async fn delete(&self, key: &str) -> IngestResult<()> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("delete", key, e)),
        }
    }
}

fn storage_err(op: &str, key: &str, e: std::io::Error) -> IngestError {
    IngestError::StorageUnavailable(format!("{op} failed for {key}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_list_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), Some("https://files.test".into()));

        let url = store.put("attachments/m1/a.txt", b"hello", "text/plain").await.unwrap();
        assert_eq!(url, "https://files.test/attachments/m1/a.txt");
        store.put("inbox/raw1", b"raw", "message/rfc822").await.unwrap();

        let page = store.list_page("inbox/", None, 10).await.unwrap();
        assert_eq!(page.keys, vec!["inbox/raw1"]);
        assert_eq!(store.get("inbox/raw1").await.unwrap(), b"raw");

        store.delete("inbox/raw1").await.unwrap();
        store.delete("inbox/raw1").await.unwrap();
        assert!(store.list_page("inbox/", None, 10).await.unwrap().keys.is_empty());
    }

    #[tokio::test]
    async fn keys_are_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), None);

        std::fs::create_dir_all(dir.path().join("user1@example.com")).unwrap();
        std::fs::write(dir.path().join("user1@example.com/msg1"), b"raw").unwrap();

        let page = store.list_page("", None, 10).await.unwrap();
        assert_eq!(page.keys, vec!["user1@example.com/msg1"]);
        assert_eq!(store.get("user1@example.com/msg1").await.unwrap(), b"raw");
        store.delete("user1@example.com/msg1").await.unwrap();
        assert!(!dir.path().join("user1@example.com/msg1").exists());
    }

    #[tokio::test]
    async fn keys_outside_the_base_dir_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("store"), None);

        for key in ["../x", "a/../../x", "/etc/passwd", "a//b", "a/./b", ""] {
            assert!(store.put(key, b"x", "text/plain").await.is_err(), "{key}");
            assert!(store.get(key).await.is_err(), "{key}");
            assert!(store.delete(key).await.is_err(), "{key}");
        }
        assert!(!dir.path().join("x").exists());
    }

    #[tokio::test]
    async fn pages_follow_bucket_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), None);
        for key in ["a/b", "a-c", "a/d/e", "b", "ab"] {
            store.put(key, b"x", "text/plain").await.unwrap();
        }

        let first = store.list_page("", None, 2).await.unwrap();
        assert_eq!(first.keys, vec!["a-c", "a/b"]);
        let second = store.list_page("", first.next, 2).await.unwrap();
        assert_eq!(second.keys, vec!["a/d/e", "ab"]);
        let third = store.list_page("", second.next, 2).await.unwrap();
        assert_eq!(third.keys, vec!["b"]);
        assert!(third.next.is_none());

        let scoped = store.list_page("a/", None, 10).await.unwrap();
        assert_eq!(scoped.keys, vec!["a/b", "a/d/e"]);
    }
}
