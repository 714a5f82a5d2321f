//! S3 (or S3-compatible) backend.

use super::{ObjectPage, ObjectStore, join_url};
use crate::{
    app::config::S3Config,
    error::{IngestError, IngestResult},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{Client, error::ProvideErrorMetadata, primitives::ByteStream};
use tracing::debug;

pub struct S3Store {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Store {
    pub async fn connect(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "mailbucket-env",
            ));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let shared_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(config.force_path_style)
            .build();

        let public_base_url = config.public_base_url.clone().unwrap_or_else(|| {
            format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region)
        });

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
        page_size: i32,
    ) -> IngestResult<ObjectPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(page_size)
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| {
                IngestError::StorageUnavailable(format!("s3 list failed for prefix {prefix:?}: {e}"))
            })?;

        let keys = resp
            .contents()
            .iter()
            .map(|obj| obj.key().unwrap_or_default().to_string())
            .collect();
        let next = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ObjectPage { keys, next })
    }

    async fn get(&self, key: &str) -> IngestResult<Vec<u8>> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::StorageUnavailable(format!("s3 get failed for {key}: {e}")))?;
        let body = obj.body.collect().await.map_err(|e| {
            IngestError::StorageUnavailable(format!("s3 body read failed for {key}: {e}"))
        })?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> IngestResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| IngestError::StorageUnavailable(format!("s3 put failed for {key}: {e}")))?;
        Ok(join_url(&self.public_base_url, key))
    }

    async fn delete(&self, key: &str) -> IngestResult<()> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            // some S3-compatible stores report missing keys instead of returning 204
            Err(e) if matches!(e.code(), Some("NoSuchKey" | "NotFound")) => {
                debug!("delete of missing object {key} treated as done");
                Ok(())
            }
            Err(e) => Err(IngestError::StorageUnavailable(format!(
                "s3 delete failed for {key}: {e}"
            ))),
        }
    }
}
