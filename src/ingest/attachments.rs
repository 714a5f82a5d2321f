//! Attachment relocation: parsed attachment payloads are re-uploaded under a per-message key.

use crate::{
    error::IngestResult,
    models::email::ParsedAttachment,
    storage::ObjectStore,
    util::{sanitize_path_component, sanitize_slash_path, with_timeout},
};
use std::{collections::HashSet, time::Duration};
use tracing::warn;

/// `{prefix}/{message id}/{file name}`. Unnamed parts become `attachment-{n}`.
pub fn attachment_key(prefix: &str, message_id: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        prefix.trim_matches('/'),
        sanitize_slash_path(message_id),
        sanitize_path_component(filename)
    )
}

/// Upload one attachment and return its URL.
pub async fn relocate_one(
    store: &dyn ObjectStore,
    timeout: Duration,
    key: &str,
    attachment: &ParsedAttachment,
) -> IngestResult<String> {
    with_timeout(
        timeout,
        "attachment upload",
        store.put(key, &attachment.data, &attachment.content_type),
    )
    .await
}

/// Upload every attachment; a failed upload is logged and left out of the result.
pub async fn relocate_attachments(
    store: &dyn ObjectStore,
    timeout: Duration,
    prefix: &str,
    message_id: &str,
    attachments: &[ParsedAttachment],
) -> Vec<String> {
    let mut urls = Vec::with_capacity(attachments.len());
    let mut used_names = HashSet::new();
    for (i, attachment) in attachments.iter().enumerate() {
        let mut name = attachment
            .filename
            .clone()
            .unwrap_or_else(|| format!("attachment-{}", i + 1));
        if !used_names.insert(sanitize_path_component(&name)) {
            name = format!("{}_{name}", i + 1);
        }
        let key = attachment_key(prefix, message_id, &name);
        match relocate_one(store, timeout, &key, attachment).await {
            Ok(url) => urls.push(url),
            Err(e) => warn!("attachment {key} of {message_id} dropped: {e}"),
        }
    }
    urls
}
