//! S3-backed `DocumentStore`. The document version is the object's ETag;
//! conditional writes use `If-Match` for updates and `If-None-Match: *` for
//! the first write, so the store itself rejects any write based on a stale
//! read and a lost update cannot happen.

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::{
    decode_items, encode_items, DocVersion, DocumentStore, ListDocument, ListItem, StoreError,
    StoreResult,
};

#[derive(Clone)]
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new<S: Into<String>>(client: aws_sdk_s3::Client, bucket: S) -> Self {
        Self { client, bucket: bucket.into() }
    }
}

/// A failed write precondition comes back as 412, or as 409 when two
/// conditional writes race inside the store itself.
fn is_version_conflict(err: &SdkError<PutObjectError>) -> bool {
    match err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            status == 412 || status == 409
        }
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn read(&self, key: &str) -> StoreResult<(ListDocument, bool)> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                // No document yet is a normal state, not a failure.
                if err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false) {
                    return Ok((ListDocument::default(), false));
                }
                return Err(StoreError::Unavailable(format!("s3 GetObject failed: {err}")));
            }
        };

        let version = resp.e_tag().map(DocVersion::new);
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Unavailable(format!("s3 body read failed: {e}")))?;
        let items = decode_items(&body.into_bytes())?;
        Ok((ListDocument { items, version }, true))
    }

    async fn write_if_version_matches(
        &self,
        key: &str,
        items: &[ListItem],
        expected: Option<&DocVersion>,
    ) -> StoreResult<DocVersion> {
        let bytes = encode_items(items)?;
        let req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(bytes));
        let req = match expected {
            Some(v) => req.if_match(v.as_str()),
            None => req.if_none_match("*"),
        };

        match req.send().await {
            Ok(out) => {
                let etag = out
                    .e_tag()
                    .ok_or_else(|| StoreError::Unavailable("s3 PutObject returned no etag".into()))?;
                debug!("list document '{key}' written, etag {etag}");
                Ok(DocVersion::new(etag))
            }
            Err(err) if is_version_conflict(&err) => {
                Err(StoreError::VersionConflict { key: key.to_string() })
            }
            Err(err) => Err(StoreError::Unavailable(format!("s3 PutObject failed: {err}"))),
        }
    }
}
