use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::ingest::extract::sanitize_file_name;

/// Object storage for raw uploads. Archiving is best effort: the pipeline logs
/// a failure and carries on without a storage key.
#[async_trait]
pub trait UploadArchive: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()>;
}

/// `uploads/<user_id>/<upload_id>-<sanitized file name>`
pub fn upload_key(user_id: Uuid, upload_id: Uuid, file_name: &str) -> String {
    format!(
        "uploads/{user_id}/{upload_id}-{}",
        sanitize_file_name(file_name)
    )
}

pub struct S3Archive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Archive {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl UploadArchive for S3Archive {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Archived upload to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
