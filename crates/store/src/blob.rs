use crate::Error;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// Object storage for the `inputs` and `processed` buckets (§4.3). The
/// worker writes downloaded source video here before the transform stage
/// reads it back out, and writes the transformed output here before the
/// submitter hands back a presigned URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bucket: Bucket, key: &str, body: Bytes, content_type: &str) -> Result<(), Error>;

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Bytes, Error>;

    async fn presigned_get_url(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: std::time::Duration,
    ) -> Result<String, Error>;

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Inputs,
    Processed,
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    inputs_bucket: String,
    processed_bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, inputs_bucket: String, processed_bucket: String) -> Self {
        Self {
            client,
            inputs_bucket,
            processed_bucket,
        }
    }

    pub async fn from_env(inputs_bucket: String, processed_bucket: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&config);
        Self::new(client, inputs_bucket, processed_bucket)
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Inputs => &self.inputs_bucket,
            Bucket::Processed => &self.processed_bucket,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bucket: Bucket, key: &str, body: Bytes, content_type: &str) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Bytes, Error> {
        let output = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?
            .into_bytes();
        Ok(bytes)
    }

    async fn presigned_get_url(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: std::time::Duration,
    ) -> Result<String, Error> {
        let presign_config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?;
        let presigned = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?;
        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), Error> {
        self.client
            .delete_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Blob(anyhow::anyhow!(e)))?;
        Ok(())
    }
}
