use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

/// Pointer to an externally stored binary asset (avatar, resume).
/// Both fields live on the owning user record.
#[derive(Debug, Clone, Serialize)]
pub struct AssetRef {
    pub id: String,
    pub url: String,
}

/// A file lifted out of a multipart request, ready for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, folder: &str, file: UploadFile) -> anyhow::Result<AssetRef>;
    async fn destroy(&self, asset_id: &str) -> anyhow::Result<()>;
}

/// S3/MinIO-backed asset store. The object key doubles as the asset id.
#[derive(Clone)]
pub struct S3Assets {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3Assets {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        public_url: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssetStore for S3Assets {
    async fn upload(&self, folder: &str, file: UploadFile) -> anyhow::Result<AssetRef> {
        let ext = ext_from_mime(&file.content_type)
            .with_context(|| format!("unsupported content type {}", file.content_type))?;
        let key = format!("{}/{}.{}", folder, Uuid::new_v4(), ext);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes))
            .content_type(&file.content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}", key))?;
        let url = format!("{}/{}/{}", self.public_url, self.bucket, key);
        Ok(AssetRef { id: key, url })
    }

    async fn destroy(&self, asset_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(asset_id)
            .send()
            .await
            .with_context(|| format!("s3 delete_object {}", asset_id))?;
        Ok(())
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_ext_from_mime() {
        assert_eq!(super::ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/png"), Some("png"));
        assert_eq!(super::ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(super::ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(super::ext_from_mime("application/octet-stream"), None);
        assert_eq!(super::ext_from_mime("whatever/else"), None);
    }
}
