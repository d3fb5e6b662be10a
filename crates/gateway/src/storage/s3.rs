//! # S3互換 オブジェクトストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する実装。

use axum::body::Bytes;

use super::{ObjectRef, ObjectStore, PresignOperation, StoredObject};
use crate::config::S3Config;
use crate::error::ApiError;

/// S3互換ストレージによるObjectStore実装。
pub struct S3ObjectStore {
    bucket: s3::Bucket,
}

impl S3ObjectStore {
    pub fn new(bucket: s3::Bucket) -> Self {
        Self { bucket }
    }

    /// 設定からS3バケットを初期化する。
    ///
    /// `endpoint` 指定時はS3互換サービス向けにパススタイルでアクセスする。
    /// 認証情報が未指定の場合は `AWS_ACCESS_KEY_ID` 等の環境変数を使う
    /// （Lambda実行ロールの一時認証情報はここに入る）。
    pub fn from_config(config: &S3Config) -> anyhow::Result<Self> {
        let credentials = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => s3::creds::Credentials::new(
                Some(access_key),
                Some(secret_key),
                None,
                None,
                None,
            )?,
            _ => s3::creds::Credentials::from_env()?,
        };

        let bucket = match &config.endpoint {
            Some(endpoint) => {
                tracing::info!(s3_endpoint = %endpoint, "カスタムS3エンドポイントを使用");
                let region = s3::Region::Custom {
                    region: config.region.clone(),
                    endpoint: endpoint.clone(),
                };
                s3::Bucket::new(&config.bucket, region, credentials)?.with_path_style()
            }
            None => {
                let region: s3::Region = config.region.parse()?;
                s3::Bucket::new(&config.bucket, region, credentials)?
            }
        };

        Ok(Self::new(*bucket))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<ObjectRef, ApiError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &body, content_type)
            .await
            .map_err(|e| ApiError::Upstream(format!("S3へのアップロード失敗: {e}")))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(ApiError::Upstream(format!(
                "S3へのアップロード失敗: HTTP {status}"
            )));
        }

        Ok(ObjectRef {
            key: key.to_string(),
        })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, ApiError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| ApiError::Upstream(format!("S3からのダウンロード失敗: {e}")))?;

        match response.status_code() {
            200..=299 => {}
            404 => return Err(ApiError::NotFound(format!("オブジェクト {key}"))),
            status => {
                return Err(ApiError::Upstream(format!(
                    "S3からのダウンロード失敗: HTTP {status}"
                )))
            }
        }

        let content_type = response
            .headers()
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(StoredObject {
            bytes: response.bytes().clone(),
            content_type,
        })
    }

    async fn presign(
        &self,
        operation: PresignOperation,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, ApiError> {
        let result = match operation {
            PresignOperation::Upload => self.bucket.presign_put(key, expiry_secs, None, None).await,
            PresignOperation::Download => self.bucket.presign_get(key, expiry_secs, None).await,
        };
        result.map_err(|e| {
            ApiError::Upstream(format!(
                "署名付き{}URL生成失敗: {e}",
                operation.as_str()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> S3ObjectStore {
        S3ObjectStore::from_config(&S3Config {
            bucket: "file-link-test".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
        })
        .unwrap()
    }

    /// 署名はローカル計算のみなのでS3への接続なしで検証できる
    #[tokio::test]
    async fn test_presign_put_contains_key_and_expiry() {
        let store = test_store();
        let url = store
            .presign(PresignOperation::Upload, "abc-123", 180)
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/"));
        assert!(url.contains("/file-link-test/abc-123?"));
        assert!(url.contains("X-Amz-Expires=180"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_get_uses_given_expiry() {
        let store = test_store();
        let url = store
            .presign(PresignOperation::Download, "abc-123", 60)
            .await
            .unwrap();
        assert!(url.contains("/file-link-test/abc-123?"));
        assert!(url.contains("X-Amz-Expires=60"));
    }
}
