//! # オブジェクトストレージ
//!
//! バケット型ストレージ（AWS S3, MinIO 等）の抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュール、ローカル開発・テスト用の
//! インメモリ実装は `memory` サブモジュールを参照。

pub mod memory;
#[cfg(feature = "vendor-aws")]
pub mod s3;

pub use memory::MemoryObjectStore;
#[cfg(feature = "vendor-aws")]
pub use s3::S3ObjectStore;

use axum::body::Bytes;

use crate::error::ApiError;

/// 署名付きURLで許可する操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignOperation {
    /// PUT（クライアントからの直接アップロード）
    Upload,
    /// GET（クライアントへの直接ダウンロード）
    Download,
}

impl PresignOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresignOperation::Upload => "upload",
            PresignOperation::Download => "download",
        }
    }
}

/// `put` の結果。
#[derive(Debug, Clone)]
pub struct ObjectRef {
    /// 保存先オブジェクトキー
    pub key: String,
}

/// `get` で取得したオブジェクト本体とメタデータ。
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    /// 保存時のContent-Type
    pub content_type: String,
}

/// オブジェクトストレージの抽象インターフェース。
///
/// 実装はリクエスト間で共有されるため、内部に可変状態を持つ場合は
/// 自前で同期すること。
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// オブジェクトを保存する。
    async fn put(&self, key: &str, body: Bytes, content_type: &str)
        -> Result<ObjectRef, ApiError>;

    /// オブジェクトを取得する。存在しない場合は `ApiError::NotFound`。
    async fn get(&self, key: &str) -> Result<StoredObject, ApiError>;

    /// 指定操作の署名付きURLを生成する。オブジェクトの存在は確認しない。
    async fn presign(
        &self,
        operation: PresignOperation,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, ApiError>;
}
