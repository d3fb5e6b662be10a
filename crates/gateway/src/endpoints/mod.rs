//! # Gatewayエンドポイント

pub mod local_storage;
pub mod presigned;
pub mod share;

pub use local_storage::{handle_local_get, handle_local_put};
pub use presigned::{
    handle_generate_presigned_url, handle_get_presigned_urls, handle_post_presigned_urls,
};
pub use share::{handle_create_new_url, handle_download, handle_share};

use crate::error::ApiError;

/// 既知のパスに対する未対応メソッド。
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// 未知のパス（キーのセグメントが欠けたパスを含む）。
pub async fn not_found() -> ApiError {
    ApiError::NotFound("パスが見つかりません".to_string())
}
