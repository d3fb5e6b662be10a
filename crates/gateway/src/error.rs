//! # Gateway エラー型
//!
//! 全エンドポイントとストレージ層で共通のエラー型。

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// ルートに対して許可されていないHTTPメソッド
    #[error("許可されていないメソッドです")]
    MethodNotAllowed,
    /// パス不正、またはオブジェクトが存在しない
    #[error("見つかりません: {0}")]
    NotFound(String),
    /// 不正なリクエスト（ボディのパース失敗、フォームフィールド欠落等）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 署名付きURLの利用が拒否された（期限切れ、使用済み等）
    #[error("アクセスが拒否されました: {0}")]
    Forbidden(String),
    /// ストレージ操作・署名付きURL生成に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Upstream(String),
    /// レスポンスのシリアライズに失敗
    #[error("レスポンスのシリアライズに失敗: {0}")]
    Serialization(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) | ApiError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
