//! # 共有キーの払い出しと直接アップロード/ダウンロード
//!
//! 署名付きURLを使わない経路。バイト列はGatewayを経由してストレージに流れる。

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use filelink_types::*;

use crate::config::AppState;
use crate::error::ApiError;
use crate::share_key::ShareKey;

/// GET /api/createNewUrl — 新しい共有キーを払い出す。
pub async fn handle_create_new_url() -> Json<NewUrlResponse> {
    Json(NewUrlResponse {
        url_key: ShareKey::generate().into_string(),
    })
}

/// POST /api/share/{key} — フォームフィールドのファイルを `{key}{suffix}` に保存する。
pub async fn handle_share(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ShareResponse>), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let field_name = state.config.upload_form_field.as_str();
    let object_key = ShareKey::from(key).object_key(&state.config.share_key_suffix);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("マルチパートの読み取りに失敗: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("ファイルの読み取りに失敗: {e}")))?;
        let size = body.len();

        let stored = state
            .store
            .put(&object_key, body, &content_type)
            .await
            .inspect_err(|e| tracing::error!(object_key = %object_key, error = %e, "アップロード失敗"))?;

        tracing::info!(object_key = %stored.key, size, content_type = %content_type, "ファイルを保存");
        return Ok((
            StatusCode::CREATED,
            Json(ShareResponse {
                urls: vec![stored.key],
            }),
        ));
    }

    Err(ApiError::BadRequest(format!(
        "フォームフィールド {field_name} がありません"
    )))
}

/// GET /api/download/{key} — オブジェクトを添付ファイルとして返す。
pub async fn handle_download(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let object = state
        .store
        .get(&key)
        .await
        .inspect_err(|e| tracing::warn!(object_key = %key, error = %e, "ダウンロード失敗"))?;

    attachment_response(&key, object.content_type, object.bytes)
}

/// 保存時のContent-Typeと `Content-Disposition: attachment` 付きのレスポンスを組み立てる。
pub(crate) fn attachment_response(
    key: &str,
    content_type: String,
    bytes: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let filename = key.rsplit('/').next().unwrap_or(key).replace('"', "");
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Serialization(e.to_string()))
}
