//! # PUT/GET /local-storage/{key}?grant=<token>
//!
//! インメモリバックエンドが発行した署名付きURLの受け口。
//! クライアントからはS3の署名付きURLと同じように見える。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use super::share::attachment_response;
use crate::config::AppState;
use crate::error::ApiError;
use crate::storage::MemoryObjectStore;

#[derive(Debug, Deserialize)]
pub struct GrantQuery {
    grant: String,
}

fn local_storage(state: &AppState) -> Result<&MemoryObjectStore, ApiError> {
    state
        .local_storage
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("ローカルストレージは無効です".to_string()))
}

/// PUT — 署名付きアップロードURLを消費して保存する。
pub async fn handle_local_put(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    query: Result<Query<GrantQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let stored = local_storage(&state)?
        .redeem_upload(&key, &query.grant, body, content_type)
        .inspect_err(|e| tracing::warn!(object_key = %key, error = %e, "署名付きアップロードを拒否"))?;

    tracing::debug!(object_key = %stored.key, "署名付きアップロードを受理");
    Ok(StatusCode::OK)
}

/// GET — 署名付きダウンロードURLを検証して返す。
pub async fn handle_local_get(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    query: Result<Query<GrantQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let object = local_storage(&state)?
        .redeem_download(&key, &query.grant)
        .inspect_err(|e| tracing::warn!(object_key = %key, error = %e, "署名付きダウンロードを拒否"))?;

    attachment_response(&key, object.content_type, object.bytes)
}
