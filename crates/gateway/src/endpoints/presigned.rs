//! # 署名付きURL発行
//!
//! - `POST /api/generatePresignedUrl` — アップロード枠1件
//! - `POST /api/postPresignedUrls` — アップロード枠N件
//! - `POST /api/getPresignedUrls` — 指定キーのダウンロードURL
//!
//! バイト列はGatewayを経由せず、クライアントとストレージ間で直接やり取りされる。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use filelink_types::*;

use crate::config::AppState;
use crate::error::ApiError;
use crate::presign::{request_upload_slots, resolve_download_slots};
use crate::share_key::ShareKey;
use crate::storage::PresignOperation;

/// POST /api/generatePresignedUrl — 新規キーで署名付きアップロードURLを1件発行。
pub async fn handle_generate_presigned_url(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PresignedUrlResponse>, ApiError> {
    let key = ShareKey::generate();
    let url = state
        .store
        .presign(PresignOperation::Upload, key.as_str(), state.config.upload_ttl_secs)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "署名付きURLの発行に失敗"))?;

    tracing::info!(object_key = %key, "署名付きアップロードURLを発行");
    Ok(Json(PresignedUrlResponse {
        url,
        object_key: key.into_string(),
    }))
}

/// POST /api/postPresignedUrls — `numOfFiles` 件のアップロード枠を発行。
pub async fn handle_post_presigned_urls(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadSlotsRequest>, JsonRejection>,
) -> Result<Json<UploadSlotsResponse>, ApiError> {
    let Json(body) = payload?;

    let slots = request_upload_slots(
        state.store.as_ref(),
        body.num_of_files,
        state.config.max_batch_size,
        state.config.upload_ttl_secs,
    )
    .await
    .inspect_err(|e| tracing::warn!(error = %e, "アップロード枠の発行に失敗"))?;

    tracing::info!(count = slots.object_keys.len(), "アップロード枠を発行");
    Ok(Json(UploadSlotsResponse {
        urls: slots.urls,
        object_keys: slots.object_keys,
    }))
}

/// POST /api/getPresignedUrls — 指定キーの署名付きダウンロードURLを発行。
pub async fn handle_get_presigned_urls(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadSlotsRequest>, JsonRejection>,
) -> Result<Json<DownloadSlotsResponse>, ApiError> {
    let Json(body) = payload?;

    let urls = resolve_download_slots(
        state.store.as_ref(),
        &body.keys,
        state.config.max_batch_size,
        state.config.download_ttl_secs,
    )
    .await
    .inspect_err(|e| tracing::warn!(error = %e, "ダウンロードURLの発行に失敗"))?;

    tracing::info!(count = urls.len(), "ダウンロードURLを発行");
    Ok(Json(DownloadSlotsResponse { urls }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::presign::tests::RecordingStore;

    fn test_state(store: RecordingStore) -> Arc<AppState> {
        Arc::new(AppState::new(AppConfig::default(), Arc::new(store)))
    }

    #[tokio::test]
    async fn test_generate_presigned_url() {
        let state = test_state(RecordingStore::default());
        let response = handle_generate_presigned_url(State(state)).await.unwrap().0;

        assert!(uuid::Uuid::parse_str(&response.object_key).is_ok());
        assert!(response.url.contains(&response.object_key));
        assert!(response.url.ends_with("op=upload&ttl=180"));
    }

    #[tokio::test]
    async fn test_post_presigned_urls_three_files() {
        let state = test_state(RecordingStore::default());
        let response = handle_post_presigned_urls(
            State(state),
            Ok(Json(UploadSlotsRequest { num_of_files: 3 })),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(response.urls.len(), 3);
        assert_eq!(response.object_keys.len(), 3);
        for (url, key) in response.urls.iter().zip(&response.object_keys) {
            assert!(url.contains(key.as_str()));
        }
    }

    #[tokio::test]
    async fn test_get_presigned_urls_uses_download_ttl() {
        let mut config = AppConfig::default();
        config.download_ttl_secs = 42;
        let state = Arc::new(AppState::new(config, Arc::new(RecordingStore::default())));

        let response = handle_get_presigned_urls(
            State(state),
            Ok(Json(DownloadSlotsRequest {
                keys: vec!["x_0".to_string(), "y_0".to_string()],
            })),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(
            response.urls,
            vec![
                "http://mock-storage/x_0?op=download&ttl=42",
                "http://mock-storage/y_0?op=download&ttl=42",
            ]
        );
    }

    #[tokio::test]
    async fn test_presign_failure_is_upstream_error() {
        let state = test_state(RecordingStore {
            fail_at: Some(1),
            ..Default::default()
        });
        let result = handle_post_presigned_urls(
            State(state),
            Ok(Json(UploadSlotsRequest { num_of_files: 2 })),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Upstream(_))));
    }
}
