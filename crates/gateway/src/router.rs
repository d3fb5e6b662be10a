//! # ルーティング
//!
//! ## API エンドポイント
//! - `GET /api/createNewUrl` — 共有キー払い出し
//! - `POST /api/share/{key}` — 直接アップロード
//! - `GET /api/download/{key}` — 直接ダウンロード
//! - `POST /api/generatePresignedUrl` — 署名付きアップロードURL（1件）
//! - `POST /api/postPresignedUrls` — 署名付きアップロードURL（N件）
//! - `POST /api/getPresignedUrls` — 署名付きダウンロードURL
//! - `PUT|GET /local-storage/{*key}` — インメモリバックエンド時のみ
//!
//! 既知のパスへの未対応メソッドは405、未知のパスは404。

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppState;
use crate::endpoints::*;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/api/createNewUrl",
            get(handle_create_new_url).fallback(method_not_allowed),
        )
        .route(
            "/api/share/{key}",
            post(handle_share).fallback(method_not_allowed),
        )
        .route(
            "/api/download/{key}",
            get(handle_download).fallback(method_not_allowed),
        )
        .route(
            "/api/generatePresignedUrl",
            post(handle_generate_presigned_url).fallback(method_not_allowed),
        )
        .route(
            "/api/postPresignedUrls",
            post(handle_post_presigned_urls).fallback(method_not_allowed),
        )
        .route(
            "/api/getPresignedUrls",
            post(handle_get_presigned_urls).fallback(method_not_allowed),
        );

    if state.local_storage.is_some() {
        router = router.route(
            "/local-storage/{*key}",
            get(handle_local_get)
                .put(handle_local_put)
                .fallback(method_not_allowed),
        );
    }

    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
