//! # file-link 共有型定義
//!
//! Gateway と CLI の間でやり取りされる HTTP リクエスト/レスポンスの
//! JSON 構造を Rust 構造体として提供する。
//!
//! ## エンコーディング規則
//! - フィールド名はフロントエンドとの互換のため camelCase（`url_key` のみ snake_case）
//! - バッチ系レスポンスの配列はすべてインデックス対応（`urls[i]` ↔ `object_keys[i]`）

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 共有リンクキー
// ---------------------------------------------------------------------------

/// GET /api/createNewUrl レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUrlResponse {
    /// 新しく払い出された共有キー（UUID v4）
    pub url_key: String,
}

// ---------------------------------------------------------------------------
// 直接アップロード
// ---------------------------------------------------------------------------

/// POST /api/share/{key} レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// 保存先のオブジェクトキー
    pub urls: Vec<String>,
}

// ---------------------------------------------------------------------------
// 署名付きURL
// ---------------------------------------------------------------------------

/// POST /api/generatePresignedUrl レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    /// 署名付きアップロードURL（PUT）
    pub url: String,
    /// URLに対応するオブジェクトキー
    pub object_key: String,
}

/// POST /api/postPresignedUrls リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotsRequest {
    /// 要求するアップロード枠の数
    pub num_of_files: u32,
}

/// POST /api/postPresignedUrls レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotsResponse {
    /// 署名付きアップロードURL（PUT）
    pub urls: Vec<String>,
    /// `urls` とインデックス対応するオブジェクトキー
    pub object_keys: Vec<String>,
}

/// POST /api/getPresignedUrls リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSlotsRequest {
    /// ダウンロードしたいオブジェクトキー
    pub keys: Vec<String>,
}

/// POST /api/getPresignedUrls レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSlotsResponse {
    /// `keys` と同順の署名付きダウンロードURL（GET）
    pub urls: Vec<String>,
}
