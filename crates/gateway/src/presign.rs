//! # 署名付きURLのバッチ発行
//!
//! N件のアップロード枠（新規キー + PUT URL）、または呼び出し側が指定した
//! M件のキーに対するGET URLをまとめて発行する。
//!
//! - 結果はインデックス対応（`urls[i]` ↔ `keys[i]`）で入力順を保つ
//! - 1件でも失敗したらバッチ全体を中断し、生成済みの結果は破棄する
//!   （何も永続化していないので補償処理は不要）

use crate::error::ApiError;
use crate::share_key::ShareKey;
use crate::storage::{ObjectStore, PresignOperation};

/// アップロード枠のバッチ。
#[derive(Debug, Clone)]
pub struct UploadSlots {
    pub urls: Vec<String>,
    pub object_keys: Vec<String>,
}

/// `count` 件のアップロード枠を発行する。
pub async fn request_upload_slots(
    store: &dyn ObjectStore,
    count: u32,
    max_batch_size: u32,
    ttl_secs: u32,
) -> Result<UploadSlots, ApiError> {
    if count > max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "numOfFilesが上限を超えています: {count} (上限: {max_batch_size})"
        )));
    }

    let mut urls = Vec::with_capacity(count as usize);
    let mut object_keys = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = ShareKey::generate();
        let url = store
            .presign(PresignOperation::Upload, key.as_str(), ttl_secs)
            .await?;
        urls.push(url);
        object_keys.push(key.into_string());
    }

    Ok(UploadSlots { urls, object_keys })
}

/// 指定キーのダウンロード用URLを入力と同順で発行する。
/// オブジェクトの存在は確認しない。
pub async fn resolve_download_slots(
    store: &dyn ObjectStore,
    keys: &[String],
    max_batch_size: u32,
    ttl_secs: u32,
) -> Result<Vec<String>, ApiError> {
    if keys.len() > max_batch_size as usize {
        return Err(ApiError::BadRequest(format!(
            "keysが上限を超えています: {} (上限: {max_batch_size})",
            keys.len()
        )));
    }
    if let Some(i) = keys.iter().position(|k| k.is_empty()) {
        return Err(ApiError::BadRequest(format!("keys[{i}]が空です")));
    }

    let mut urls = Vec::with_capacity(keys.len());
    for key in keys {
        urls.push(
            store
                .presign(PresignOperation::Download, key, ttl_secs)
                .await?,
        );
    }
    Ok(urls)
}
