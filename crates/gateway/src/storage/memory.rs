//! # インメモリ オブジェクトストレージ実装
//!
//! ローカル開発とテスト用。署名付きURLは Gateway 自身の
//! `/local-storage/{key}?grant=<token>` を指し（キーはパーセントエンコード済み）、発行済みグラントを
//! このストア内で検証する。
//!
//! - アップロードグラントは1回限り有効
//! - ダウンロードグラントは期限内なら何度でも有効
//! - いずれも `発行時刻 + TTL` 以降は無効

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use url::Url;

use super::{ObjectRef, ObjectStore, PresignOperation, StoredObject};
use crate::error::ApiError;

/// 現在時刻（UNIX秒）の取得元。テストでは時刻を手動で進める。
pub trait Clock: Send + Sync {
    fn now_unix_secs(&self) -> u64;
}

/// OSの壁時計。
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// グラント検証エラー。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GrantError {
    #[error("不明な署名付きURLです")]
    Unknown,
    #[error("署名付きURLの対象キーが一致しません")]
    KeyMismatch,
    #[error("署名付きURLは{0}用です")]
    WrongOperation(&'static str),
    #[error("署名付きURLの有効期限が切れています")]
    Expired,
    #[error("署名付きURLは使用済みです")]
    AlreadyUsed,
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

struct Grant {
    key: String,
    operation: PresignOperation,
    expires_at: u64,
    used: bool,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, StoredObject>,
    grants: HashMap<String, Grant>,
}

/// インメモリのObjectStore実装。
pub struct MemoryObjectStore {
    /// 署名付きURLのベース（例: `http://localhost:3000`）
    base_url: String,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_clock(base_url, Arc::new(SystemClock))
    }

    pub fn with_clock(base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // 保持中にpanicする処理はないので、poisonされても中身は整合している
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 署名付きアップロードURLを消費してオブジェクトを保存する。
    pub fn redeem_upload(
        &self,
        key: &str,
        token: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<ObjectRef, ApiError> {
        let now = self.clock.now_unix_secs();
        let mut inner = self.lock();

        let grant = inner.grants.get_mut(token).ok_or(GrantError::Unknown)?;
        check_grant(grant, key, PresignOperation::Upload, now)?;
        if grant.used {
            return Err(GrantError::AlreadyUsed.into());
        }
        grant.used = true;

        inner.objects.insert(
            key.to_string(),
            StoredObject {
                bytes: body,
                content_type: content_type.to_string(),
            },
        );
        Ok(ObjectRef {
            key: key.to_string(),
        })
    }

    /// 署名付きダウンロードURLを検証してオブジェクトを返す。
    pub fn redeem_download(&self, key: &str, token: &str) -> Result<StoredObject, ApiError> {
        let now = self.clock.now_unix_secs();
        let inner = self.lock();

        let grant = inner.grants.get(token).ok_or(GrantError::Unknown)?;
        check_grant(grant, key, PresignOperation::Download, now)?;

        inner
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("オブジェクト {key}")))
    }
}

fn check_grant(
    grant: &Grant,
    key: &str,
    operation: PresignOperation,
    now: u64,
) -> Result<(), GrantError> {
    if grant.key != key {
        return Err(GrantError::KeyMismatch);
    }
    if grant.operation != operation {
        return Err(GrantError::WrongOperation(grant.operation.as_str()));
    }
    if now >= grant.expires_at {
        return Err(GrantError::Expired);
    }
    Ok(())
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<ObjectRef, ApiError> {
        self.lock().objects.insert(
            key.to_string(),
            StoredObject {
                bytes: body,
                content_type: content_type.to_string(),
            },
        );
        Ok(ObjectRef {
            key: key.to_string(),
        })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, ApiError> {
        self.lock()
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("オブジェクト {key}")))
    }

    async fn presign(
        &self,
        operation: PresignOperation,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, ApiError> {
        let now = self.clock.now_unix_secs();
        let token = uuid::Uuid::new_v4().simple().to_string();

        // キーの各セグメントをパーセントエンコードする（`/` は区切りとして残す）
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Upstream(format!("ベースURLが不正です: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::Upstream(format!("ベースURLにパスを付与できません: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("local-storage")
            .extend(key.split('/'));
        url.query_pairs_mut().append_pair("grant", &token);

        let mut inner = self.lock();
        inner.grants.retain(|_, g| g.expires_at > now);
        inner.grants.insert(
            token.clone(),
            Grant {
                key: key.to_string(),
                operation,
                expires_at: now + u64::from(expiry_secs),
                used: false,
            },
        );

        Ok(url.into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// 手動で進める時計。
    pub(crate) struct ManualClock(AtomicU64);

    impl ManualClock {
        pub(crate) fn new(start: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(start)))
        }

        pub(crate) fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_unix_secs(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// URLからグラントトークンを取り出す
    pub(crate) fn grant_token(url: &str) -> &str {
        url.split("grant=").nth(1).unwrap()
    }

    fn forbidden(result: Result<impl std::fmt::Debug, ApiError>) -> String {
        match result {
            Err(ApiError::Forbidden(msg)) => msg,
            other => panic!("Forbidden以外: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_grant_single_use_within_ttl() {
        let clock = ManualClock::new(1_000);
        let store = MemoryObjectStore::with_clock("http://localhost:3000", clock.clone());

        let url = store
            .presign(PresignOperation::Upload, "k1", 60)
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/local-storage/k1?grant="));
        let token = grant_token(&url).to_string();

        clock.advance(30);
        store
            .redeem_upload("k1", &token, Bytes::from_static(b"hello"), "text/plain")
            .unwrap();

        // 2回目は拒否
        let msg = forbidden(store.redeem_upload("k1", &token, Bytes::from_static(b"x"), "text/plain"));
        assert_eq!(msg, GrantError::AlreadyUsed.to_string());

        let stored = store.get("k1").await.unwrap();
        assert_eq!(&stored.bytes[..], b"hello");
        assert_eq!(stored.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_upload_grant_expires_at_ttl() {
        let clock = ManualClock::new(1_000);
        let store = MemoryObjectStore::with_clock("http://localhost:3000", clock.clone());

        let url = store
            .presign(PresignOperation::Upload, "k1", 60)
            .await
            .unwrap();

        clock.advance(60);
        let msg = forbidden(store.redeem_upload(
            "k1",
            grant_token(&url),
            Bytes::from_static(b"late"),
            "text/plain",
        ));
        assert_eq!(msg, GrantError::Expired.to_string());
        assert!(matches!(store.get("k1").await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_grant_bound_to_key_and_operation() {
        let store = MemoryObjectStore::new("http://localhost:3000/");
        let url = store
            .presign(PresignOperation::Download, "k1", 60)
            .await
            .unwrap();
        let token = grant_token(&url);

        let msg = forbidden(store.redeem_upload("k1", token, Bytes::new(), "text/plain"));
        assert_eq!(msg, GrantError::WrongOperation("download").to_string());

        let msg = forbidden(store.redeem_download("other", token));
        assert_eq!(msg, GrantError::KeyMismatch.to_string());

        let msg = forbidden(store.redeem_download("k1", "bogus"));
        assert_eq!(msg, GrantError::Unknown.to_string());
    }

    #[tokio::test]
    async fn test_download_grant_reusable_until_expiry() {
        let clock = ManualClock::new(0);
        let store = MemoryObjectStore::with_clock("http://h", clock.clone());
        store
            .put("k1", Bytes::from_static(b"data"), "application/zip")
            .await
            .unwrap();

        let url = store
            .presign(PresignOperation::Download, "k1", 10)
            .await
            .unwrap();
        let token = grant_token(&url);

        assert_eq!(&store.redeem_download("k1", token).unwrap().bytes[..], b"data");
        clock.advance(9);
        assert_eq!(&store.redeem_download("k1", token).unwrap().bytes[..], b"data");
        clock.advance(1);
        assert!(matches!(
            store.redeem_download("k1", token),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_presign_encodes_reserved_characters() {
        let store = MemoryObjectStore::new("http://localhost:3000");
        let url = store
            .presign(PresignOperation::Download, "dir/report #1?%.txt", 10)
            .await
            .unwrap();
        assert!(
            url.starts_with("http://localhost:3000/local-storage/dir/report%20%231%3F%25.txt?grant="),
            "{url}"
        );
        assert_eq!(url.matches('?').count(), 1);
    }

    #[tokio::test]
    async fn test_presign_rejects_unusable_base_url() {
        let store = MemoryObjectStore::new("not a url");
        assert!(matches!(
            store.presign(PresignOperation::Upload, "k1", 10).await,
            Err(ApiError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_download_grant_for_missing_object() {
        let store = MemoryObjectStore::new("http://h");
        let url = store
            .presign(PresignOperation::Download, "nope", 10)
            .await
            .unwrap();
        assert!(matches!(
            store.redeem_download("nope", grant_token(&url)),
            Err(ApiError::NotFound(_))
        ));
    }
}
