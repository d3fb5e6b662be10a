//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 共有状態は起動時に一度だけ構築し、以降は読み取り専用。

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;

use crate::storage::{MemoryObjectStore, ObjectStore};

/// アップロード用署名付きURLの既定有効期限（秒）
pub const DEFAULT_UPLOAD_TTL_SECS: u32 = 180;
/// ダウンロード用署名付きURLの既定有効期限（秒）
pub const DEFAULT_DOWNLOAD_TTL_SECS: u32 = 60;
/// S3の署名付きURL有効期限の上限（7日）
pub const MAX_PRESIGN_TTL_SECS: u32 = 7 * 24 * 60 * 60;
/// 1リクエストで扱うバッチ件数の既定上限
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 100;
/// リクエストボディの既定上限（100MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// ストレージバックエンドの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3互換ストレージ
    S3,
    /// インメモリ（ローカル開発用）
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("STORAGE_BACKENDは s3 か memory である必要があります: {other}"),
        }
    }
}

/// S3接続設定。
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// S3互換サービスのエンドポイント（未指定ならAWS）
    #[cfg(feature = "vendor-aws")]
    pub endpoint: Option<String>,
    #[cfg(feature = "vendor-aws")]
    pub access_key: Option<String>,
    #[cfg(feature = "vendor-aws")]
    pub secret_key: Option<String>,
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// スタンドアロン起動時の待ち受けアドレス
    pub listen_addr: String,
    pub backend: StorageBackend,
    pub s3: S3Config,
    /// アップロード用署名付きURLの有効期限（秒）
    pub upload_ttl_secs: u32,
    /// ダウンロード用署名付きURLの有効期限（秒）
    pub download_ttl_secs: u32,
    /// `numOfFiles` とキーリストの上限
    pub max_batch_size: u32,
    /// リクエストボディの上限（バイト）
    pub max_upload_bytes: usize,
    /// 直接アップロードでファイルを受け取るフォームフィールド名
    pub upload_form_field: String,
    /// 直接アップロード時に共有キーへ付与するサフィックス
    pub share_key_suffix: String,
    /// インメモリバックエンドが発行するURLのベース
    pub public_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            backend: StorageBackend::S3,
            s3: S3Config {
                bucket: "file-link-s3bucket".to_string(),
                region: "us-east-2".to_string(),
                #[cfg(feature = "vendor-aws")]
                endpoint: None,
                #[cfg(feature = "vendor-aws")]
                access_key: None,
                #[cfg(feature = "vendor-aws")]
                secret_key: None,
            },
            upload_ttl_secs: DEFAULT_UPLOAD_TTL_SECS,
            download_ttl_secs: DEFAULT_DOWNLOAD_TTL_SECS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_form_field: "zip-file".to_string(),
            share_key_suffix: "_0".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する（テスト用に環境変数を差し替えられる）。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            backend: parse_var(&lookup, "STORAGE_BACKEND", defaults.backend)?,
            s3: S3Config {
                bucket: lookup("S3_BUCKET").unwrap_or(defaults.s3.bucket),
                region: lookup("S3_REGION").unwrap_or(defaults.s3.region),
                #[cfg(feature = "vendor-aws")]
                endpoint: lookup("S3_ENDPOINT"),
                #[cfg(feature = "vendor-aws")]
                access_key: lookup("S3_ACCESS_KEY"),
                #[cfg(feature = "vendor-aws")]
                secret_key: lookup("S3_SECRET_KEY"),
            },
            upload_ttl_secs: parse_var(&lookup, "PRESIGN_UPLOAD_TTL_SECS", defaults.upload_ttl_secs)?,
            download_ttl_secs: parse_var(
                &lookup,
                "PRESIGN_DOWNLOAD_TTL_SECS",
                defaults.download_ttl_secs,
            )?,
            max_batch_size: parse_var(&lookup, "MAX_BATCH_SIZE", defaults.max_batch_size)?,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            upload_form_field: lookup("UPLOAD_FORM_FIELD").unwrap_or(defaults.upload_form_field),
            share_key_suffix: lookup("SHARE_KEY_SUFFIX").unwrap_or(defaults.share_key_suffix),
            public_base_url: lookup("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, ttl) in [
            ("PRESIGN_UPLOAD_TTL_SECS", self.upload_ttl_secs),
            ("PRESIGN_DOWNLOAD_TTL_SECS", self.download_ttl_secs),
        ] {
            if ttl == 0 || ttl > MAX_PRESIGN_TTL_SECS {
                anyhow::bail!("{name}は1〜{MAX_PRESIGN_TTL_SECS}秒である必要があります: {ttl}");
            }
        }
        if self.max_batch_size == 0 {
            anyhow::bail!("MAX_BATCH_SIZEは1以上である必要があります");
        }
        if self.upload_form_field.is_empty() {
            anyhow::bail!("UPLOAD_FORM_FIELDが空です");
        }
        Ok(())
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{name}の値が不正です: {raw}")),
        None => Ok(default),
    }
}

/// Gatewayの共有状態。
pub struct AppState {
    pub config: AppConfig,
    /// オブジェクトストレージ（S3互換等、トレイトで抽象化）
    pub store: Arc<dyn ObjectStore>,
    /// インメモリバックエンド選択時のみ。`/local-storage` ルートで署名付きURLを受け付ける。
    pub local_storage: Option<Arc<MemoryObjectStore>>,
}

impl AppState {
    /// 任意のObjectStoreで構築する。
    #[cfg(any(feature = "vendor-aws", test))]
    pub fn new(config: AppConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            store,
            local_storage: None,
        }
    }

    /// インメモリバックエンドで構築する。
    pub fn with_memory_store(config: AppConfig, store: Arc<MemoryObjectStore>) -> Self {
        Self {
            config,
            store: store.clone(),
            local_storage: Some(store),
        }
    }

    /// 設定に従ってバックエンドを初期化する。
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("インメモリストレージで起動します（開発環境用）");
                let store = Arc::new(MemoryObjectStore::new(config.public_base_url.clone()));
                Ok(Self::with_memory_store(config, store))
            }
            #[cfg(feature = "vendor-aws")]
            StorageBackend::S3 => {
                let store = crate::storage::S3ObjectStore::from_config(&config.s3)?;
                tracing::info!(bucket = %config.s3.bucket, region = %config.s3.region, "S3ストレージを使用");
                Ok(Self::new(config, Arc::new(store)))
            }
            #[cfg(not(feature = "vendor-aws"))]
            StorageBackend::S3 => {
                anyhow::bail!(
                    "S3バックエンド（バケット {}, リージョン {}）には vendor-aws フィーチャーが必要です",
                    config.s3.bucket,
                    config.s3.region
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.s3.bucket, "file-link-s3bucket");
        assert_eq!(config.s3.region, "us-east-2");
        assert_eq!(config.upload_ttl_secs, DEFAULT_UPLOAD_TTL_SECS);
        assert_eq!(config.download_ttl_secs, DEFAULT_DOWNLOAD_TTL_SECS);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.upload_form_field, "zip-file");
        assert_eq!(config.share_key_suffix, "_0");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("S3_BUCKET", "other"),
            ("PRESIGN_UPLOAD_TTL_SECS", "60"),
            ("PRESIGN_DOWNLOAD_TTL_SECS", " 3600 "),
            ("MAX_BATCH_SIZE", "5"),
        ]))
        .unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.s3.bucket, "other");
        assert_eq!(config.upload_ttl_secs, 60);
        assert_eq!(config.download_ttl_secs, 3600);
        assert_eq!(config.max_batch_size, 5);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for pairs in [
            [("PRESIGN_UPLOAD_TTL_SECS", "0")],
            [("PRESIGN_DOWNLOAD_TTL_SECS", "604801")],
            [("PRESIGN_UPLOAD_TTL_SECS", "abc")],
            [("MAX_BATCH_SIZE", "0")],
            [("STORAGE_BACKEND", "dynamodb")],
        ] {
            assert!(
                AppConfig::from_lookup(lookup_from(&pairs)).is_err(),
                "受理されてしまった: {pairs:?}"
            );
        }
    }

    #[cfg(not(feature = "vendor-aws"))]
    #[test]
    fn test_s3_backend_requires_vendor_feature() {
        let config = AppConfig::from_lookup(lookup_from(&[("S3_BUCKET", "other")])).unwrap();
        let err = match AppState::from_config(config) {
            Ok(_) => panic!("vendor-aws なしでS3バックエンドが構築された"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("other"), "{err}");
    }

    #[test]
    fn test_memory_backend_exposes_local_storage() {
        let config = AppConfig::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")])).unwrap();
        let state = AppState::from_config(config).unwrap();
        assert!(state.local_storage.is_some());
    }
}
