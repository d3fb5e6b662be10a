//! # file-link Gateway
//!
//! 共有キーの払い出し、ファイルの直接アップロード/ダウンロード、
//! およびオブジェクトストレージへの署名付きURL発行を行うHTTP API。
//!
//! ## 役割
//! - 共有キー（UUID v4）の払い出し
//! - マルチパートで受け取ったファイルのストレージへの保存
//! - 保存済みファイルの添付ファイルとしての返却
//! - 署名付きアップロード/ダウンロードURLのバッチ発行
//!
//! ## 起動モード
//! - `AWS_LAMBDA_RUNTIME_API` が設定されていればLambdaハンドラとして動作
//! - それ以外は `LISTEN_ADDR` で待ち受けるスタンドアロンサーバー

mod config;
mod endpoints;
mod error;
mod presign;
mod router;
mod share_key;
mod storage;

use std::sync::Arc;

use config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let on_lambda = std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok();
    init_tracing(on_lambda);

    let config = AppConfig::from_env()?;
    let listen_addr = config.listen_addr.clone();
    tracing::info!(
        upload_ttl_secs = config.upload_ttl_secs,
        download_ttl_secs = config.download_ttl_secs,
        max_batch_size = config.max_batch_size,
        "設定を読み込みました"
    );

    let state = Arc::new(AppState::from_config(config)?);
    let app = router::build_router(state);

    #[cfg(feature = "vendor-aws")]
    if on_lambda {
        tracing::info!("Lambdaランタイムで起動します");
        return lambda_http::run(app)
            .await
            .map_err(|e| anyhow::anyhow!("Lambdaランタイムが異常終了しました: {e}"));
    }

    tracing::info!("Gatewayを {} で起動します", listen_addr);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// ログ出力を初期化する。`RUST_LOG` 未設定時は info。
/// Lambda上ではCloudWatchが時刻を付けるのでJSON・時刻なしで出力する。
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().without_time().init();
    } else {
        builder.init();
    }
}
