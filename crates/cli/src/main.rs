//! # file-link CLI
//!
//! Gateway API のコマンドラインクライアント。
//!
//! ## コマンド
//! - `new-url` — 共有キーを払い出す
//! - `share` — Gateway経由でファイルをアップロードする
//! - `upload` — 署名付きURLでファイルを直接アップロードする
//! - `download` — Gateway経由でファイルをダウンロードする
//! - `fetch` — 署名付きURLでファイルを直接ダウンロードする

mod client;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "filelink-cli", about = "file-link CLI")]
struct Cli {
    /// GatewayのベースURL
    #[arg(long, env = "FILELINK_GATEWAY", default_value = "http://localhost:3000")]
    gateway: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 共有キーを払い出す
    NewUrl,
    /// Gateway経由でファイルをアップロードする
    Share {
        /// 共有キー
        key: String,
        /// アップロードするファイル
        file: PathBuf,
        /// フォームフィールド名
        #[arg(long, default_value = "zip-file")]
        field: String,
    },
    /// 署名付きURLでファイルを直接アップロードする
    Upload {
        /// アップロードするファイル（複数可）
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Gateway経由でファイルをダウンロードする
    Download {
        /// オブジェクトキー
        key: String,
        /// 出力先（省略時はキーの末尾要素）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 署名付きURLでファイルを直接ダウンロードする
    Fetch {
        /// オブジェクトキー（複数可）
        #[arg(required = true)]
        keys: Vec<String>,
        /// 出力先ディレクトリ
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.gateway);

    match cli.command {
        Commands::NewUrl => {
            println!("{}", client.create_new_url().await?);
        }
        Commands::Share { key, file, field } => {
            let data = read_file(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| key.clone());
            for stored in client.share(&key, &field, &file_name, data).await? {
                println!("{stored}");
            }
        }
        Commands::Upload { files } => {
            let count = u32::try_from(files.len()).context("ファイル数が多すぎます")?;
            let slots = client.request_upload_slots(count).await?;
            for ((file, url), key) in files.iter().zip(&slots.urls).zip(&slots.object_keys) {
                let data = read_file(file).await?;
                tracing::info!(object_key = %key, file = %file.display(), "アップロード中");
                client.put_presigned(url, data).await?;
                println!("{}\t{}", key, file.display());
            }
        }
        Commands::Download { key, output } => {
            let data = client.download(&key).await?;
            let output = match output {
                Some(output) => output,
                None => local_file_name(&key)?,
            };
            write_file(&output, &data).await?;
            println!("{}", output.display());
        }
        Commands::Fetch { keys, dir } => {
            let urls = client.resolve_download_urls(&keys).await?;
            for (key, url) in keys.iter().zip(&urls) {
                let data = client.get_presigned(url).await?;
                let output = dir.join(local_file_name(key)?);
                write_file(&output, &data).await?;
                println!("{}", output.display());
            }
        }
    }

    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("ファイルを読み込めません: {}", path.display()))
}

async fn write_file(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("ファイルを書き込めません: {}", path.display()))
}

/// オブジェクトキーの末尾要素だけを保存先ファイル名にする。
fn local_file_name(key: &str) -> anyhow::Result<PathBuf> {
    key.rsplit(['/', '\\'])
        .next()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(PathBuf::from)
        .with_context(|| format!("キーからファイル名を決められません: {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name_uses_last_component() {
        assert_eq!(local_file_name("abc_0").unwrap(), PathBuf::from("abc_0"));
        assert_eq!(local_file_name("a/b").unwrap(), PathBuf::from("b"));
        assert_eq!(local_file_name("../x").unwrap(), PathBuf::from("x"));
        assert_eq!(local_file_name("..\\x").unwrap(), PathBuf::from("x"));
        assert_eq!(local_file_name("/etc/passwd").unwrap(), PathBuf::from("passwd"));
    }

    #[test]
    fn test_local_file_name_rejects_unusable_keys() {
        for key in ["", "..", "a/..", "dir/", "."] {
            assert!(local_file_name(key).is_err(), "受理されてしまった: {key:?}");
        }
    }
}
