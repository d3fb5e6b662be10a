//! # Gateway クライアント
//!
//! Gateway APIの呼び出しと、署名付きURLに対する直接PUT/GET。

use anyhow::Context;
use filelink_types::*;

/// Gateway APIクライアント。
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/createNewUrl
    pub async fn create_new_url(&self) -> anyhow::Result<String> {
        let response = self.http.get(self.url("/api/createNewUrl")).send().await?;
        let body: NewUrlResponse = ensure_success(response).await?.json().await?;
        Ok(body.url_key)
    }

    /// POST /api/share/{key}（マルチパートで直接アップロード）
    pub async fn share(
        &self,
        key: &str,
        field: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<Vec<String>> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let response = self
            .http
            .post(self.url(&format!("/api/share/{key}")))
            .multipart(form)
            .send()
            .await?;
        let body: ShareResponse = ensure_success(response).await?.json().await?;
        Ok(body.urls)
    }

    /// GET /api/download/{key}
    pub async fn download(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http
            .get(self.url(&format!("/api/download/{key}")))
            .send()
            .await?;
        Ok(ensure_success(response).await?.bytes().await?.to_vec())
    }

    /// POST /api/postPresignedUrls
    pub async fn request_upload_slots(&self, count: u32) -> anyhow::Result<UploadSlotsResponse> {
        let response = self
            .http
            .post(self.url("/api/postPresignedUrls"))
            .json(&UploadSlotsRequest {
                num_of_files: count,
            })
            .send()
            .await?;
        let slots: UploadSlotsResponse = ensure_success(response).await?.json().await?;
        if slots.urls.len() != slots.object_keys.len() || slots.urls.len() != count as usize {
            anyhow::bail!(
                "アップロード枠の数が不正です: urls={} objectKeys={} 要求={count}",
                slots.urls.len(),
                slots.object_keys.len()
            );
        }
        Ok(slots)
    }

    /// POST /api/getPresignedUrls
    pub async fn resolve_download_urls(&self, keys: &[String]) -> anyhow::Result<Vec<String>> {
        let response = self
            .http
            .post(self.url("/api/getPresignedUrls"))
            .json(&DownloadSlotsRequest {
                keys: keys.to_vec(),
            })
            .send()
            .await?;
        let body: DownloadSlotsResponse = ensure_success(response).await?.json().await?;
        if body.urls.len() != keys.len() {
            anyhow::bail!(
                "ダウンロードURLの数が不正です: {} (要求: {})",
                body.urls.len(),
                keys.len()
            );
        }
        Ok(body.urls)
    }

    /// 署名付きURLへ直接PUTする。
    pub async fn put_presigned(&self, url: &str, data: Vec<u8>) -> anyhow::Result<()> {
        let response = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .context("署名付きURLへのPUTに失敗")?;
        ensure_success(response).await?;
        Ok(())
    }

    /// 署名付きURLから直接GETする。
    pub async fn get_presigned(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("署名付きURLからのGETに失敗")?;
        Ok(ensure_success(response).await?.bytes().await?.to_vec())
    }
}

/// 2xx以外をエラーにする。本文はエラーメッセージに含める。
async fn ensure_success(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("HTTP {status} ({url}): {body}")
}
