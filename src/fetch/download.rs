use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::common::progress::create_download_bar;
use crate::config::RetryConfig;
use crate::error::{BootstrapError, Result};
use crate::ui::prelude::*;

/// Transfers one URL to a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// reqwest-backed downloader that streams the body to disk.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str, connect_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BootstrapError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }

        let pb = create_download_bar(response.content_length(), format!("Downloading {url}"));
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| BootstrapError::permanent(url, format!("cannot create {}: {e}", dest.display())))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify_request_error(url, &e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| BootstrapError::permanent(url, format!("write failed: {e}")))?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.flush()
            .await
            .map_err(|e| BootstrapError::permanent(url, format!("write failed: {e}")))?;
        pb.finish_and_clear();

        Ok(written)
    }
}

fn classify_request_error(url: &str, err: &reqwest::Error) -> BootstrapError {
    if let Some(status) = err.status() {
        return classify_status(url, status);
    }
    if err.is_builder() || err.is_redirect() {
        BootstrapError::permanent(url, err.to_string())
    } else {
        // Timeouts, refused connections and truncated bodies
        BootstrapError::transient(url, err.to_string())
    }
}

/// 408, 429 and 5xx are worth retrying; any other failure status is not.
pub fn classify_status(url: &str, status: StatusCode) -> BootstrapError {
    let reason = format!("HTTP {status}");
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        BootstrapError::transient(url, reason)
    } else {
        BootstrapError::permanent(url, reason)
    }
}

/// Run `downloader` up to `retry.attempts()` times, backing off between
/// transient failures. Permanent failures are returned immediately.
pub async fn download_with_retry<D: Downloader + ?Sized>(
    downloader: &D,
    url: &str,
    dest: &Path,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<u64> {
    let attempts = retry.attempts();
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(BootstrapError::Cancelled);
        }

        match downloader.download(url, dest).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = retry.backoff(attempt);
                emit(
                    Level::Warn,
                    "fetch.download.retry",
                    &format!(
                        "{} {e}; retrying in {}ms ({}/{})",
                        char::from(NerdFont::Warning),
                        delay.as_millis(),
                        attempt + 1,
                        attempts
                    ),
                    Some(serde_json::json!({
                        "url": url,
                        "attempt": attempt + 1,
                        "max_attempts": attempts,
                        "delay_ms": delay.as_millis() as u64,
                    })),
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(BootstrapError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
