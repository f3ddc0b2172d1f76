//! HTTP連携（通報API・逆ジオコーディング）

pub mod geocode;
pub mod reports;

use crate::config::Config;
use crate::error::Result;
use std::time::Duration;

pub use geocode::CliLocator;
pub use reports::HttpUploader;

pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("civic-report/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// 成功ステータスなら本文を返す
async fn read_success(response: reqwest::Response) -> std::result::Result<String, String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(format!("HTTP {}", status))
    }
}
