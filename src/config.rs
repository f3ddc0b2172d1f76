use crate::error::{CivicError, Result};
use civic_report_common::geo::NOMINATIM_BASE_URL;
use civic_report_common::Role;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "CIVIC_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 通報APIのベースURL（空なら送信せずローカル保存のみ）
    pub api_url: String,
    pub geocoder_url: String,
    /// 通報・お知らせの保存先（未設定なら既定のデータディレクトリ）
    pub data_dir: Option<PathBuf>,
    pub role: Option<Role>,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            geocoder_url: NOMINATIM_BASE_URL.into(),
            data_dir: None,
            role: None,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        // 環境変数を優先
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CivicError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("civic-report").join("config.json"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| CivicError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("civic-report"))
    }

    pub fn has_api(&self) -> bool {
        !self.api_url.trim().is_empty()
    }
}
