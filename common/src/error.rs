//! エラー型定義

use thiserror::Error;

/// 必須フォーム項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Description,
    IssueType,
    CustomIssueType,
    Department,
    Location,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Description => "description",
            FormField::IssueType => "issue type",
            FormField::CustomIssueType => "custom issue type",
            FormField::Department => "department",
            FormField::Location => "location",
        }
    }
}

/// 入力検証エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill all required fields! Missing: {}", .0.label())]
    Missing(FormField),
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Camera or microphone access denied or not available: {0}")]
    Acquisition(String),

    #[error("Camera not ready: no frame within {0} ms")]
    NotReady(u32),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Geolocation unavailable: {0}")]
    Geolocation(String),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
