use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivicError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] civic_report_common::Error),

    #[error("入力エラー: {0}")]
    Validation(#[from] civic_report_common::ValidationError),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("メディア読み込みエラー: {0}")]
    MediaLoad(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("添付できるメディアが見つかりません: {0}")]
    NoMediaFound(String),

    #[error("通報が見つかりません: {0}")]
    ReportNotFound(String),

    #[error("この操作には{0}ロールが必要です。`civic-report role` で切り替えてください")]
    RoleRequired(&'static str),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

pub type Result<T> = std::result::Result<T, CivicError>;
