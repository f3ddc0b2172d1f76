//! 通報データの型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - Report: 通報（ローカル下書き / サーバー確定版）
//! - ReportStatus: 対応状況
//! - Notification: 管理者からのお知らせ
//! - Artifact: 撮影・録音・選択されたメディア

use serde::{Deserialize, Deserializer, Serialize};

/// 対応状況
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [
        ReportStatus::Pending,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
        }
    }

    /// 表示用の文字列から解釈する（未知の値はPending扱い）
    pub fn parse_lenient(value: &str) -> Self {
        let lower = value.to_lowercase();
        if lower.contains("resolve") {
            ReportStatus::Resolved
        } else if lower.contains("progress") {
            ReportStatus::InProgress
        } else {
            ReportStatus::Pending
        }
    }
}

impl From<String> for ReportStatus {
    fn from(value: String) -> Self {
        ReportStatus::parse_lenient(&value)
    }
}

impl From<ReportStatus> for String {
    fn from(status: ReportStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通報
///
/// 省略されたフィールドはデシリアライズ時に一度だけ既定値で埋める。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub description: String,
    pub issue_type: String,
    pub department: String,
    pub location: String,
    pub lat: String,
    pub lon: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    /// 最新のボイスメモ
    pub voice_note: Option<String>,
    pub voice_notes: Vec<String>,
    #[serde(deserialize_with = "status_or_pending")]
    pub status: ReportStatus,
    pub created_at: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn status_or_pending<'de, D>(deserializer: D) -> Result<ReportStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(ReportStatus::from).unwrap_or_default())
}

/// 管理者からのお知らせ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
}

/// 利用者ロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Government,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Government => "government",
        }
    }

    /// 認識できないロールはNone
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "citizen" => Some(Role::Citizen),
            "government" => Some(Role::Government),
            _ => None,
        }
    }
}

/// 映像のピクセルサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// どちらかが0ならNone
    pub fn non_zero(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// 撮影・録音・選択されたメディア
///
/// `B` はホスト側のバイナリ型（ブラウザでは `web_sys::Blob`、CLIではバイト列）。
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact<B> {
    /// プレビュー用URL（object URL / data URL / ファイルパス）
    pub url: String,
    pub blob: B,
    pub file_name: Option<String>,
    pub mime: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(serde_json::to_string(&ReportStatus::InProgress).unwrap(), "\"In Progress\"");
        let s: ReportStatus = serde_json::from_str("\"Resolved\"").unwrap();
        assert_eq!(s, ReportStatus::Resolved);
    }

    #[test]
    fn test_status_lenient() {
        assert_eq!(ReportStatus::parse_lenient("in progress"), ReportStatus::InProgress);
        assert_eq!(ReportStatus::parse_lenient("RESOLVED"), ReportStatus::Resolved);
        assert_eq!(ReportStatus::parse_lenient("whatever"), ReportStatus::Pending);
    }

    #[test]
    fn test_report_defaults_resolved_once() {
        let json = r#"{"id": 7, "description": "Pothole", "status": null}"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.id, "7");
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.images.is_empty());
        assert!(report.voice_note.is_none());
        assert_eq!(report.location, "");
    }

    #[test]
    fn test_report_camel_case() {
        let report = Report {
            id: "00001".into(),
            issue_type: "Waterlogging".into(),
            created_at: "2024-01-01T00:00:00.000Z".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issueType"], "Waterlogging");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
        assert_eq!(json["status"], "Pending");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("government"), Some(Role::Government));
        assert_eq!(Role::parse("citizen"), Some(Role::Citizen));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_dimensions_non_zero() {
        assert!(Dimensions::non_zero(0, 720).is_none());
        assert_eq!(Dimensions::non_zero(1280, 720).map(|d| d.width), Some(1280));
    }
}
