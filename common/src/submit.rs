//! 通報の組み立てと送信
//!
//! 1. ローカルのストアへ即座に書き込む（楽観的コミット）
//! 2. サーバーへアップロードを試みる
//! 3. 成功ならサーバー版で同じidの通報を置き換える。失敗でも巻き戻さない

use crate::error::{Error, FormField, Result, ValidationError};
use crate::overlay::OverlayInfo;
use crate::store::{Persistence, ReportStore};
use crate::types::{Artifact, Report, ReportStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::cell::RefCell;

/// 「その他」を選んだ場合は自由入力欄の値を使う
pub const OTHER_ISSUE_TYPE: &str = "Other";

pub const ISSUE_TYPES: &[&str] = &[
    "Broken Street Light",
    "Garbage Overflow",
    "Road Blockage",
    "Waterlogging",
    "Illegal Parking",
    "Drainage Issue",
    OTHER_ISSUE_TYPE,
];

pub const DEPARTMENTS: &[&str] = &["PWD", "Electricity", "Municipality", "Sanitation", "Traffic"];

/// 入力フォーム
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportForm {
    pub description: String,
    pub issue_type: String,
    pub custom_issue_type: String,
    pub department: String,
    pub location: String,
}

impl ReportForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// 検証済みフォーム（種別は解決済み）
#[derive(Debug, Clone, PartialEq)]
pub struct ValidForm {
    pub description: String,
    pub issue_type: String,
    pub department: String,
    pub location: String,
}

fn required(value: &str, field: FormField) -> std::result::Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value.to_string())
    }
}

pub fn validate(form: &ReportForm) -> std::result::Result<ValidForm, ValidationError> {
    let description = required(&form.description, FormField::Description)?;
    let mut issue_type = required(&form.issue_type, FormField::IssueType)?;
    let department = required(&form.department, FormField::Department)?;
    let location = required(&form.location, FormField::Location)?;
    if issue_type == OTHER_ISSUE_TYPE {
        issue_type = required(&form.custom_issue_type, FormField::CustomIssueType)?;
    }
    Ok(ValidForm {
        description,
        issue_type,
        department,
        location,
    })
}

/// 送信時点のメディア
#[derive(Debug, Clone)]
pub struct MediaSnapshot<B> {
    pub images: Vec<Artifact<B>>,
    pub videos: Vec<Artifact<B>>,
    /// 新しい順
    pub voice_notes: Vec<Artifact<B>>,
}

impl<B> Default for MediaSnapshot<B> {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            videos: Vec::new(),
            voice_notes: Vec::new(),
        }
    }
}

/// multipartの1ファイル
#[derive(Debug, Clone)]
pub struct UploadFile<B> {
    pub field: &'static str,
    pub file_name: String,
    pub mime: String,
    pub blob: B,
}

/// multipartの本文
#[derive(Debug, Clone)]
pub struct UploadPayload<B> {
    pub report_id: String,
    pub fields: Vec<(&'static str, String)>,
    pub files: Vec<UploadFile<B>>,
}

/// 通報の送信先
#[allow(async_fn_in_trait)]
pub trait ReportUploader {
    type Blob;

    /// 成功時はサーバーが保存した正式な通報を返す
    async fn upload(&self, payload: &UploadPayload<Self::Blob>) -> Result<Report>;
}

/// 件数+1を5桁ゼロ埋め
pub fn next_report_id(len: usize) -> String {
    format!("{:05}", len + 1)
}

/// 検証してローカルに即時コミットし、アップロード用の本文を返す
pub fn commit_local<P: Persistence, B: Clone>(
    store: &mut ReportStore<P>,
    form: &ReportForm,
    media: &MediaSnapshot<B>,
    coords: &OverlayInfo,
    now: DateTime<Utc>,
) -> std::result::Result<UploadPayload<B>, ValidationError> {
    let valid = validate(form)?;
    let id = next_report_id(store.len());

    let urls = |items: &[Artifact<B>]| items.iter().map(|a| a.url.clone()).collect::<Vec<_>>();
    let report = Report {
        id: id.clone(),
        description: valid.description.clone(),
        issue_type: valid.issue_type.clone(),
        department: valid.department.clone(),
        location: valid.location.clone(),
        lat: coords.lat.clone(),
        lon: coords.lon.clone(),
        images: urls(&media.images),
        videos: urls(&media.videos),
        voice_note: media.voice_notes.first().map(|a| a.url.clone()),
        voice_notes: urls(&media.voice_notes),
        status: ReportStatus::Pending,
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    store.prepend(report);
    log::info!("Report {} committed locally", id);

    Ok(build_payload(&id, &valid, media, now.timestamp_millis()))
}

fn build_payload<B: Clone>(
    id: &str,
    form: &ValidForm,
    media: &MediaSnapshot<B>,
    ts: i64,
) -> UploadPayload<B> {
    let fields = vec![
        ("reportId", id.to_string()),
        ("description", form.description.clone()),
        ("issueType", form.issue_type.clone()),
        ("department", form.department.clone()),
        ("location", form.location.clone()),
    ];

    let file = |field: &'static str, artifact: &Artifact<B>, fallback: String| UploadFile {
        field,
        file_name: artifact.file_name.clone().unwrap_or(fallback),
        mime: artifact.mime.clone(),
        blob: artifact.blob.clone(),
    };

    let mut files = Vec::new();
    for (i, image) in media.images.iter().enumerate() {
        files.push(file("images", image, format!("img_{}_{}_{}.png", id, ts, i)));
    }
    if let Some(latest) = media.voice_notes.first() {
        files.push(UploadFile {
            file_name: format!("voice_{}.webm", id),
            ..file("voiceNote", latest, String::new())
        });
    }
    for (i, note) in media.voice_notes.iter().enumerate() {
        files.push(UploadFile {
            file_name: format!("voice_{}_{}.webm", id, i),
            ..file("voiceNotes", note, String::new())
        });
    }
    for (i, video) in media.videos.iter().enumerate() {
        files.push(file("videos", video, format!("vid_{}_{}_{}.webm", id, ts, i)));
    }

    UploadPayload {
        report_id: id.to_string(),
        fields,
        files,
    }
}

/// アップロード結果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// サーバー版で置き換えた
    Confirmed(Report),
    /// ローカル版をそのまま残した
    KeptLocal { id: String, reason: String },
}

/// アップロード結果をローカルに反映する（失敗時は何もしない）
pub fn reconcile<P: Persistence>(
    store: &mut ReportStore<P>,
    id: &str,
    result: Result<Report>,
) -> SubmitOutcome {
    match result {
        Ok(saved) => {
            if !store.replace_by_id(id, saved.clone()) {
                log::warn!("Report {} disappeared before the server confirmed it", id);
            }
            SubmitOutcome::Confirmed(saved)
        }
        Err(e) => {
            log::warn!("Could not POST report {} to backend, keeping local copy: {}", id, e);
            SubmitOutcome::KeptLocal {
                id: id.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// 検証→ローカルコミット→アップロード→反映
///
/// 検証エラー以外でErrを返すことはない。
pub async fn submit<P, U>(
    store: &RefCell<ReportStore<P>>,
    uploader: &U,
    form: &ReportForm,
    media: &MediaSnapshot<U::Blob>,
    coords: &OverlayInfo,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome>
where
    P: Persistence,
    U: ReportUploader,
    U::Blob: Clone,
{
    let payload = commit_local(&mut *store.borrow_mut(), form, media, coords, now)
        .map_err(Error::from)?;
    let result = uploader.upload(&payload).await;
    Ok(reconcile(&mut *store.borrow_mut(), &payload.report_id, result))
}
