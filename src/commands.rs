//! サブコマンドの実処理（入出力はmain側）

use crate::error::{CivicError, Result};
use crate::storage::FileStore;
use civic_report_common::{
    commit_local, guard, reconcile, summarize_description, Guard, Identity, IdentityUser,
    MediaSnapshot, Notification, NotificationLog, OverlayInfo, Report, ReportForm, ReportStatus,
    ReportStore, ReportUploader, Role, SubmitOutcome, SEED_REPORTS,
};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::path::Path;

pub const EXPORT_FILE_NAME: &str = "reports-export.json";

pub fn open_store(dir: &Path) -> ReportStore<FileStore> {
    ReportStore::open(FileStore::new(dir), SEED_REPORTS)
}

pub fn open_notifications(dir: &Path) -> NotificationLog<FileStore> {
    NotificationLog::open(FileStore::new(dir))
}

/// 設定上のロールをサインイン済みの利用者として扱う
pub fn cli_identity(role: Option<Role>) -> Identity {
    Identity {
        is_loaded: true,
        user: Some(IdentityUser {
            id: "cli".into(),
            name: None,
            role: role.map(|r| r.as_str().to_string()),
        }),
    }
}

pub fn require_role(role: Option<Role>, required: Role) -> Result<()> {
    match guard(&cli_identity(role), required) {
        Guard::Allow => Ok(()),
        Guard::Redirect(route) => {
            log::debug!("Role {:?} redirected to {}", role, route.path());
            Err(CivicError::RoleRequired(required.as_str()))
        }
    }
}

/// 一覧表示用の2行
pub fn format_report(report: &Report) -> String {
    format!(
        "#{} [{}] {} / {} @ {}\n    {}",
        report.id,
        report.status,
        report.issue_type,
        report.department,
        report.location,
        summarize_description(&report.description)
    )
}

pub fn update_status<P: civic_report_common::Persistence>(
    store: &mut ReportStore<P>,
    id: &str,
    status: ReportStatus,
) -> Result<()> {
    if store.set_status(id, status) {
        log::info!("Report {} -> {}", id, status);
        Ok(())
    } else {
        Err(CivicError::ReportNotFound(id.to_string()))
    }
}

pub fn broadcast<P: civic_report_common::Persistence>(
    log: &mut NotificationLog<P>,
    message: &str,
    now_ms: i64,
) -> Result<Notification> {
    log.add(message, now_ms)
        .cloned()
        .ok_or_else(|| CivicError::CliExecution("お知らせが空です".into()))
}

pub fn export_to<P: civic_report_common::Persistence>(store: &ReportStore<P>, path: &Path) -> Result<()> {
    let json = store.export_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 位置情報で場所欄を補う（入力済みなら上書きしない）
pub fn fill_location(form: &mut ReportForm, coords: &OverlayInfo) {
    if form.location.trim().is_empty() {
        if !coords.address.is_empty() {
            form.location = coords.address.clone();
        } else if coords.has_coords() {
            form.location = format!("{}, {}", coords.lat, coords.lon);
        }
    }
}

/// ローカルに即時保存し、送信先があればアップロードして反映する
///
/// 送信先が無い・失敗した場合もローカル版は残る。
pub async fn submit_report<P, U>(
    store: &RefCell<ReportStore<P>>,
    uploader: Option<&U>,
    form: &ReportForm,
    media: &MediaSnapshot<Vec<u8>>,
    coords: &OverlayInfo,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome>
where
    P: civic_report_common::Persistence,
    U: ReportUploader<Blob = Vec<u8>>,
{
    let payload = commit_local(&mut *store.borrow_mut(), form, media, coords, now)?;

    let Some(uploader) = uploader else {
        return Ok(SubmitOutcome::KeptLocal {
            id: payload.report_id,
            reason: "offline".into(),
        });
    };

    let result = uploader.upload(&payload).await;
    Ok(reconcile(&mut *store.borrow_mut(), &payload.report_id, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_report_common::MemoryPersistence;

    #[test]
    fn test_require_role() {
        assert!(require_role(Some(Role::Government), Role::Government).is_ok());
        assert!(matches!(
            require_role(Some(Role::Citizen), Role::Government),
            Err(CivicError::RoleRequired("government"))
        ));
        assert!(require_role(None, Role::Citizen).is_err());
    }

    #[test]
    fn test_update_status_unknown_id() {
        let mut store = ReportStore::open(MemoryPersistence::new(), "[]");
        assert!(matches!(
            update_status(&mut store, "99999", ReportStatus::Resolved),
            Err(CivicError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_fill_location_prefers_address() {
        let mut form = ReportForm::default();
        let coords = OverlayInfo {
            address: "MG Road, Bengaluru".into(),
            ..OverlayInfo::from_coords(12.97, 77.59)
        };
        fill_location(&mut form, &coords);
        assert_eq!(form.location, "MG Road, Bengaluru");

        let mut typed = ReportForm {
            location: "Gate 3".into(),
            ..Default::default()
        };
        fill_location(&mut typed, &coords);
        assert_eq!(typed.location, "Gate 3");
    }

    #[test]
    fn test_fill_location_without_address() {
        let mut form = ReportForm::default();
        fill_location(&mut form, &OverlayInfo::from_coords(1.0, 2.0));
        assert_eq!(form.location, "1.000000, 2.000000");

        let mut empty = ReportForm::default();
        fill_location(&mut empty, &OverlayInfo::default());
        assert!(empty.location.is_empty());
    }

    #[test]
    fn test_broadcast_rejects_blank() {
        let mut log = NotificationLog::open(MemoryPersistence::new());
        assert!(broadcast(&mut log, "   ", 1).is_err());
        let sent = broadcast(&mut log, " Water supply restored ", 2).unwrap();
        assert_eq!(sent.message, "Water supply restored");
    }
}
