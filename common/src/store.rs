//! 通報コレクションとお知らせの永続ストア
//!
//! 書き込みは常にこのストア経由（単一ライター）。変更のたびに永続化する。

use crate::error::{Error, Result};
use crate::types::{Notification, Report, ReportStatus};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const REPORTS_KEY: &str = "reports";
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// 初回起動時の同梱データ
pub const SEED_REPORTS: &str = include_str!("../data/reports.json");

/// キー・バリュー型の永続化先
pub trait Persistence {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// メモリ上の永続化先（テスト・お試し用）
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn load_json<P: Persistence, T: DeserializeOwned>(persistence: &P, key: &str) -> Option<T> {
    let raw = match persistence.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Could not read {}: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Stored {} is not valid JSON, ignoring: {}", key, e);
            None
        }
    }
}

fn save_json<P: Persistence, T: serde::Serialize + ?Sized>(persistence: &P, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(Error::from)
        .and_then(|json| persistence.save(key, &json));
    if let Err(e) = result {
        log::warn!("Could not persist {}: {}", key, e);
    }
}

// ============================================
// 通報
// ============================================

/// 通報コレクション（新しい順）
pub struct ReportStore<P: Persistence> {
    persistence: P,
    reports: Vec<Report>,
}

impl<P: Persistence> ReportStore<P> {
    /// 保存済みの値を読み込む。無い・壊れている場合は同梱データ
    pub fn open(persistence: P, seed: &str) -> Self {
        let reports: Vec<Report> = load_json(&persistence, REPORTS_KEY).unwrap_or_else(|| {
            serde_json::from_str(seed).unwrap_or_else(|e| {
                log::error!("Error loading seed reports: {}", e);
                Vec::new()
            })
        });
        log::debug!("Loaded {} reports", reports.len());
        Self { persistence, reports }
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// 型付きの更新。終了後に必ず永続化する
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Vec<Report>) -> R) -> R {
        let result = f(&mut self.reports);
        save_json(&self.persistence, REPORTS_KEY, &self.reports);
        result
    }

    pub fn prepend(&mut self, report: Report) {
        self.update(|reports| reports.insert(0, report));
    }

    /// 同じidの通報を置き換える（最初の1件のみ）
    pub fn replace_by_id(&mut self, id: &str, report: Report) -> bool {
        self.update(|reports| match reports.iter_mut().find(|r| r.id == id) {
            Some(slot) => {
                *slot = report;
                true
            }
            None => false,
        })
    }

    pub fn set_status(&mut self, id: &str, status: ReportStatus) -> bool {
        self.update(|reports| match reports.iter_mut().find(|r| r.id == id) {
            Some(report) => {
                report.status = status;
                true
            }
            None => false,
        })
    }

    /// エクスポート用の整形JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.reports)?)
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}

// ============================================
// お知らせ
// ============================================

pub struct NotificationLog<P: Persistence> {
    persistence: P,
    notifications: Vec<Notification>,
}

impl<P: Persistence> NotificationLog<P> {
    pub fn open(persistence: P) -> Self {
        let notifications = load_json(&persistence, NOTIFICATIONS_KEY).unwrap_or_default();
        Self { persistence, notifications }
    }

    /// 古い順
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// 空白のみのメッセージは無視
    pub fn add(&mut self, message: &str, now_ms: i64) -> Option<&Notification> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        self.notifications.push(Notification {
            id: now_ms,
            message: message.to_string(),
        });
        save_json(&self.persistence, NOTIFICATIONS_KEY, &self.notifications);
        self.notifications.last()
    }
}
