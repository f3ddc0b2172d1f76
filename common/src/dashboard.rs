//! ダッシュボードの絞り込み・集計

use crate::types::{Report, ReportStatus};
use std::collections::BTreeSet;

/// 説明文の表示上限（文字数）
pub const DESCRIPTION_PREVIEW_CHARS: usize = 180;

/// 絞り込み条件（Noneは「すべて」）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub issue_type: Option<String>,
    pub department: Option<String>,
    pub status: Option<ReportStatus>,
    pub search: String,
}

impl ReportFilter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, report: &Report) -> bool {
        if let Some(issue_type) = &self.issue_type {
            if &report.issue_type != issue_type {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if &report.department != department {
                return false;
            }
        }
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }

        let query = self.search.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &report.description,
            &report.location,
            &report.issue_type,
            &report.department,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }

    pub fn apply<'a>(&self, reports: &'a [Report]) -> Vec<&'a Report> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}

/// プルダウンの選択肢（重複なし・空白除外・昇順）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub issue_types: Vec<String>,
    pub departments: Vec<String>,
}

pub fn filter_options(reports: &[Report]) -> FilterOptions {
    FilterOptions {
        issue_types: unique_sorted(reports.iter().map(|r| r.issue_type.as_str())),
        departments: unique_sorted(reports.iter().map(|r| r.department.as_str())),
    }
}

fn unique_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 状況別の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl ReportStats {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        reports.into_iter().fold(Self::default(), |mut acc, report| {
            acc.total += 1;
            match report.status {
                ReportStatus::Pending => acc.pending += 1,
                ReportStatus::InProgress => acc.in_progress += 1,
                ReportStatus::Resolved => acc.resolved += 1,
            }
            acc
        })
    }
}

/// 一覧用の説明文
pub fn summarize_description(text: &str) -> String {
    if text.is_empty() {
        return "No description provided".to_string();
    }
    if text.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let head: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
