//! 通報カード

use crate::state::use_app;
use civic_report_common::{summarize_description, Report, ReportStatus};
use leptos::prelude::*;

fn status_class(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Resolved => "status-badge resolved",
        ReportStatus::InProgress => "status-badge in-progress",
        ReportStatus::Pending => "status-badge pending",
    }
}

/// createdAtを表示用に整える（解釈できなければそのまま）
fn display_time(created_at: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

#[component]
pub fn ReportCard(report: Report, #[prop(optional)] admin: bool) -> impl IntoView {
    let ctx = use_app();
    let id = report.id.clone();
    let status = report.status;

    let status_control = admin.then(|| {
        let id = id.clone();
        view! {
            <select
                class="status-select"
                prop:value=status.as_str()
                on:change=move |ev| {
                    let value = event_target_value(&ev);
                    ctx.set_status(&id, ReportStatus::parse_lenient(&value));
                }
            >
                {ReportStatus::ALL
                    .iter()
                    .map(|s| view! { <option value=s.as_str()>{s.as_str()}</option> })
                    .collect_view()}
            </select>
        }
    });

    view! {
        <div class="report-card">
            <div class="report-header">
                <h3>{format!("#{} {}", report.id, report.issue_type)}</h3>
                <span class=status_class(status)>{status.as_str()}</span>
            </div>

            <div class="report-media">
                {report
                    .images
                    .iter()
                    .map(|url| view! { <img class="thumb" src=url.clone() alt="report photo" /> })
                    .collect_view()}
                {report
                    .videos
                    .iter()
                    .map(|url| view! { <video class="thumb" src=url.clone() controls=true></video> })
                    .collect_view()}
            </div>

            <p><strong>"Description: "</strong>{summarize_description(&report.description)}</p>

            <div class="report-meta">
                <p><strong>"Department: "</strong>{report.department.clone()}</p>
                <p><strong>"Location: "</strong>{report.location.clone()}</p>
                <p><strong>"Reported: "</strong>{display_time(&report.created_at)}</p>
                {(!report.lat.is_empty()).then(|| view! {
                    <p class="text-muted">{format!("{}, {}", report.lat, report.lon)}</p>
                })}
            </div>

            {(!report.voice_notes.is_empty()).then(|| view! {
                <div class="report-voice">
                    {report
                        .voice_notes
                        .iter()
                        .map(|url| view! { <audio controls=true src=url.clone()></audio> })
                        .collect_view()}
                </div>
            })}

            {status_control}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_time() {
        assert_eq!(display_time("2024-07-01T10:05:00.000Z"), "2024-07-01 10:05");
        assert_eq!(display_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_status_class() {
        assert!(status_class(ReportStatus::InProgress).ends_with("in-progress"));
    }
}
