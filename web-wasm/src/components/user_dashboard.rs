//! 市民向けダッシュボード

use crate::components::{filter_bar::FilterBar, report_card::ReportCard, report_form::ReportFormPanel};
use crate::state::use_app;
use civic_report_common::{Report, ReportFilter, ReportStats};
use leptos::prelude::*;

#[component]
pub fn StatsRow(stats: Signal<ReportStats>) -> impl IntoView {
    view! {
        <div class="stats-row">
            <div class="stat"><span>"Total"</span><strong>{move || stats.get().total}</strong></div>
            <div class="stat pending"><span>"Pending"</span><strong>{move || stats.get().pending}</strong></div>
            <div class="stat in-progress"><span>"In Progress"</span><strong>{move || stats.get().in_progress}</strong></div>
            <div class="stat resolved"><span>"Resolved"</span><strong>{move || stats.get().resolved}</strong></div>
        </div>
    }
}

#[component]
pub fn UserDashboard() -> impl IntoView {
    let ctx = use_app();
    let filter = RwSignal::new(ReportFilter::default());

    let stats = Signal::derive(move || ctx.reports.with(|r| ReportStats::from_reports(r)));
    let visible = move || {
        let f = filter.get();
        ctx.reports.with(|r| f.apply(r).into_iter().cloned().collect::<Vec<Report>>())
    };
    let total = move || ctx.reports.with(|r| r.len());

    view! {
        <div class="dashboard">
            <ReportFormPanel />

            <section class="panel">
                <h2>"Community reports"</h2>
                <StatsRow stats=stats />
                <FilterBar filter=filter />
                <p class="text-muted">
                    {move || format!("Showing {} of {}", visible().len(), total())}
                </p>
                <Show
                    when=move || !visible().is_empty()
                    fallback=|| view! { <p class="text-muted">"No reports match your search or filters."</p> }
                >
                    <div class="report-list">
                        <For
                            each=visible
                            key=|r| (r.id.clone(), r.status, r.images.len())
                            children=|report| view! { <ReportCard report=report /> }
                        />
                    </div>
                </Show>
            </section>

            <section class="panel">
                <h2>"Notifications"</h2>
                <Show
                    when=move || ctx.notifications.with(|n| !n.is_empty())
                    fallback=|| view! { <p class="text-muted">"No notifications yet."</p> }
                >
                    <ul class="notification-list">
                        <For
                            each={move || ctx.notifications.get().into_iter().rev().collect::<Vec<_>>()}
                            key=|n| n.id
                            children=|n| view! { <li>{n.message}</li> }
                        />
                    </ul>
                </Show>
            </section>
        </div>
    }
}
