//! 行政向けダッシュボード

use crate::components::{filter_bar::FilterBar, report_card::ReportCard, user_dashboard::StatsRow};
use crate::state::use_app;
use civic_report_common::{Report, ReportFilter, ReportStats};
use gloo::dialogs::alert;
use leptos::prelude::*;

#[component]
pub fn AdminDashboard() -> impl IntoView {
    let ctx = use_app();
    let filter = RwSignal::new(ReportFilter::default());
    let (draft, set_draft) = signal(String::new());

    let stats = Signal::derive(move || ctx.reports.with(|r| ReportStats::from_reports(r)));
    let visible = move || {
        let f = filter.get();
        ctx.reports.with(|r| f.apply(r).into_iter().cloned().collect::<Vec<Report>>())
    };

    let send = move |_| {
        if ctx.broadcast(&draft.get_untracked()) {
            set_draft.set(String::new());
            alert("Notification sent to citizens");
        }
    };

    view! {
        <div class="dashboard">
            <section class="panel">
                <div class="panel-header">
                    <h2>"All reports"</h2>
                    <button type="button" class="btn btn-secondary btn-small" on:click=move |_| ctx.export_reports()>
                        "Export JSON"
                    </button>
                </div>
                <StatsRow stats=stats />
                <FilterBar filter=filter with_status=true />
                <Show
                    when=move || !visible().is_empty()
                    fallback=|| view! { <p class="text-muted">"No reports match your search or filters."</p> }
                >
                    <div class="report-list">
                        <For
                            each=visible
                            key=|r| (r.id.clone(), r.status, r.images.len())
                            children=|report| view! { <ReportCard report=report admin=true /> }
                        />
                    </div>
                </Show>
            </section>

            <section class="panel">
                <h2>"Send a notification"</h2>
                <textarea
                    placeholder="Message for citizens..."
                    prop:value=move || draft.get()
                    on:input=move |ev| set_draft.set(event_target_value(&ev))
                ></textarea>
                <button
                    type="button"
                    class="btn btn-primary"
                    disabled=move || draft.with(|d| d.trim().is_empty())
                    on:click=send
                >
                    "Send"
                </button>
            </section>
        </div>
    }
}
