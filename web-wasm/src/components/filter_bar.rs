//! 絞り込み・検索バー

use crate::state::use_app;
use civic_report_common::{filter_options, ReportFilter, ReportStatus};
use leptos::prelude::*;

fn none_if_all(value: String) -> Option<String> {
    (value != "All").then_some(value)
}

#[component]
pub fn FilterBar(
    filter: RwSignal<ReportFilter>,
    #[prop(optional)] with_status: bool,
) -> impl IntoView {
    let ctx = use_app();
    let options = Memo::new(move |_| ctx.reports.with(|r| filter_options(r)));

    view! {
        <div class="filter-bar">
            <input
                type="search"
                placeholder="Search description, location, type or department"
                prop:value=move || filter.with(|f| f.search.clone())
                on:input=move |ev| filter.update(|f| f.search = event_target_value(&ev))
            />

            <select
                prop:value=move || filter.with(|f| f.issue_type.clone().unwrap_or_else(|| "All".into()))
                on:change=move |ev| filter.update(|f| f.issue_type = none_if_all(event_target_value(&ev)))
            >
                <option value="All">"All issue types"</option>
                {move || options.with(|o| {
                    o.issue_types
                        .iter()
                        .map(|t| view! { <option value=t.clone()>{t.clone()}</option> })
                        .collect_view()
                })}
            </select>

            <select
                prop:value=move || filter.with(|f| f.department.clone().unwrap_or_else(|| "All".into()))
                on:change=move |ev| filter.update(|f| f.department = none_if_all(event_target_value(&ev)))
            >
                <option value="All">"All departments"</option>
                {move || options.with(|o| {
                    o.departments
                        .iter()
                        .map(|d| view! { <option value=d.clone()>{d.clone()}</option> })
                        .collect_view()
                })}
            </select>

            <Show when=move || with_status>
                <select
                    prop:value=move || filter.with(|f| f.status.map(|s| s.as_str()).unwrap_or("All"))
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        filter.update(|f| f.status = none_if_all(value).map(|v| ReportStatus::parse_lenient(&v)));
                    }
                >
                    <option value="All">"All statuses"</option>
                    {ReportStatus::ALL
                        .iter()
                        .map(|s| view! { <option value=s.as_str()>{s.as_str()}</option> })
                        .collect_view()}
                </select>
            </Show>

            <button type="button" class="btn btn-tertiary btn-small" on:click=move |_| filter.update(|f| f.reset())>
                "Reset"
            </button>
        </div>
    }
}
