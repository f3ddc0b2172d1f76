//! ヘッダーコンポーネント

use crate::state::use_app;
use civic_report_common::Role;
use leptos::prelude::*;

#[component]
pub fn Header() -> impl IntoView {
    let ctx = use_app();
    let signed_in = move || ctx.identity.with(|i| i.user.is_some());
    let user_label = move || {
        ctx.identity.with(|i| {
            i.user.as_ref().map(|u| {
                let name = u.name.clone().unwrap_or_else(|| u.id.clone());
                match u.role() {
                    Some(role) => format!("{} ({})", name, role.as_str()),
                    None => name,
                }
            })
        })
    };

    view! {
        <header class="header">
            <h1>"Civic Report"</h1>
            <Show when=signed_in>
                <nav class="nav">
                    <button
                        class="btn btn-tertiary btn-small"
                        on:click=move |_| ctx.requested.set(Some(Role::Citizen))
                    >
                        "Report an issue"
                    </button>
                    <button
                        class="btn btn-tertiary btn-small"
                        on:click=move |_| ctx.requested.set(Some(Role::Government))
                    >
                        "Admin"
                    </button>
                    <span class="user-label">{user_label}</span>
                </nav>
            </Show>
        </header>
    }
}
