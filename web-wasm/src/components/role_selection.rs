//! ロール選択

use crate::identity;
use crate::state::use_app;
use civic_report_common::Role;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn RoleSelection() -> impl IntoView {
    let ctx = use_app();
    let (saving, set_saving) = signal(false);
    let (error, set_error) = signal(None::<String>);

    let choose = move |role: Role| {
        set_saving.set(true);
        set_error.set(None);
        spawn_local(async move {
            match identity::set_role(role).await {
                Ok(()) => {
                    ctx.requested.set(None);
                    ctx.reload_identity().await;
                }
                Err(e) => {
                    log::error!("{}", e);
                    set_error.set(Some(e));
                }
            }
            set_saving.set(false);
        });
    };

    view! {
        <div class="panel center">
            <h2>"Choose your role"</h2>
            <div class="role-options">
                <button
                    class="btn btn-primary"
                    disabled=move || saving.get()
                    on:click=move |_| choose(Role::Citizen)
                >
                    "Citizen"
                    <span class="text-muted">"Report issues in your area"</span>
                </button>
                <button
                    class="btn btn-secondary"
                    disabled=move || saving.get()
                    on:click=move |_| choose(Role::Government)
                >
                    "Government official"
                    <span class="text-muted">"Review and resolve reports"</span>
                </button>
            </div>
            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
        </div>
    }
}
