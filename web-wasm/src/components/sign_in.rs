//! 未ログイン時の案内

use crate::state::use_app;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn SignIn() -> impl IntoView {
    let ctx = use_app();
    let retry = move |_| spawn_local(async move { ctx.reload_identity().await });

    view! {
        <div class="panel center">
            <h2>"Sign in required"</h2>
            <p class="text-muted">"Sign in with your account to report issues or manage reports."</p>
            <button class="btn btn-primary" on:click=retry>"I have signed in"</button>
        </div>
    }
}

#[component]
pub fn Loading() -> impl IntoView {
    view! {
        <div class="panel center">
            <div class="spinner"></div>
        </div>
    }
}
