//! メインアプリケーションコンポーネント

use crate::components::{
    admin_dashboard::AdminDashboard,
    header::Header,
    role_selection::RoleSelection,
    sign_in::{Loading, SignIn},
    user_dashboard::UserDashboard,
};
use crate::state::AppContext;
use civic_report_common::{guard, resolve, Guard, Identity, Role, Route};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 表示する画面
///
/// ヘッダーで画面が選ばれていればロールで入場判定し、
/// 権限が無ければ本来の画面へ振り戻す。
fn current_route(identity: &Identity, requested: Option<Role>) -> Route {
    match requested {
        Some(role) => match guard(identity, role) {
            Guard::Allow => Route::Dashboard(role),
            Guard::Redirect(route) => route,
        },
        None => resolve(identity),
    }
}

#[component]
pub fn App() -> impl IntoView {
    let ctx = AppContext::new();
    provide_context(ctx);

    spawn_local(async move { ctx.reload_identity().await });

    let route = Memo::new(move |_| {
        ctx.identity.with(|identity| current_route(identity, ctx.requested.get()))
    });

    view! {
        <div class="container">
            <Header />
            {move || match route.get() {
                Route::Loading => view! { <Loading /> }.into_any(),
                Route::SignIn => view! { <SignIn /> }.into_any(),
                Route::RoleSelection => view! { <RoleSelection /> }.into_any(),
                Route::Dashboard(Role::Citizen) => view! { <UserDashboard /> }.into_any(),
                Route::Dashboard(Role::Government) => view! { <AdminDashboard /> }.into_any(),
            }}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_report_common::IdentityUser;

    fn citizen() -> Identity {
        Identity {
            is_loaded: true,
            user: Some(IdentityUser {
                id: "u1".into(),
                name: None,
                role: Some("citizen".into()),
            }),
        }
    }

    #[test]
    fn test_default_route_follows_role() {
        assert_eq!(current_route(&citizen(), None), Route::Dashboard(Role::Citizen));
    }

    #[test]
    fn test_citizen_cannot_open_admin() {
        assert_eq!(
            current_route(&citizen(), Some(Role::Government)),
            Route::Dashboard(Role::Citizen)
        );
    }

    #[test]
    fn test_requested_view_waits_for_identity() {
        assert_eq!(
            current_route(&Identity::default(), Some(Role::Citizen)),
            Route::Loading
        );
    }
}
