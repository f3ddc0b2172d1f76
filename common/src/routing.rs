//! ログイン状態とロールによる画面の振り分け

use crate::types::Role;
use serde::{Deserialize, Serialize};

/// 外部の認証サービスから受け取る利用者
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityUser {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl IdentityUser {
    /// 認識できるロールのみ
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

/// 認証サービスの状態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub is_loaded: bool,
    pub user: Option<IdentityUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Loading,
    SignIn,
    RoleSelection,
    Dashboard(Role),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Loading => "/",
            Route::SignIn => "/sign-in",
            Route::RoleSelection => "/role-selection",
            Route::Dashboard(Role::Citizen) => "/user-dashboard",
            Route::Dashboard(Role::Government) => "/admin-dashboard",
        }
    }
}

/// ログイン直後の行き先
pub fn resolve(identity: &Identity) -> Route {
    if !identity.is_loaded {
        return Route::Loading;
    }
    match &identity.user {
        None => Route::SignIn,
        Some(user) => match user.role() {
            Some(role) => Route::Dashboard(role),
            None => Route::RoleSelection,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(Route),
}

/// ロール限定画面の入場判定
pub fn guard(identity: &Identity, required: Role) -> Guard {
    match resolve(identity) {
        Route::Dashboard(role) if role == required => Guard::Allow,
        other => Guard::Redirect(other),
    }
}
