//! 外部の認証サービスとのブリッジ

use crate::js_error::describe;
use civic_report_common::{Identity, Role};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/js/identity.js")]
extern "C" {
    #[wasm_bindgen(js_name = "getIdentity", catch)]
    async fn get_identity_js() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = "setRole", catch)]
    async fn set_role_js(role: &str) -> Result<JsValue, JsValue>;
}

pub async fn get_identity() -> Result<Identity, String> {
    let value = get_identity_js()
        .await
        .map_err(|e| format!("identity unavailable: {}", describe(&e)))?;
    serde_wasm_bindgen::from_value(value).map_err(|e| format!("identity malformed: {}", e))
}

pub async fn set_role(role: Role) -> Result<(), String> {
    set_role_js(role.as_str())
        .await
        .map(|_| ())
        .map_err(|e| format!("could not save role: {}", describe(&e)))
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use js_sys::{Function, Object, Reflect};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn set(target: &JsValue, key: &str, value: &JsValue) {
        Reflect::set(target, &JsValue::from_str(key), value).expect("set property");
    }

    /// ページにClerk相当のオブジェクトを置く
    fn install_clerk(assigned_role: Option<&str>) {
        let user = Object::new();
        set(&user, "id", &"user_1".into());
        set(&user, "fullName", &"Asha Rao".into());
        let public = Object::new();
        if let Some(role) = assigned_role {
            set(&public, "role", &role.into());
        }
        set(&user, "publicMetadata", &public);
        set(&user, "unsafeMetadata", &Object::new());
        let update = Function::new_with_args(
            "patch",
            "Object.assign(this, patch); return Promise.resolve(this);",
        );
        set(&user, "update", &update);

        let clerk = Object::new();
        set(&clerk, "loaded", &JsValue::TRUE);
        set(&clerk, "user", &user);
        let window = web_sys::window().expect("window");
        set(&window, "Clerk", &clerk);
    }

    #[wasm_bindgen_test]
    async fn wasm_chosen_role_is_read_back() {
        install_clerk(None);
        let before = get_identity().await.expect("identity");
        assert_eq!(before.user.as_ref().and_then(|u| u.role()), None);

        set_role(Role::Government).await.expect("set role");
        let after = get_identity().await.expect("identity");
        assert!(after.is_loaded);
        assert_eq!(after.user.and_then(|u| u.role()), Some(Role::Government));
    }

    #[wasm_bindgen_test]
    async fn wasm_assigned_role_wins() {
        install_clerk(Some("citizen"));
        set_role(Role::Government).await.expect("set role");
        let identity = get_identity().await.expect("identity");
        assert_eq!(identity.user.and_then(|u| u.role()), Some(Role::Citizen));
    }
}
