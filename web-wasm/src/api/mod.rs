//! HTTP連携（fetch API）

pub mod reports;
pub mod geocode;

use crate::js_error::describe;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

/// fetchしてステータスが2xxなら本文を返す
pub(crate) async fn fetch_text(request: &Request) -> Result<String, String> {
    let window = web_sys::window().ok_or_else(|| "no window".to_string())?;
    let resp_value = JsFuture::from(window.fetch_with_request(request))
        .await
        .map_err(|e| describe(&e))?;
    let resp: Response = resp_value.dyn_into().map_err(|e| describe(&e))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let text = JsFuture::from(resp.text().map_err(|e| describe(&e))?)
        .await
        .map_err(|e| describe(&e))?;
    text.as_string().ok_or_else(|| "response body is not text".to_string())
}

pub(crate) fn cors_init(method: &str) -> RequestInit {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    opts
}
