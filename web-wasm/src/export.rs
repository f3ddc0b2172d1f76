//! 通報一覧のJSONエクスポート

use wasm_bindgen::prelude::*;

pub const EXPORT_FILE_NAME: &str = "reports-export.json";

#[wasm_bindgen(module = "/js/download.js")]
extern "C" {
    #[wasm_bindgen(js_name = "downloadText")]
    fn download_text_js(text: &str, filename: &str, mime: &str);
}

pub fn download_json(json: &str) {
    download_text_js(json, EXPORT_FILE_NAME, "application/json");
}
