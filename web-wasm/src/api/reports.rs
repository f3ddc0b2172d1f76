//! 通報APIへのmultipart送信

use super::{cors_init, fetch_text};
use crate::js_error::describe;
use civic_report_common::{Error, Report, ReportUploader, Result, UploadPayload};
use web_sys::{Blob, FormData, Request};

pub struct HttpUploader {
    base_url: String,
}

impl HttpUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/reports", self.base_url.trim_end_matches('/'))
    }
}

fn build_form(payload: &UploadPayload<Blob>) -> std::result::Result<FormData, wasm_bindgen::JsValue> {
    let form = FormData::new()?;
    for (name, value) in &payload.fields {
        form.append_with_str(name, value)?;
    }
    for file in &payload.files {
        form.append_with_blob_and_filename(file.field, &file.blob, &file.file_name)?;
    }
    Ok(form)
}

impl ReportUploader for HttpUploader {
    type Blob = Blob;

    async fn upload(&self, payload: &UploadPayload<Blob>) -> Result<Report> {
        let upload_error = |e: wasm_bindgen::JsValue| Error::Upload(describe(&e));

        let form = build_form(payload).map_err(upload_error)?;
        let opts = cors_init("POST");
        opts.set_body(&form);
        let request = Request::new_with_str_and_init(&self.endpoint(), &opts).map_err(upload_error)?;

        log::info!(
            "Uploading report {} ({} files)",
            payload.report_id,
            payload.files.len()
        );
        let body = fetch_text(&request).await.map_err(Error::Upload)?;
        Ok(serde_json::from_str(&body)?)
    }
}
