//! 通報APIへのmultipart送信

use super::read_success;
use civic_report_common::{Error, Report, ReportUploader, Result, UploadPayload};
use reqwest::multipart::{Form, Part};

pub struct HttpUploader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUploader {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/reports", self.base_url.trim_end_matches('/'))
    }
}

fn build_form(payload: &UploadPayload<Vec<u8>>) -> reqwest::Result<Form> {
    let mut form = Form::new();
    for (name, value) in &payload.fields {
        form = form.text(*name, value.clone());
    }
    for file in &payload.files {
        let part = Part::bytes(file.blob.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        form = form.part(file.field, part);
    }
    Ok(form)
}

impl ReportUploader for HttpUploader {
    type Blob = Vec<u8>;

    async fn upload(&self, payload: &UploadPayload<Vec<u8>>) -> Result<Report> {
        let upload_error = |e: reqwest::Error| Error::Upload(e.to_string());

        let form = build_form(payload).map_err(upload_error)?;
        log::info!(
            "Uploading report {} ({} files)",
            payload.report_id,
            payload.files.len()
        );
        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(upload_error)?;
        let body = read_success(response).await.map_err(Error::Upload)?;
        Ok(serde_json::from_str(&body)?)
    }
}
