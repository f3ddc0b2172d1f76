//! ギャラリーからの画像・動画の追加

use crate::state::use_app;
use civic_report_common::Artifact;
use leptos::prelude::*;
use web_sys::{Blob, DragEvent, File, FileList, HtmlInputElement, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Image,
    Video,
}

/// 受け付けるのは画像と動画だけ
fn classify(mime: &str) -> Option<UploadKind> {
    if mime.starts_with("video/") {
        Some(UploadKind::Video)
    } else if mime.starts_with("image/") {
        Some(UploadKind::Image)
    } else {
        None
    }
}

fn to_artifact(file: File) -> Option<Artifact<Blob>> {
    let name = file.name();
    let mime = file.type_();
    let blob: Blob = file.into();
    match Url::create_object_url_with_blob(&blob) {
        Ok(url) => Some(Artifact {
            url,
            blob,
            file_name: Some(name),
            mime,
        }),
        Err(e) => {
            log::warn!("Skipped {}: {}", name, crate::js_error::describe(&e));
            None
        }
    }
}

#[component]
pub fn UploadArea() -> impl IntoView {
    let ctx = use_app();
    let (is_dragover, set_is_dragover) = signal(false);

    // 画像は末尾、動画は先頭に追加
    let handle_files = move |files: FileList| {
        let mut images = Vec::new();
        let mut videos = Vec::new();
        for i in 0..files.length() {
            let Some(file) = files.get(i) else { continue };
            let Some(kind) = classify(&file.type_()) else {
                log::debug!("Ignored {} ({})", file.name(), file.type_());
                continue;
            };
            let Some(artifact) = to_artifact(file) else { continue };
            match kind {
                UploadKind::Video => videos.push(artifact),
                UploadKind::Image => images.push(artifact),
            }
        }
        let services = ctx.services();
        services.photos.add_uploaded(images);
        services.video.add_uploaded(videos);
    };

    let on_drop = move |ev: DragEvent| {
        ev.prevent_default();
        set_is_dragover.set(false);
        if let Some(files) = ev.data_transfer().and_then(|dt| dt.files()) {
            handle_files(files);
        }
    };

    let on_change = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        if let Some(files) = input.files() {
            handle_files(files);
        }
        input.set_value("");
    };

    view! {
        <label
            class=move || if is_dragover.get() { "upload-area dragover" } else { "upload-area" }
            on:drop=on_drop
            on:dragover=move |ev: DragEvent| {
                ev.prevent_default();
                set_is_dragover.set(true);
            }
            on:dragleave=move |_| set_is_dragover.set(false)
        >
            <input
                type="file"
                accept="image/*,video/*"
                multiple=true
                style="display: none"
                on:change=on_change
            />
            <div class="upload-icon">"🖼"</div>
            <p>"Drop photos or videos here, or click to choose from the gallery"</p>
        </label>
    }
}
