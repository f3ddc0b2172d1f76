//! 通報フォーム
//!
//! 送信は「ローカルに即時保存 → サーバーへ送信 → 結果で置き換え」の順。
//! サーバーに届かなくてもローカルの通報は残す。

use crate::components::{camera_modal::CameraModal, upload_area::UploadArea, voice_notes::VoiceNotes};
use crate::state::use_app;
use chrono::{DateTime, Utc};
use civic_report_common::submit::{commit_local, reconcile, DEPARTMENTS, ISSUE_TYPES, OTHER_ISSUE_TYPE};
use civic_report_common::{MediaSnapshot, ReportForm, ReportUploader, SubmitOutcome};
use gloo::dialogs::alert;
use leptos::prelude::*;
use leptos::task::spawn_local;

fn now_utc() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
}

#[component]
pub fn ReportFormPanel() -> impl IntoView {
    let ctx = use_app();
    let form = RwSignal::new(ReportForm::default());
    let (camera_open, set_camera_open) = signal(false);
    let (submitting, set_submitting) = signal(false);
    let (message, set_message) = signal(None::<String>);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let services = ctx.services();
        let media = MediaSnapshot {
            images: services.photos.photos(),
            videos: services.video.videos(),
            voice_notes: services.voice.notes(),
        };
        let coords = services.session.last_overlay();

        let committed = {
            let mut store = services.store.borrow_mut();
            commit_local(&mut *store, &form.get_untracked(), &media, &coords, now_utc())
        };
        let payload = match committed {
            Ok(payload) => payload,
            Err(e) => {
                alert(&e.to_string());
                return;
            }
        };

        // ダッシュボードには送信完了を待たずに出す
        ctx.refresh_reports();
        form.set(ReportForm::default());
        let sent = services.take_media();
        set_submitting.set(true);

        spawn_local(async move {
            let result = services.uploader.upload(&payload).await;
            let outcome = {
                let mut store = services.store.borrow_mut();
                reconcile(&mut *store, &payload.report_id, result)
            };
            ctx.refresh_reports();
            set_submitting.set(false);
            set_message.set(Some(match outcome {
                SubmitOutcome::Confirmed(report) => {
                    // ローカル版はもう表示されない
                    services.release_media(&sent);
                    format!("Report {} submitted", report.id)
                }
                SubmitOutcome::KeptLocal { id, .. } => {
                    format!("Report {} saved on this device; the server could not be reached", id)
                }
            }));
        });
    };

    let photos = move || ctx.photo_items();
    let videos = move || ctx.video_items();

    view! {
        <form class="panel report-form" on:submit=on_submit>
            <h2>"Report an issue"</h2>

            <div class="form-group">
                <label for="description">"Description"</label>
                <textarea
                    id="description"
                    placeholder="Describe the issue..."
                    prop:value=move || form.with(|f| f.description.clone())
                    on:input=move |ev| form.update(|f| f.description = event_target_value(&ev))
                ></textarea>
            </div>

            <div class="settings-grid">
                <div class="form-group">
                    <label for="issue-type">"Issue type"</label>
                    <select
                        id="issue-type"
                        prop:value=move || form.with(|f| f.issue_type.clone())
                        on:change=move |ev| form.update(|f| f.issue_type = event_target_value(&ev))
                    >
                        <option value="">"Select issue type"</option>
                        {ISSUE_TYPES
                            .iter()
                            .map(|t| view! { <option value=*t>{*t}</option> })
                            .collect_view()}
                    </select>
                    <Show when=move || form.with(|f| f.issue_type == OTHER_ISSUE_TYPE)>
                        <input
                            type="text"
                            placeholder="Describe the issue type"
                            prop:value=move || form.with(|f| f.custom_issue_type.clone())
                            on:input=move |ev| form.update(|f| f.custom_issue_type = event_target_value(&ev))
                        />
                    </Show>
                </div>

                <div class="form-group">
                    <label for="department">"Department"</label>
                    <select
                        id="department"
                        prop:value=move || form.with(|f| f.department.clone())
                        on:change=move |ev| form.update(|f| f.department = event_target_value(&ev))
                    >
                        <option value="">"Select department"</option>
                        {DEPARTMENTS
                            .iter()
                            .map(|d| view! { <option value=*d>{*d}</option> })
                            .collect_view()}
                    </select>
                </div>

                <div class="form-group">
                    <label for="location">"Location"</label>
                    <input
                        id="location"
                        type="text"
                        placeholder="Address or landmark"
                        prop:value=move || form.with(|f| f.location.clone())
                        on:input=move |ev| form.update(|f| f.location = event_target_value(&ev))
                    />
                </div>
            </div>

            <div class="media-actions">
                <button type="button" class="btn btn-secondary" on:click=move |_| set_camera_open.set(true)>
                    "📷 Open camera"
                </button>
                <VoiceNotes />
            </div>

            <UploadArea />

            <div class="media-previews">
                <For
                    each=photos
                    key=|item| item.url.clone()
                    children=|item| view! { <img class="thumb" src=item.url alt="captured photo" /> }
                />
                <For
                    each=videos
                    key=|item| item.url.clone()
                    children=|item| view! { <video class="thumb" src=item.url controls=true></video> }
                />
            </div>

            <button type="submit" class="btn btn-primary" disabled=move || submitting.get()>
                {move || if submitting.get() { "Submitting..." } else { "Submit report" }}
            </button>
            {move || message.get().map(|m| view! { <p class="text-muted">{m}</p> })}

            <Show when=move || camera_open.get()>
                <CameraModal form=form on_close=move |_| set_camera_open.set(false) />
            </Show>
        </form>
    }
}
