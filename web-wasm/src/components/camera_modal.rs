//! カメラ画面（写真撮影・動画録画）

use crate::state::use_app;
use civic_report_common::fsm::RecordingState;
use civic_report_common::{Error, ReportForm};
use gloo::dialogs::alert;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn CameraModal<F>(form: RwSignal<ReportForm>, on_close: F) -> impl IntoView
where
    F: Fn(()) + 'static + Clone,
{
    let ctx = use_app();
    let video_ref = NodeRef::<leptos::html::Video>::new();
    let (status, set_status) = signal(String::from("Starting camera..."));
    let (busy, set_busy) = signal(false);

    // <video>が描画されたらカメラを開く
    Effect::new(move |_| {
        let Some(video) = video_ref.get() else {
            return;
        };
        let services = ctx.services();
        services.host.bind_preview(Some(video));
        spawn_local(async move {
            match services.session.open_camera().await {
                Ok(()) if services.session.is_ready() => set_status.set(String::new()),
                Ok(()) => set_status.set("Camera is not producing frames yet".into()),
                Err(e) => {
                    alert(&e.to_string());
                    set_status.set("Camera unavailable".into());
                }
            }
        });
    });

    on_cleanup(move || {
        let services = ctx.services();
        services.video.teardown();
        services.session.stop_camera();
        services.host.bind_preview(None);
    });

    let recording_state = move || {
        ctx.media_version.track();
        ctx.services().video.state()
    };

    let capture_photo = move |_| {
        set_busy.set(true);
        spawn_local(async move {
            let services = ctx.services();
            match services.photos.capture(services.locator.as_ref()).await {
                Ok(Some(overlay)) => {
                    if !overlay.address.is_empty() {
                        form.update(|f| f.location = overlay.address);
                    }
                    set_status.set(String::new());
                }
                Ok(None) => set_status.set("Camera not ready, try again".into()),
                Err(e) => alert(&e.to_string()),
            }
            set_busy.set(false);
        });
    };

    let start_recording = move |_| {
        spawn_local(async move {
            let services = ctx.services();
            match services.video.start(services.locator.as_ref()).await {
                Ok(()) => {
                    let overlay = services.session.last_overlay();
                    if !overlay.address.is_empty() {
                        form.update(|f| f.location = overlay.address);
                    }
                }
                Err(Error::NotReady(_)) => set_status.set("Camera not ready, try again".into()),
                Err(e) => alert(&e.to_string()),
            }
        });
    };

    let close = {
        let on_close = on_close.clone();
        move |_| on_close(())
    };

    view! {
        <div class="modal-backdrop">
            <div class="modal camera-modal">
                <video node_ref=video_ref class="camera-preview" autoplay=true playsinline=true prop:muted=true></video>
                <p class="text-muted">{move || status.get()}</p>

                <div class="camera-actions">
                    <button
                        type="button"
                        class="btn btn-primary"
                        disabled=move || {
                            busy.get()
                                || !matches!(recording_state(), RecordingState::Idle | RecordingState::Completed)
                        }
                        on:click=capture_photo
                    >
                        "Capture photo"
                    </button>

                    {move || match recording_state() {
                        RecordingState::Idle | RecordingState::Completed => view! {
                            <button type="button" class="btn btn-secondary" on:click=start_recording>"Record video"</button>
                        }.into_any(),
                        RecordingState::Starting => view! {
                            <button type="button" class="btn btn-secondary" disabled=true>"Starting..."</button>
                        }.into_any(),
                        RecordingState::Recording => view! {
                            <button type="button" class="btn btn-secondary" on:click=move |_| ctx.services().video.pause()>"Pause"</button>
                            <button type="button" class="btn btn-tertiary" on:click=move |_| ctx.services().video.stop()>"Stop"</button>
                            <span class="recording-dot">"REC"</span>
                        }.into_any(),
                        RecordingState::Paused => view! {
                            <button type="button" class="btn btn-secondary" on:click=move |_| ctx.services().video.resume()>"Resume"</button>
                            <button type="button" class="btn btn-tertiary" on:click=move |_| ctx.services().video.stop()>"Stop"</button>
                        }.into_any(),
                        RecordingState::Stopping => view! {
                            <button type="button" class="btn btn-tertiary" disabled=true>"Saving..."</button>
                        }.into_any(),
                    }}

                    <button type="button" class="btn btn-tertiary" on:click=close>"Close"</button>
                </div>
            </div>
        </div>
    }
}
