//! ボイスメモの録音と再生

use crate::state::use_app;
use civic_report_common::fsm::RecordingState;
use gloo::dialogs::alert;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn VoiceNotes() -> impl IntoView {
    let ctx = use_app();

    on_cleanup(move || ctx.services().voice.teardown());

    let state = move || {
        ctx.media_version.track();
        ctx.services().voice.state()
    };

    let start = move |_| {
        spawn_local(async move {
            if let Err(e) = ctx.services().voice.start().await {
                alert(&e.to_string());
            }
        });
    };

    view! {
        <div class="voice-notes">
            <div class="voice-actions">
                {move || match state() {
                    RecordingState::Idle | RecordingState::Completed => view! {
                        <button type="button" class="btn btn-secondary btn-small" on:click=start>"🎙 Record voice note"</button>
                    }.into_any(),
                    RecordingState::Starting => view! {
                        <button type="button" class="btn btn-secondary btn-small" disabled=true>"Starting..."</button>
                    }.into_any(),
                    RecordingState::Recording => view! {
                        <button type="button" class="btn btn-secondary btn-small" on:click=move |_| ctx.services().voice.pause()>"Pause"</button>
                        <button type="button" class="btn btn-tertiary btn-small" on:click=move |_| ctx.services().voice.stop()>"Stop"</button>
                        <span class="recording-dot">"REC"</span>
                    }.into_any(),
                    RecordingState::Paused => view! {
                        <button type="button" class="btn btn-secondary btn-small" on:click=move |_| ctx.services().voice.resume()>"Resume"</button>
                        <button type="button" class="btn btn-tertiary btn-small" on:click=move |_| ctx.services().voice.stop()>"Stop"</button>
                    }.into_any(),
                    RecordingState::Stopping => view! {
                        <button type="button" class="btn btn-tertiary btn-small" disabled=true>"Saving..."</button>
                    }.into_any(),
                }}
            </div>

            <ul class="voice-list">
                <For
                    each={move || ctx.voice_items().into_iter().enumerate().collect::<Vec<_>>()}
                    key=|(index, item)| (*index, item.url.clone())
                    children=move |(index, item)| {
                        view! {
                            <li>
                                <span>{format!("Note {}", index + 1)}</span>
                                <audio controls=true src=item.url></audio>
                            </li>
                        }
                    }
                />
            </ul>
        </div>
    }
}
