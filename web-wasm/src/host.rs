//! ブラウザのメディアAPIによる `MediaHost` 実装
//!
//! getUserMedia / <video> プレビュー / canvas合成 / MediaRecorder

use crate::js_error::describe;
use chrono::{NaiveDate, NaiveDateTime};
use civic_report_common::media::{Facing, PHOTO_MIME};
use civic_report_common::overlay::{
    bar_top, overlay_lines, BAR_FILL, BAR_HEIGHT, TEXT_FILL, TEXT_FONT,
};
use civic_report_common::{
    Artifact, Dimensions, Error, MediaHost, OverlayInfo, RecorderEvent, RecorderSink, Result,
    StreamRequest,
};
use gloo::timers::callback::Interval;
use gloo::timers::future::TimeoutFuture;
use js_sys::{Array, Function, Object, Promise, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobEvent, BlobPropertyBag, CanvasRenderingContext2d, HtmlCanvasElement,
    HtmlVideoElement, MediaRecorder, MediaRecorderOptions, MediaStream, MediaStreamConstraints,
    MediaStreamTrack, Url,
};

/// 端末の現地時刻
pub fn local_now() -> NaiveDateTime {
    let d = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(d.get_full_year() as i32, d.get_month() + 1, d.get_date())
        .and_then(|date| date.and_hms_opt(d.get_hours(), d.get_minutes(), d.get_seconds()))
        .unwrap_or_default()
}

#[derive(Default)]
pub struct WebMediaHost {
    video: RefCell<Option<HtmlVideoElement>>,
}

impl WebMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// プレビュー用の<video>要素を登録（画面を閉じたらNone）
    pub fn bind_preview(&self, video: Option<HtmlVideoElement>) {
        *self.video.borrow_mut() = video;
    }

    fn video(&self) -> Option<HtmlVideoElement> {
        self.video.borrow().clone()
    }

    fn mounted_video(&self) -> Result<HtmlVideoElement> {
        self.video()
            .ok_or_else(|| Error::Acquisition("preview surface is not mounted".into()))
    }
}

fn constraints_for(request: StreamRequest) -> MediaStreamConstraints {
    let constraints = MediaStreamConstraints::new();
    match request {
        StreamRequest::Camera(Facing::Environment) => {
            let video = Object::new();
            let _ = Reflect::set(&video, &"facingMode".into(), &"environment".into());
            constraints.set_video(&video);
            constraints.set_audio(&JsValue::FALSE);
        }
        StreamRequest::AnyCamera => {
            constraints.set_video(&JsValue::TRUE);
            constraints.set_audio(&JsValue::FALSE);
        }
        StreamRequest::Microphone => {
            constraints.set_video(&JsValue::FALSE);
            constraints.set_audio(&JsValue::TRUE);
        }
    }
    constraints
}

fn create_canvas(dims: Dimensions) -> std::result::Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(dims.width);
    canvas.set_height(dims.height);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into()?;
    Ok((canvas, ctx))
}

/// 映像フレームを等倍で描き、下部に帯と文字を重ねる
fn draw_frame(
    ctx: &CanvasRenderingContext2d,
    video: &HtmlVideoElement,
    dims: Dimensions,
    overlay: &OverlayInfo,
    now: NaiveDateTime,
) -> std::result::Result<(), JsValue> {
    let (w, h) = (dims.width as f64, dims.height as f64);
    ctx.draw_image_with_html_video_element_and_dw_and_dh(video, 0.0, 0.0, w, h)?;

    ctx.set_fill_style_str(BAR_FILL);
    ctx.fill_rect(0.0, bar_top(dims.height), w, BAR_HEIGHT as f64);

    ctx.set_fill_style_str(TEXT_FILL);
    ctx.set_font(TEXT_FONT);
    for line in overlay_lines(overlay, now, dims.height) {
        ctx.fill_text(&line.text, line.x, line.y)?;
    }
    Ok(())
}

async fn canvas_to_blob(canvas: &HtmlCanvasElement, mime: &str) -> Result<Blob> {
    let promise = Promise::new(&mut |resolve, reject| {
        if let Err(e) = canvas.to_blob_with_type(&resolve, mime) {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });
    JsFuture::from(promise)
        .await
        .map_err(|e| Error::Recorder(describe(&e)))?
        .dyn_into::<Blob>()
        .map_err(|_| Error::Recorder("canvas produced no image".into()))
}

/// `blob:` URLを失効させる。それ以外（data:やサーバーのURL）は何もしない
pub fn revoke_object_url(url: &str) -> bool {
    if !url.starts_with("blob:") {
        return false;
    }
    if let Err(e) = Url::revoke_object_url(url) {
        log::debug!("revokeObjectURL failed: {}", describe(&e));
        return false;
    }
    true
}

fn compositing_error(e: JsValue) -> Error {
    Error::Recorder(format!("canvas: {}", describe(&e)))
}

type DataHandler = Closure<dyn FnMut(BlobEvent)>;
type StopHandler = Closure<dyn FnMut(web_sys::Event)>;

struct RecorderHandle {
    recorder: MediaRecorder,
    handlers: Option<(DataHandler, StopHandler)>,
}

impl Drop for RecorderHandle {
    fn drop(&mut self) {
        self.recorder.set_ondataavailable(None);
        self.recorder.set_onstop(None);
        // 停止通知の処理中に最後の参照が落ちうる。クロージャの解放は次のタスクで
        if let Some(handlers) = self.handlers.take() {
            wasm_bindgen_futures::spawn_local(async move {
                drop(handlers);
            });
        }
    }
}

/// MediaRecorderとそのイベントハンドラ。最後の複製が落ちるとハンドラも外れる
#[derive(Clone)]
pub struct WebRecorder(Rc<RecorderHandle>);

impl WebRecorder {
    fn recorder(&self) -> &MediaRecorder {
        &self.0.recorder
    }
}

impl MediaHost for WebMediaHost {
    type Stream = MediaStream;
    type Blob = Blob;
    type Recorder = WebRecorder;
    type DrawLoop = Interval;

    async fn request_stream(&self, request: StreamRequest) -> Result<MediaStream> {
        let acquisition = |e: JsValue| Error::Acquisition(describe(&e));
        let devices = web_sys::window()
            .ok_or_else(|| Error::Acquisition("no window".into()))?
            .navigator()
            .media_devices()
            .map_err(acquisition)?;
        let promise = devices
            .get_user_media_with_constraints(&constraints_for(request))
            .map_err(acquisition)?;
        let stream = JsFuture::from(promise).await.map_err(acquisition)?;
        log::debug!("Acquired {:?}", request);
        stream
            .dyn_into::<MediaStream>()
            .map_err(|_| Error::Acquisition("getUserMedia returned no stream".into()))
    }

    fn stop_tracks(&self, stream: &MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }

    fn attach_preview(&self, stream: Option<&MediaStream>) {
        if let Some(video) = self.video() {
            video.set_src_object(stream);
        }
    }

    async fn play_preview(&self) {
        let Some(video) = self.video() else {
            return;
        };
        match video.play() {
            Ok(promise) => {
                if let Err(e) = JsFuture::from(promise).await {
                    log::debug!("Preview play() rejected: {}", describe(&e));
                }
            }
            Err(e) => log::debug!("Preview play() failed: {}", describe(&e)),
        }
    }

    fn preview_dimensions(&self) -> Option<Dimensions> {
        let video = self.video()?;
        Dimensions::non_zero(video.video_width(), video.video_height())
    }

    fn supports_frame_callback(&self) -> bool {
        self.video()
            .map(|v| Reflect::has(&v, &"requestVideoFrameCallback".into()).unwrap_or(false))
            .unwrap_or(false)
    }

    async fn next_video_frame(&self) {
        let Some(video) = self.video() else {
            return futures::future::pending().await;
        };
        let promise = Promise::new(&mut |resolve, _reject| {
            let callback = Reflect::get(&video, &"requestVideoFrameCallback".into())
                .ok()
                .and_then(|f| f.dyn_into::<Function>().ok());
            if let Some(callback) = callback {
                let _ = callback.call1(&video, &resolve);
            }
        });
        let _ = JsFuture::from(promise).await;
    }

    async fn next_paint(&self) {
        let promise = Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|w| w.request_animation_frame(&resolve).is_ok())
                .unwrap_or(false);
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }

    async fn capture_still(
        &self,
        dims: Dimensions,
        overlay: &OverlayInfo,
        local_now: NaiveDateTime,
    ) -> Result<Artifact<Blob>> {
        let video = self.mounted_video()?;
        let (canvas, ctx) = create_canvas(dims).map_err(compositing_error)?;
        draw_frame(&ctx, &video, dims, overlay, local_now).map_err(compositing_error)?;

        let blob = canvas_to_blob(&canvas, PHOTO_MIME).await?;
        let url = Url::create_object_url_with_blob(&blob).map_err(compositing_error)?;
        Ok(Artifact {
            url,
            blob,
            file_name: None,
            mime: PHOTO_MIME.to_string(),
        })
    }

    fn start_draw_loop(
        &self,
        dims: Dimensions,
        overlay: OverlayInfo,
        fps: u32,
    ) -> Result<(Interval, MediaStream)> {
        let video = self.mounted_video()?;
        let (canvas, ctx) = create_canvas(dims).map_err(compositing_error)?;
        let stream = canvas
            .capture_stream_with_frame_request_rate(fps as f64)
            .map_err(compositing_error)?;

        // 日時は毎フレーム更新、位置情報は開始時のまま
        let interval = Interval::new(1000 / fps.max(1), move || {
            if let Err(e) = draw_frame(&ctx, &video, dims, &overlay, local_now()) {
                log::debug!("Frame skipped: {}", describe(&e));
            }
        });
        Ok((interval, stream))
    }

    fn cancel_draw_loop(&self, draw_loop: Interval) {
        drop(draw_loop);
    }

    fn combine_tracks(&self, video: &MediaStream, audio: &MediaStream) -> Result<MediaStream> {
        let tracks = Array::new();
        for track in video.get_video_tracks().iter() {
            tracks.push(&track);
        }
        for track in audio.get_audio_tracks().iter() {
            tracks.push(&track);
        }
        MediaStream::new_with_tracks(&tracks).map_err(|e| Error::Recorder(describe(&e)))
    }

    fn start_recorder(
        &self,
        stream: &MediaStream,
        mime: &str,
        sink: RecorderSink<Blob>,
    ) -> Result<WebRecorder> {
        let recorder = if MediaRecorder::is_type_supported(mime) {
            let options = MediaRecorderOptions::new();
            options.set_mime_type(mime);
            MediaRecorder::new_with_media_stream_and_media_recorder_options(stream, &options)
        } else {
            log::warn!("{} is not supported, using the browser default", mime);
            MediaRecorder::new_with_media_stream(stream)
        }
        .map_err(|e| Error::Recorder(describe(&e)))?;

        let sink = Rc::new(RefCell::new(sink));

        let on_data: DataHandler = {
            let sink = sink.clone();
            Closure::wrap(Box::new(move |ev: BlobEvent| {
                if let Some(blob) = ev.data().filter(|b| b.size() > 0.0) {
                    let mut emit = sink.borrow_mut();
                    (*emit)(RecorderEvent::Data(blob));
                }
            }) as Box<dyn FnMut(_)>)
        };
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        let on_stop: StopHandler = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let mut emit = sink.borrow_mut();
            (*emit)(RecorderEvent::Stopped);
        }) as Box<dyn FnMut(_)>);
        recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));

        let handle = WebRecorder(Rc::new(RecorderHandle {
            recorder,
            handlers: Some((on_data, on_stop)),
        }));
        handle
            .recorder()
            .start()
            .map_err(|e| Error::Recorder(describe(&e)))?;
        Ok(handle)
    }

    fn pause_recorder(&self, recorder: &WebRecorder) {
        if let Err(e) = recorder.recorder().pause() {
            log::debug!("pause() ignored: {}", describe(&e));
        }
    }

    fn resume_recorder(&self, recorder: &WebRecorder) {
        if let Err(e) = recorder.recorder().resume() {
            log::debug!("resume() ignored: {}", describe(&e));
        }
    }

    fn stop_recorder(&self, recorder: &WebRecorder) {
        if let Err(e) = recorder.recorder().stop() {
            log::debug!("stop() ignored: {}", describe(&e));
        }
    }

    fn assemble(&self, chunks: Vec<Blob>, mime: &str, file_name: String) -> Result<Artifact<Blob>> {
        let parts = Array::new();
        for chunk in &chunks {
            parts.push(chunk);
        }
        let bag = BlobPropertyBag::new();
        bag.set_type(mime);
        let blob = Blob::new_with_blob_sequence_and_options(&parts, &bag)
            .map_err(|e| Error::Recorder(describe(&e)))?;
        let url = Url::create_object_url_with_blob(&blob).map_err(|e| Error::Recorder(describe(&e)))?;
        Ok(Artifact {
            url,
            blob,
            file_name: Some(file_name),
            mime: mime.to_string(),
        })
    }

    fn release(&self, artifact: &Artifact<Blob>) {
        revoke_object_url(&artifact.url);
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        local_now()
    }

    async fn sleep_ms(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_revoke_only_blob_urls() {
        let blob = Blob::new().expect("blob");
        let url = Url::create_object_url_with_blob(&blob).expect("object url");
        assert!(revoke_object_url(&url));
        assert!(!revoke_object_url("data:image/png;base64,aaaa"));
        assert!(!revoke_object_url("https://cdn.example/img_1.png"));
    }

    #[wasm_bindgen_test]
    fn wasm_last_recorder_clone_detaches_handlers() {
        let stream = MediaStream::new().expect("stream");
        let recorder = MediaRecorder::new_with_media_stream(&stream).expect("recorder");
        let on_data: DataHandler = Closure::wrap(Box::new(|_: BlobEvent| {}) as Box<dyn FnMut(_)>);
        let on_stop: StopHandler = Closure::wrap(Box::new(|_: web_sys::Event| {}) as Box<dyn FnMut(_)>);
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));
        recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));

        let handle = WebRecorder(Rc::new(RecorderHandle {
            recorder: recorder.clone(),
            handlers: Some((on_data, on_stop)),
        }));
        let copy = handle.clone();
        drop(handle);
        assert!(recorder.onstop().is_some());

        drop(copy);
        assert!(recorder.ondataavailable().is_none());
        assert!(recorder.onstop().is_none());
    }
}
