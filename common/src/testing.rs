//! テスト用の模擬メディアホスト
//!
//! 時計は仮想時間。`sleep_ms` と `next_paint` は即座に時計を進める。

use crate::error::{Error, Result};
use crate::media::{MediaHost, RecorderEvent, RecorderSink, StreamRequest};
use crate::overlay::OverlayInfo;
use crate::types::{Artifact, Dimensions};
use chrono::{NaiveDate, NaiveDateTime};
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub(crate) type StreamId = u32;

pub(crate) struct MockHost {
    clock: Cell<f64>,
    next_id: Cell<u32>,
    frame_callback: bool,
    /// 要求種別ごとにフレームを出すかどうか
    delivers: RefCell<HashMap<StreamRequest, bool>>,
    denied: RefCell<HashSet<StreamRequest>>,
    pub requests: RefCell<Vec<StreamRequest>>,
    pub microphones: RefCell<Vec<StreamId>>,
    live: RefCell<HashSet<StreamId>>,
    delivering: RefCell<HashSet<StreamId>>,
    attached: Cell<Option<StreamId>>,
    pub active_loops: RefCell<HashSet<u32>>,
    pub cancelled_loops: RefCell<Vec<u32>>,
    pub overlays: RefCell<Vec<OverlayInfo>>,
    sinks: RefCell<HashMap<u32, RecorderSink<Vec<u8>>>>,
    pub recorder_calls: RefCell<Vec<(u32, &'static str)>>,
    pub released: RefCell<Vec<String>>,
    /// 閉じている間、ストリーム要求は応答を保留する
    gate: RefCell<Option<Shared<oneshot::Receiver<()>>>>,
}

impl MockHost {
    pub const DIMS: Dimensions = Dimensions { width: 1280, height: 720 };

    pub fn new() -> Self {
        Self {
            clock: Cell::new(0.0),
            next_id: Cell::new(1),
            frame_callback: false,
            delivers: RefCell::new(HashMap::new()),
            denied: RefCell::new(HashSet::new()),
            requests: RefCell::new(Vec::new()),
            microphones: RefCell::new(Vec::new()),
            live: RefCell::new(HashSet::new()),
            delivering: RefCell::new(HashSet::new()),
            attached: Cell::new(None),
            active_loops: RefCell::new(HashSet::new()),
            cancelled_loops: RefCell::new(Vec::new()),
            overlays: RefCell::new(Vec::new()),
            sinks: RefCell::new(HashMap::new()),
            recorder_calls: RefCell::new(Vec::new()),
            released: RefCell::new(Vec::new()),
            gate: RefCell::new(None),
        }
    }

    pub fn with_frame_callback(mut self) -> Self {
        self.frame_callback = true;
        self
    }

    pub fn set_camera_delivers(&self, request: StreamRequest, delivers: bool) {
        self.delivers.borrow_mut().insert(request, delivers);
    }

    pub fn deny(&self, request: StreamRequest) {
        self.denied.borrow_mut().insert(request);
    }

    /// 以降のストリーム要求を保留する。返した送信側を送るか捨てると再開
    pub fn close_gate(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx.shared());
        tx
    }

    /// 添付中のストリームを止まった状態にする
    pub fn freeze_attached(&self) {
        if let Some(id) = self.attached.get() {
            self.delivering.borrow_mut().remove(&id);
        }
    }

    pub fn is_live(&self, id: StreamId) -> bool {
        self.live.borrow().contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn attached(&self) -> Option<StreamId> {
        self.attached.get()
    }

    /// エンコーダからの通知を模擬する
    pub fn emit(&self, recorder: u32, event: RecorderEvent<Vec<u8>>) {
        let sink = self.sinks.borrow_mut().remove(&recorder);
        if let Some(mut sink) = sink {
            sink(event);
            self.sinks.borrow_mut().insert(recorder, sink);
        }
    }

    pub fn last_recorder(&self) -> Option<u32> {
        self.recorder_calls
            .borrow()
            .iter()
            .rev()
            .find(|(_, call)| *call == "start")
            .map(|(id, _)| *id)
    }

    fn issue_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl MediaHost for MockHost {
    type Stream = StreamId;
    type Blob = Vec<u8>;
    type Recorder = u32;
    type DrawLoop = u32;

    async fn request_stream(&self, request: StreamRequest) -> Result<StreamId> {
        self.requests.borrow_mut().push(request);
        let gate = self.gate.borrow().clone();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.denied.borrow().contains(&request) {
            return Err(Error::Acquisition("NotAllowedError".into()));
        }
        let id = self.issue_id();
        self.live.borrow_mut().insert(id);
        if request == StreamRequest::Microphone {
            self.microphones.borrow_mut().push(id);
        } else if self.delivers.borrow().get(&request).copied().unwrap_or(true) {
            self.delivering.borrow_mut().insert(id);
        }
        Ok(id)
    }

    fn stop_tracks(&self, stream: &StreamId) {
        self.live.borrow_mut().remove(stream);
        self.delivering.borrow_mut().remove(stream);
    }

    fn attach_preview(&self, stream: Option<&StreamId>) {
        self.attached.set(stream.copied());
    }

    async fn play_preview(&self) {}

    fn preview_dimensions(&self) -> Option<Dimensions> {
        let id = self.attached.get()?;
        self.delivering.borrow().contains(&id).then_some(Self::DIMS)
    }

    fn supports_frame_callback(&self) -> bool {
        self.frame_callback
    }

    async fn next_video_frame(&self) {
        if self.preview_dimensions().is_none() {
            futures::future::pending::<()>().await;
        }
    }

    async fn next_paint(&self) {
        self.clock.set(self.clock.get() + 16.0);
    }

    async fn capture_still(
        &self,
        dims: Dimensions,
        overlay: &OverlayInfo,
        _local_now: NaiveDateTime,
    ) -> Result<Artifact<Vec<u8>>> {
        self.overlays.borrow_mut().push(overlay.clone());
        Ok(Artifact {
            url: format!("data:image/png;mock,{}x{}", dims.width, dims.height),
            blob: vec![1, 2, 3],
            file_name: None,
            mime: "image/png".into(),
        })
    }

    fn start_draw_loop(
        &self,
        _dims: Dimensions,
        overlay: OverlayInfo,
        _fps: u32,
    ) -> Result<(u32, StreamId)> {
        self.overlays.borrow_mut().push(overlay);
        let draw_loop = self.issue_id();
        self.active_loops.borrow_mut().insert(draw_loop);
        let canvas = self.issue_id();
        self.live.borrow_mut().insert(canvas);
        Ok((draw_loop, canvas))
    }

    fn cancel_draw_loop(&self, draw_loop: u32) {
        self.active_loops.borrow_mut().remove(&draw_loop);
        self.cancelled_loops.borrow_mut().push(draw_loop);
    }

    fn combine_tracks(&self, video: &StreamId, _audio: &StreamId) -> Result<StreamId> {
        Ok(*video)
    }

    fn start_recorder(
        &self,
        _stream: &StreamId,
        _mime: &str,
        sink: RecorderSink<Vec<u8>>,
    ) -> Result<u32> {
        let id = self.issue_id();
        self.sinks.borrow_mut().insert(id, sink);
        self.recorder_calls.borrow_mut().push((id, "start"));
        Ok(id)
    }

    fn pause_recorder(&self, recorder: &u32) {
        self.recorder_calls.borrow_mut().push((*recorder, "pause"));
    }

    fn resume_recorder(&self, recorder: &u32) {
        self.recorder_calls.borrow_mut().push((*recorder, "resume"));
    }

    fn stop_recorder(&self, recorder: &u32) {
        self.recorder_calls.borrow_mut().push((*recorder, "stop"));
    }

    fn assemble(
        &self,
        chunks: Vec<Vec<u8>>,
        mime: &str,
        file_name: String,
    ) -> Result<Artifact<Vec<u8>>> {
        Ok(Artifact {
            url: format!("blob:mock/{}", file_name),
            blob: chunks.concat(),
            file_name: Some(file_name),
            mime: mime.to_string(),
        })
    }

    fn release(&self, artifact: &Artifact<Vec<u8>>) {
        self.released.borrow_mut().push(artifact.url.clone());
    }

    fn now_ms(&self) -> f64 {
        self.clock.get()
    }

    fn local_now(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap_or_default()
    }

    async fn sleep_ms(&self, ms: u32) {
        self.clock.set(self.clock.get() + ms as f64);
    }
}
