//! 写真・動画・ボイスメモの撮影
//!
//! - PhotoCapture: 1回の呼び出しで静止画を1枚作る
//! - VideoCapture: canvas合成した映像とマイク音声をまとめて録画
//! - VoiceCapture: 音声のみ。複数のメモを新しい順に保持
//!
//! どれも `Rc` の内側で `Cell`/`RefCell` を使い、`.await` をまたいで
//! 借用を保持しない。

use crate::error::{Error, Result};
use crate::fsm::{RecordingFsm, RecordingState};
use crate::geo::{resolve_overlay, Locator};
use crate::media::{
    into_acquisition, wait_for_dimensions, MediaHost, RecorderEvent, RecorderSink,
    StreamRequest, AUDIO_MIME, DRAW_FPS, FRAME_TIMEOUT_MS, VIDEO_MIME,
};
use crate::overlay::OverlayInfo;
use crate::session::CaptureSession;
use crate::types::Artifact;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// 変更通知（UIの再描画用）
#[derive(Default)]
struct Listener(RefCell<Option<Rc<dyn Fn()>>>);

impl Listener {
    fn set(&self, f: Rc<dyn Fn()>) {
        *self.0.borrow_mut() = Some(f);
    }

    fn notify(&self) {
        let f = self.0.borrow().clone();
        if let Some(f) = f {
            f();
        }
    }
}

// ============================================
// 写真
// ============================================

pub struct PhotoCapture<H: MediaHost> {
    session: Rc<CaptureSession<H>>,
    photos: RefCell<Vec<Artifact<H::Blob>>>,
    listener: Listener,
}

impl<H: MediaHost> PhotoCapture<H> {
    pub fn new(session: Rc<CaptureSession<H>>) -> Self {
        Self {
            session,
            photos: RefCell::new(Vec::new()),
            listener: Listener::default(),
        }
    }

    pub fn set_on_change(&self, f: Rc<dyn Fn()>) {
        self.listener.set(f);
    }

    /// 現在のフレームを撮影する
    ///
    /// 時間内に映像の寸法が取れなければ何も追加せず `Ok(None)`。
    /// 成功時は使った位置情報を返す（呼び出し側が住所欄に反映する）。
    pub async fn capture<L: Locator>(&self, locator: &L) -> Result<Option<OverlayInfo>> {
        if !self.session.is_open() {
            return Ok(None);
        }
        let host = self.session.host().clone();
        let Some(dims) = wait_for_dimensions(host.as_ref(), FRAME_TIMEOUT_MS).await else {
            log::warn!("Photo skipped: camera has no frame dimensions");
            return Ok(None);
        };

        let overlay = resolve_overlay(locator).await;
        let artifact = host.capture_still(dims, &overlay, host.local_now()).await?;

        self.photos.borrow_mut().push(artifact);
        self.session.set_last_overlay(overlay.clone());
        self.listener.notify();
        Ok(Some(overlay))
    }

    /// ギャラリーから選んだ画像を末尾に追加
    pub fn add_uploaded(&self, artifacts: Vec<Artifact<H::Blob>>) {
        if artifacts.is_empty() {
            return;
        }
        self.photos.borrow_mut().extend(artifacts);
        self.listener.notify();
    }

    pub fn photos(&self) -> Vec<Artifact<H::Blob>> {
        self.photos.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.photos.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.borrow().is_empty()
    }

    /// 破棄する。プレビューURLも手放す
    pub fn clear(&self) {
        let photos = self.take();
        let host = self.session.host();
        for photo in &photos {
            host.release(photo);
        }
    }

    /// 一覧を空にして中身を渡す。URLは受け取った側が持ち続ける
    pub fn take(&self) -> Vec<Artifact<H::Blob>> {
        let photos = std::mem::take(&mut *self.photos.borrow_mut());
        self.listener.notify();
        photos
    }
}

// ============================================
// 動画
// ============================================

struct VideoJob<H: MediaHost> {
    microphone: H::Stream,
    draw_loop: H::DrawLoop,
    recorder: H::Recorder,
    chunks: Vec<H::Blob>,
}

pub struct VideoCapture<H: MediaHost> {
    session: Rc<CaptureSession<H>>,
    fsm: RefCell<RecordingFsm>,
    /// `teardown` のたびに進む
    epoch: Cell<u64>,
    job: RefCell<Option<VideoJob<H>>>,
    videos: RefCell<Vec<Artifact<H::Blob>>>,
    listener: Listener,
}

impl<H: MediaHost + 'static> VideoCapture<H> {
    pub fn new(session: Rc<CaptureSession<H>>) -> Rc<Self> {
        Rc::new(Self {
            session,
            fsm: RefCell::new(RecordingFsm::new()),
            epoch: Cell::new(0),
            job: RefCell::new(None),
            videos: RefCell::new(Vec::new()),
            listener: Listener::default(),
        })
    }

    pub fn set_on_change(&self, f: Rc<dyn Fn()>) {
        self.listener.set(f);
    }

    pub fn state(&self) -> RecordingState {
        self.fsm.borrow().state()
    }

    pub fn is_recording(&self) -> bool {
        self.fsm.borrow().is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.fsm.borrow().is_paused()
    }

    /// 録画開始
    ///
    /// 録画中などIdle/Completed以外では何もしない。
    /// 開始待ちの間に `teardown` された場合は確保済みの資源を返して `Ok(())`。
    pub async fn start<L: Locator>(self: &Rc<Self>, locator: &L) -> Result<()> {
        if !self.fsm.borrow_mut().begin() {
            return Ok(());
        }
        let epoch = self.epoch.get();
        self.listener.notify();

        match self.try_start(locator, epoch).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Unable to start video recording: {}", e);
                if !self.cancelled(epoch) {
                    self.fsm.borrow_mut().abort();
                    self.listener.notify();
                }
                Err(e)
            }
        }
    }

    async fn try_start<L: Locator>(self: &Rc<Self>, locator: &L, epoch: u64) -> Result<()> {
        let host = self.session.host().clone();
        self.session.ensure_live().await?;
        if self.cancelled(epoch) {
            return Ok(());
        }
        if !self.session.is_ready() {
            return Err(Error::Acquisition(format!(
                "camera produced no frame within {} ms",
                FRAME_TIMEOUT_MS
            )));
        }

        let microphone = host
            .request_stream(StreamRequest::Microphone)
            .await
            .map_err(into_acquisition)?;
        if self.cancelled(epoch) {
            host.stop_tracks(&microphone);
            return Ok(());
        }

        // 録画中はこの位置情報を全フレームで使う
        let overlay = resolve_overlay(locator).await;
        self.session.set_last_overlay(overlay.clone());

        let dims = wait_for_dimensions(host.as_ref(), FRAME_TIMEOUT_MS).await;
        if self.cancelled(epoch) {
            host.stop_tracks(&microphone);
            return Ok(());
        }
        let Some(dims) = dims else {
            host.stop_tracks(&microphone);
            return Err(Error::NotReady(FRAME_TIMEOUT_MS));
        };

        let (draw_loop, canvas_stream) = match host.start_draw_loop(dims, overlay, DRAW_FPS) {
            Ok(v) => v,
            Err(e) => {
                host.stop_tracks(&microphone);
                return Err(e);
            }
        };

        let recorder = host
            .combine_tracks(&canvas_stream, &microphone)
            .and_then(|combined| host.start_recorder(&combined, VIDEO_MIME, self.sink()));
        let recorder = match recorder {
            Ok(r) => r,
            Err(e) => {
                host.cancel_draw_loop(draw_loop);
                host.stop_tracks(&microphone);
                return Err(e);
            }
        };

        *self.job.borrow_mut() = Some(VideoJob {
            microphone,
            draw_loop,
            recorder,
            chunks: Vec::new(),
        });
        self.fsm.borrow_mut().started();
        log::info!("Video recording started ({}x{})", dims.width, dims.height);
        self.listener.notify();
        Ok(())
    }

    /// 開始待ちの間に後始末されたか
    fn cancelled(&self, epoch: u64) -> bool {
        self.epoch.get() != epoch || self.fsm.borrow().state() != RecordingState::Starting
    }

    pub fn pause(&self) {
        if !self.fsm.borrow_mut().pause() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.session.host().pause_recorder(&recorder);
        }
        self.listener.notify();
    }

    pub fn resume(&self) {
        if !self.fsm.borrow_mut().resume() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.session.host().resume_recorder(&recorder);
        }
        self.listener.notify();
    }

    /// 停止要求。成果物はエンコーダの停止通知で確定する
    pub fn stop(&self) {
        if !self.fsm.borrow_mut().stop() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.session.host().stop_recorder(&recorder);
        }
        self.listener.notify();
    }

    /// 画面を閉じるときの必須の後始末
    ///
    /// 開始待ちの `start` も打ち切る。
    pub fn teardown(&self) {
        let job = self.job.borrow_mut().take();
        self.epoch.set(self.epoch.get() + 1);
        self.fsm.borrow_mut().reset();
        if let Some(job) = job {
            let host = self.session.host();
            host.cancel_draw_loop(job.draw_loop);
            host.stop_recorder(&job.recorder);
            host.stop_tracks(&job.microphone);
            log::debug!("Video recording torn down");
        }
    }

    /// ギャラリーから選んだ動画を先頭に追加
    pub fn add_uploaded(&self, artifacts: Vec<Artifact<H::Blob>>) {
        if artifacts.is_empty() {
            return;
        }
        self.videos.borrow_mut().splice(0..0, artifacts);
        self.listener.notify();
    }

    /// 新しい順
    pub fn videos(&self) -> Vec<Artifact<H::Blob>> {
        self.videos.borrow().clone()
    }

    /// 録画中のものも含めて破棄する。プレビューURLも手放す
    pub fn clear(&self) {
        let videos = self.take();
        let host = self.session.host();
        for video in &videos {
            host.release(video);
        }
    }

    /// 録画中のものは破棄し、確定済みの一覧を渡す
    pub fn take(&self) -> Vec<Artifact<H::Blob>> {
        self.teardown();
        let videos = std::mem::take(&mut *self.videos.borrow_mut());
        self.listener.notify();
        videos
    }

    fn recorder(&self) -> Option<H::Recorder> {
        self.job.borrow().as_ref().map(|job| job.recorder.clone())
    }

    fn sink(self: &Rc<Self>) -> RecorderSink<H::Blob> {
        let weak: Weak<Self> = Rc::downgrade(self);
        Box::new(move |event| {
            if let Some(capture) = weak.upgrade() {
                capture.handle_event(event);
            }
        })
    }

    fn handle_event(&self, event: RecorderEvent<H::Blob>) {
        match event {
            RecorderEvent::Data(chunk) => {
                if let Some(job) = self.job.borrow_mut().as_mut() {
                    job.chunks.push(chunk);
                }
            }
            RecorderEvent::Stopped => self.finish(),
        }
    }

    fn finish(&self) {
        if !self.fsm.borrow_mut().complete() {
            return;
        }
        let Some(job) = self.job.borrow_mut().take() else {
            return;
        };

        let host = self.session.host();
        host.cancel_draw_loop(job.draw_loop);
        host.stop_tracks(&job.microphone);

        let file_name = format!("vid_{}.webm", host.now_ms() as i64);
        match host.assemble(job.chunks, VIDEO_MIME, file_name) {
            Ok(artifact) => self.videos.borrow_mut().insert(0, artifact),
            Err(e) => log::error!("Could not assemble recorded video: {}", e),
        }
        self.listener.notify();
    }
}

// ============================================
// ボイスメモ
// ============================================

struct VoiceJob<H: MediaHost> {
    microphone: H::Stream,
    recorder: H::Recorder,
    chunks: Vec<H::Blob>,
}

pub struct VoiceCapture<H: MediaHost> {
    host: Rc<H>,
    fsm: RefCell<RecordingFsm>,
    epoch: Cell<u64>,
    job: RefCell<Option<VoiceJob<H>>>,
    notes: RefCell<Vec<Artifact<H::Blob>>>,
    listener: Listener,
}

impl<H: MediaHost + 'static> VoiceCapture<H> {
    pub fn new(host: Rc<H>) -> Rc<Self> {
        Rc::new(Self {
            host,
            fsm: RefCell::new(RecordingFsm::new()),
            epoch: Cell::new(0),
            job: RefCell::new(None),
            notes: RefCell::new(Vec::new()),
            listener: Listener::default(),
        })
    }

    pub fn set_on_change(&self, f: Rc<dyn Fn()>) {
        self.listener.set(f);
    }

    pub fn state(&self) -> RecordingState {
        self.fsm.borrow().state()
    }

    pub fn is_recording(&self) -> bool {
        self.fsm.borrow().is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.fsm.borrow().is_paused()
    }

    pub async fn start(self: &Rc<Self>) -> Result<()> {
        if !self.fsm.borrow_mut().begin() {
            return Ok(());
        }
        let epoch = self.epoch.get();

        let microphone = match self.host.request_stream(StreamRequest::Microphone).await {
            Ok(m) => m,
            Err(e) => {
                if self.epoch.get() == epoch {
                    self.fsm.borrow_mut().abort();
                }
                return Err(into_acquisition(e));
            }
        };
        // 許可待ちの間に後始末された
        if self.epoch.get() != epoch || self.fsm.borrow().state() != RecordingState::Starting {
            self.host.stop_tracks(&microphone);
            return Ok(());
        }

        let recorder = match self.host.start_recorder(&microphone, AUDIO_MIME, self.sink()) {
            Ok(r) => r,
            Err(e) => {
                self.host.stop_tracks(&microphone);
                self.fsm.borrow_mut().abort();
                return Err(e);
            }
        };

        *self.job.borrow_mut() = Some(VoiceJob {
            microphone,
            recorder,
            chunks: Vec::new(),
        });
        self.fsm.borrow_mut().started();
        self.listener.notify();
        Ok(())
    }

    pub fn pause(&self) {
        if !self.fsm.borrow_mut().pause() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.host.pause_recorder(&recorder);
        }
        self.listener.notify();
    }

    pub fn resume(&self) {
        if !self.fsm.borrow_mut().resume() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.host.resume_recorder(&recorder);
        }
        self.listener.notify();
    }

    pub fn stop(&self) {
        if !self.fsm.borrow_mut().stop() {
            return;
        }
        if let Some(recorder) = self.recorder() {
            self.host.stop_recorder(&recorder);
        }
        self.listener.notify();
    }

    pub fn teardown(&self) {
        let job = self.job.borrow_mut().take();
        self.epoch.set(self.epoch.get() + 1);
        self.fsm.borrow_mut().reset();
        if let Some(job) = job {
            self.host.stop_recorder(&job.recorder);
            self.host.stop_tracks(&job.microphone);
        }
    }

    /// 新しい順
    pub fn notes(&self) -> Vec<Artifact<H::Blob>> {
        self.notes.borrow().clone()
    }

    /// 再生用
    pub fn note(&self, index: usize) -> Option<Artifact<H::Blob>> {
        self.notes.borrow().get(index).cloned()
    }

    /// 録音中のものも含めて破棄する。再生用URLも手放す
    pub fn clear(&self) {
        let notes = self.take();
        for note in &notes {
            self.host.release(note);
        }
    }

    /// 録音中のものは破棄し、確定済みのメモを渡す
    pub fn take(&self) -> Vec<Artifact<H::Blob>> {
        self.teardown();
        let notes = std::mem::take(&mut *self.notes.borrow_mut());
        self.listener.notify();
        notes
    }

    fn recorder(&self) -> Option<H::Recorder> {
        self.job.borrow().as_ref().map(|job| job.recorder.clone())
    }

    fn sink(self: &Rc<Self>) -> RecorderSink<H::Blob> {
        let weak: Weak<Self> = Rc::downgrade(self);
        Box::new(move |event| {
            if let Some(capture) = weak.upgrade() {
                capture.handle_event(event);
            }
        })
    }

    fn handle_event(&self, event: RecorderEvent<H::Blob>) {
        match event {
            RecorderEvent::Data(chunk) => {
                if let Some(job) = self.job.borrow_mut().as_mut() {
                    job.chunks.push(chunk);
                }
            }
            RecorderEvent::Stopped => self.finish(),
        }
    }

    fn finish(&self) {
        if !self.fsm.borrow_mut().complete() {
            return;
        }
        let Some(job) = self.job.borrow_mut().take() else {
            return;
        };

        // マイクを開いたままにしない
        self.host.stop_tracks(&job.microphone);

        let file_name = format!("voice_{}.webm", self.host.now_ms() as i64);
        match self.host.assemble(job.chunks, AUDIO_MIME, file_name) {
            Ok(artifact) => self.notes.borrow_mut().insert(0, artifact),
            Err(e) => log::error!("Could not assemble voice note: {}", e),
        }
        self.listener.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::tests::FixedLocator;
    use crate::geo::Coordinates;
    use crate::media::Facing;
    use crate::testing::MockHost;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    fn locator() -> FixedLocator {
        FixedLocator {
            position: Some(Coordinates { latitude: 22.5726, longitude: 88.3639 }),
            address: Some("Kolkata".into()),
        }
    }

    fn denied_locator() -> FixedLocator {
        FixedLocator { position: None, address: None }
    }

    fn open_session(host: MockHost) -> Rc<CaptureSession<MockHost>> {
        let session = Rc::new(CaptureSession::new(Rc::new(host)));
        block_on(session.open_camera()).unwrap();
        session
    }

    #[test]
    fn test_photo_capture_appends_with_overlay() {
        let session = open_session(MockHost::new());
        let photo = PhotoCapture::new(session.clone());

        let overlay = block_on(photo.capture(&locator())).unwrap().unwrap();
        assert_eq!(overlay.address, "Kolkata");
        assert_eq!(photo.len(), 1);
        assert_eq!(session.last_overlay().lat, "22.572600");
        assert_eq!(session.host().overlays.borrow()[0], overlay);
    }

    #[test]
    fn test_photo_capture_with_denied_location() {
        let session = open_session(MockHost::new());
        let photo = PhotoCapture::new(session);
        let overlay = block_on(photo.capture(&denied_locator())).unwrap().unwrap();
        assert!(overlay.is_empty());
        assert_eq!(photo.len(), 1);
    }

    #[test]
    fn test_photo_capture_without_dimensions_is_noop() {
        let host = MockHost::new();
        host.set_camera_delivers(StreamRequest::Camera(Facing::Environment), false);
        host.set_camera_delivers(StreamRequest::AnyCamera, false);
        let session = open_session(host);
        let photo = PhotoCapture::new(session);
        photo.add_uploaded(vec![Artifact {
            url: "blob:gallery/1".into(),
            blob: vec![9],
            file_name: Some("street.jpg".into()),
            mime: "image/jpeg".into(),
        }]);

        let result = block_on(photo.capture(&locator())).unwrap();
        assert!(result.is_none());
        assert_eq!(photo.len(), 1);
        assert_eq!(photo.photos()[0].url, "blob:gallery/1");
    }

    #[test]
    fn test_photo_capture_without_camera() {
        let session = Rc::new(CaptureSession::new(Rc::new(MockHost::new())));
        let photo = PhotoCapture::new(session);
        assert!(block_on(photo.capture(&locator())).unwrap().is_none());
        assert!(photo.is_empty());
    }

    #[test]
    fn test_video_lifecycle_releases_microphone() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        block_on(video.start(&locator())).unwrap();
        assert_eq!(video.state(), RecordingState::Recording);

        let host = session.host();
        let mic = host.microphones.borrow()[0];
        let recorder = host.last_recorder().unwrap();
        assert!(host.is_live(mic));
        assert_eq!(host.active_loops.borrow().len(), 1);

        host.emit(recorder, RecorderEvent::Data(vec![1, 2]));
        video.pause();
        assert!(video.is_paused());
        video.resume();
        host.emit(recorder, RecorderEvent::Data(vec![3]));
        video.stop();
        assert_eq!(video.state(), RecordingState::Stopping);
        host.emit(recorder, RecorderEvent::Stopped);

        assert_eq!(video.state(), RecordingState::Completed);
        assert!(!host.is_live(mic));
        assert!(host.active_loops.borrow().is_empty());
        assert_eq!(host.cancelled_loops.borrow().len(), 1);

        let videos = video.videos();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].blob, vec![1, 2, 3]);
        assert_eq!(videos[0].mime, VIDEO_MIME);

        // 二重の停止通知でも解放は1回だけ
        host.emit(recorder, RecorderEvent::Stopped);
        assert_eq!(host.cancelled_loops.borrow().len(), 1);
        assert_eq!(video.videos().len(), 1);
    }

    #[test]
    fn test_video_stop_from_paused() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        block_on(video.start(&locator())).unwrap();
        video.pause();
        video.stop();
        let recorder = session.host().last_recorder().unwrap();
        session.host().emit(recorder, RecorderEvent::Stopped);
        assert_eq!(video.videos().len(), 1);
    }

    #[test]
    fn test_video_invalid_transitions_are_noops() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        video.pause();
        video.resume();
        video.stop();
        assert_eq!(video.state(), RecordingState::Idle);

        block_on(video.start(&locator())).unwrap();
        video.resume();
        assert_eq!(video.state(), RecordingState::Recording);
        // 録画中の再開始は無視
        block_on(video.start(&locator())).unwrap();
        assert_eq!(session.host().microphones.borrow().len(), 1);
    }

    #[test]
    fn test_video_newest_first() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        video.add_uploaded(vec![Artifact {
            url: "blob:gallery/v".into(),
            blob: vec![],
            file_name: Some("clip.mp4".into()),
            mime: "video/mp4".into(),
        }]);

        block_on(video.start(&locator())).unwrap();
        video.stop();
        let recorder = session.host().last_recorder().unwrap();
        session.host().emit(recorder, RecorderEvent::Stopped);

        let videos = video.videos();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].mime, VIDEO_MIME);
        assert_eq!(videos[1].url, "blob:gallery/v");
    }

    #[test]
    fn test_video_freezes_overlay() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        block_on(video.start(&locator())).unwrap();
        let overlays = session.host().overlays.borrow();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].address, "Kolkata");
    }

    #[test]
    fn test_video_start_reopens_stale_camera() {
        let session = open_session(MockHost::new());
        session.host().freeze_attached();
        let video = VideoCapture::new(session.clone());
        block_on(video.start(&locator())).unwrap();
        assert!(video.is_recording());
        assert!(session.is_ready());
    }

    #[test]
    fn test_video_start_fails_when_camera_denied() {
        let host = MockHost::new();
        host.deny(StreamRequest::Camera(Facing::Environment));
        let session = Rc::new(CaptureSession::new(Rc::new(host)));
        let video = VideoCapture::new(session.clone());

        let err = block_on(video.start(&locator())).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(session.host().microphones.borrow().is_empty());
    }

    #[test]
    fn test_video_start_microphone_denied() {
        let host = MockHost::new();
        host.deny(StreamRequest::Microphone);
        let session = open_session(host);
        let video = VideoCapture::new(session.clone());
        let err = block_on(video.start(&locator())).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(session.host().active_loops.borrow().is_empty());
    }

    #[test]
    fn test_video_silent_camera_is_acquisition_error() {
        let host = MockHost::new();
        host.set_camera_delivers(StreamRequest::Camera(Facing::Environment), false);
        host.set_camera_delivers(StreamRequest::AnyCamera, false);
        let session = open_session(host);
        let video = VideoCapture::new(session.clone());

        let err = block_on(video.start(&locator())).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(video.state(), RecordingState::Idle);
        // マイクは要求しない
        assert!(session.host().microphones.borrow().is_empty());
    }

    #[test]
    fn test_video_stale_camera_reopens_silent() {
        let session = open_session(MockHost::new());
        let host = session.host();
        host.freeze_attached();
        host.set_camera_delivers(StreamRequest::Camera(Facing::Environment), false);
        host.set_camera_delivers(StreamRequest::AnyCamera, false);
        let video = VideoCapture::new(session.clone());

        let err = block_on(video.start(&locator())).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(host.microphones.borrow().is_empty());
        assert!(host.active_loops.borrow().is_empty());
        assert!(!session.is_ready());
    }

    #[test]
    fn test_video_closed_while_opening_camera() {
        let session = Rc::new(CaptureSession::new(Rc::new(MockHost::new())));
        let video = VideoCapture::new(session.clone());
        let gate = session.host().close_gate();
        let result = Rc::new(RefCell::new(None));

        let mut pool = LocalPool::new();
        let (starting, out) = (video.clone(), result.clone());
        pool.spawner()
            .spawn_local(async move {
                let r = starting.start(&locator()).await;
                *out.borrow_mut() = Some(r);
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(video.state(), RecordingState::Starting);

        video.teardown();
        session.stop_camera();
        gate.send(()).unwrap();
        pool.run();

        assert!(matches!(*result.borrow(), Some(Ok(()))));
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(!session.is_open());
        assert_eq!(session.host().live_count(), 0);
        assert!(session.host().microphones.borrow().is_empty());
    }

    #[test]
    fn test_video_closed_while_waiting_for_microphone() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        let gate = session.host().close_gate();

        let mut pool = LocalPool::new();
        let starting = video.clone();
        pool.spawner()
            .spawn_local(async move {
                starting.start(&locator()).await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();

        video.teardown();
        session.stop_camera();
        gate.send(()).unwrap();
        pool.run();

        let host = session.host();
        let mic = host.microphones.borrow()[0];
        assert!(!host.is_live(mic));
        assert_eq!(host.live_count(), 0);
        assert!(host.last_recorder().is_none());
        assert!(host.active_loops.borrow().is_empty());
        assert_eq!(video.state(), RecordingState::Idle);
    }

    #[test]
    fn test_video_clear_discards_active_recording() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        video.add_uploaded(vec![Artifact {
            url: "blob:gallery/v".into(),
            blob: vec![],
            file_name: Some("clip.mp4".into()),
            mime: "video/mp4".into(),
        }]);
        block_on(video.start(&locator())).unwrap();
        let host = session.host();
        let mic = host.microphones.borrow()[0];
        let recorder = host.last_recorder().unwrap();
        host.emit(recorder, RecorderEvent::Data(vec![1]));

        video.clear();
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(!host.is_live(mic));
        assert!(host.active_loops.borrow().is_empty());
        assert_eq!(*host.released.borrow(), vec!["blob:gallery/v".to_string()]);

        // 遅れて届いた停止通知で復活しない
        host.emit(recorder, RecorderEvent::Stopped);
        assert!(video.videos().is_empty());
    }

    #[test]
    fn test_video_teardown_cleans_up() {
        let session = open_session(MockHost::new());
        let video = VideoCapture::new(session.clone());
        block_on(video.start(&locator())).unwrap();
        let mic = session.host().microphones.borrow()[0];

        video.teardown();
        session.stop_camera();
        assert_eq!(video.state(), RecordingState::Idle);
        assert!(!session.host().is_live(mic));
        assert!(session.host().active_loops.borrow().is_empty());
        assert_eq!(session.host().live_count(), 1); // canvasストリームのみ

        // 後から届いた停止通知は無視される
        let recorder = session.host().last_recorder().unwrap();
        session.host().emit(recorder, RecorderEvent::Stopped);
        assert!(video.videos().is_empty());
        assert_eq!(session.host().cancelled_loops.borrow().len(), 1);
    }

    #[test]
    fn test_voice_notes_most_recent_first() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host.clone());

        for payload in [vec![1u8], vec![2u8]] {
            block_on(voice.start()).unwrap();
            let recorder = host.last_recorder().unwrap();
            host.emit(recorder, RecorderEvent::Data(payload));
            voice.stop();
            host.emit(recorder, RecorderEvent::Stopped);
        }

        let notes = voice.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].blob, vec![2]);
        assert_eq!(voice.note(1).map(|n| n.blob), Some(vec![1]));
        assert!(voice.note(2).is_none());
        assert_eq!(notes[0].mime, AUDIO_MIME);
        // マイクはすべて解放済み
        for mic in host.microphones.borrow().iter() {
            assert!(!host.is_live(*mic));
        }
    }

    #[test]
    fn test_voice_invalid_transitions() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host.clone());
        voice.stop();
        voice.pause();
        voice.resume();
        assert_eq!(voice.state(), RecordingState::Idle);
        assert!(host.recorder_calls.borrow().is_empty());

        block_on(voice.start()).unwrap();
        voice.resume();
        voice.pause();
        voice.pause();
        let calls: Vec<&str> = host.recorder_calls.borrow().iter().map(|(_, c)| *c).collect();
        assert_eq!(calls, vec!["start", "pause"]);
    }

    #[test]
    fn test_voice_microphone_denied() {
        let host = Rc::new(MockHost::new());
        host.deny(StreamRequest::Microphone);
        let voice = VoiceCapture::new(host);
        assert!(matches!(block_on(voice.start()), Err(Error::Acquisition(_))));
        assert_eq!(voice.state(), RecordingState::Idle);
    }

    #[test]
    fn test_voice_take_discards_active_recording() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host.clone());
        block_on(voice.start()).unwrap();
        let first = host.last_recorder().unwrap();
        host.emit(first, RecorderEvent::Data(vec![1]));
        voice.stop();
        host.emit(first, RecorderEvent::Stopped);

        block_on(voice.start()).unwrap();
        let second = host.last_recorder().unwrap();
        host.emit(second, RecorderEvent::Data(vec![2]));

        let taken = voice.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].blob, vec![1]);
        assert!(voice.notes().is_empty());
        assert_eq!(voice.state(), RecordingState::Idle);
        for mic in host.microphones.borrow().iter() {
            assert!(!host.is_live(*mic));
        }
        // 渡したURLは手放さない
        assert!(host.released.borrow().is_empty());

        voice.stop();
        host.emit(second, RecorderEvent::Stopped);
        assert!(voice.notes().is_empty());
    }

    #[test]
    fn test_voice_clear_releases_urls() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host.clone());
        block_on(voice.start()).unwrap();
        let recorder = host.last_recorder().unwrap();
        voice.stop();
        host.emit(recorder, RecorderEvent::Stopped);
        let url = voice.notes()[0].url.clone();

        voice.clear();
        assert!(voice.notes().is_empty());
        assert_eq!(*host.released.borrow(), vec![url]);
    }

    #[test]
    fn test_voice_closed_while_waiting_for_microphone() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host.clone());
        let gate = host.close_gate();

        let mut pool = LocalPool::new();
        let starting = voice.clone();
        pool.spawner()
            .spawn_local(async move {
                starting.start().await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();

        voice.teardown();
        gate.send(()).unwrap();
        pool.run();

        assert_eq!(voice.state(), RecordingState::Idle);
        assert_eq!(host.live_count(), 0);
        assert!(host.last_recorder().is_none());
    }

    #[test]
    fn test_photo_clear_releases_urls() {
        let session = open_session(MockHost::new());
        let photo = PhotoCapture::new(session.clone());
        block_on(photo.capture(&locator())).unwrap();
        let url = photo.photos()[0].url.clone();

        let kept = photo.take();
        assert_eq!(kept.len(), 1);
        assert!(session.host().released.borrow().is_empty());

        photo.add_uploaded(kept);
        photo.clear();
        assert!(photo.is_empty());
        assert_eq!(*session.host().released.borrow(), vec![url]);
    }

    #[test]
    fn test_change_listener_fires() {
        let host = Rc::new(MockHost::new());
        let voice = VoiceCapture::new(host);
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        voice.set_on_change(Rc::new(move || counter.set(counter.get() + 1)));
        block_on(voice.start()).unwrap();
        voice.pause();
        assert_eq!(count.get(), 2);
    }
}
