//! カメラセッション
//!
//! デバイスストリームを1本だけ排他的に保持し、最初のフレームが確認できるまで
//! 撮影可能フラグを立てない。

use crate::error::Result;
use crate::media::{
    into_acquisition, wait_for_first_frame, Facing, MediaHost, StreamRequest, FRAME_TIMEOUT_MS,
    STALE_CHECK_TIMEOUT_MS,
};
use crate::overlay::OverlayInfo;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct CaptureSession<H: MediaHost> {
    host: Rc<H>,
    stream: RefCell<Option<H::Stream>>,
    ready: Cell<bool>,
    overlay: RefCell<OverlayInfo>,
    /// `stop_camera` のたびに進む。開く途中で閉じられたかの判定用
    generation: Cell<u64>,
}

impl<H: MediaHost> CaptureSession<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            stream: RefCell::new(None),
            ready: Cell::new(false),
            overlay: RefCell::new(OverlayInfo::default()),
            generation: Cell::new(0),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn is_open(&self) -> bool {
        self.stream.borrow().is_some()
    }

    /// 最初のフレームを確認済み
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// 直近の撮影で使った位置情報
    pub fn last_overlay(&self) -> OverlayInfo {
        self.overlay.borrow().clone()
    }

    pub fn set_last_overlay(&self, overlay: OverlayInfo) {
        *self.overlay.borrow_mut() = overlay;
    }

    /// カメラを開く
    ///
    /// 背面カメラが時間内にフレームを出さなければ、そのストリームを解放して
    /// 制約なしのカメラで再試行する。再試行でもフレームが来なければ
    /// 撮影可能フラグは立てずにストリームだけ保持する。
    /// 途中で `stop_camera` された場合は、後から届いたストリームも停止して終わる。
    pub async fn open_camera(&self) -> Result<()> {
        self.stop_camera();
        let generation = self.generation.get();

        let stream = self
            .host
            .request_stream(StreamRequest::Camera(Facing::Environment))
            .await
            .map_err(into_acquisition)?;
        if !self.adopt(stream, generation) {
            return Ok(());
        }
        let ok = self.wait_ready().await;
        if !self.is_current(generation) {
            return Ok(());
        }
        if ok {
            self.ready.set(true);
            return Ok(());
        }

        log::warn!("Rear camera produced no frame, falling back to any camera");
        self.release();

        let fallback = self
            .host
            .request_stream(StreamRequest::AnyCamera)
            .await
            .map_err(into_acquisition)?;
        if !self.adopt(fallback, generation) {
            return Ok(());
        }
        let ok = self.wait_ready().await;
        if !self.is_current(generation) {
            return Ok(());
        }
        if !ok {
            log::warn!("Fallback camera produced no frame within {} ms", FRAME_TIMEOUT_MS);
        }
        self.ready.set(ok);
        Ok(())
    }

    /// 全トラックを停止してプレビューから外す（開いていなければ何もしない）
    ///
    /// 開く途中の `open_camera` もこれで打ち切られる。
    pub fn stop_camera(&self) {
        self.generation.set(self.generation.get() + 1);
        self.release();
    }

    /// ストリームが無いか止まっていれば開き直す
    pub async fn ensure_live(&self) -> Result<()> {
        if !self.is_open() {
            return self.open_camera().await;
        }
        let generation = self.generation.get();
        if wait_for_first_frame(self.host.as_ref(), STALE_CHECK_TIMEOUT_MS).await {
            return Ok(());
        }
        if !self.is_current(generation) {
            return Ok(());
        }
        log::info!("Camera stream is stale, reopening");
        self.open_camera().await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    fn release(&self) {
        let stream = self.stream.borrow_mut().take();
        if let Some(stream) = stream {
            self.host.stop_tracks(&stream);
            log::debug!("Camera stream released");
        }
        self.host.attach_preview(None);
        self.ready.set(false);
    }

    /// 閉じられていなければプレビューに付けて保持する。閉じられていれば停止
    fn adopt(&self, stream: H::Stream, generation: u64) -> bool {
        if !self.is_current(generation) {
            self.host.stop_tracks(&stream);
            log::debug!("Camera closed while opening, stream released");
            return false;
        }
        self.host.attach_preview(Some(&stream));
        *self.stream.borrow_mut() = Some(stream);
        true
    }

    async fn wait_ready(&self) -> bool {
        self.host.play_preview().await;
        wait_for_first_frame(self.host.as_ref(), FRAME_TIMEOUT_MS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::MockHost;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    fn session(host: MockHost) -> CaptureSession<MockHost> {
        CaptureSession::new(Rc::new(host))
    }

    #[test]
    fn test_open_rear_camera() {
        let s = session(MockHost::new());
        block_on(s.open_camera()).unwrap();
        assert!(s.is_ready());
        assert_eq!(
            *s.host().requests.borrow(),
            vec![StreamRequest::Camera(Facing::Environment)]
        );
    }

    #[test]
    fn test_fallback_releases_rear_stream() {
        let host = MockHost::new();
        host.set_camera_delivers(StreamRequest::Camera(Facing::Environment), false);
        let s = session(host);
        block_on(s.open_camera()).unwrap();

        assert!(s.is_ready());
        assert_eq!(s.host().requests.borrow().len(), 2);
        // 背面カメラのストリームは解放済みで、生きているのは代替の1本だけ
        assert_eq!(s.host().live_count(), 1);
    }

    #[test]
    fn test_both_silent_keeps_stream_not_ready() {
        let host = MockHost::new();
        host.set_camera_delivers(StreamRequest::Camera(Facing::Environment), false);
        host.set_camera_delivers(StreamRequest::AnyCamera, false);
        let s = session(host);
        block_on(s.open_camera()).unwrap();
        assert!(!s.is_ready());
        assert!(s.is_open());
    }

    #[test]
    fn test_denied_leaves_nothing_open() {
        let host = MockHost::new();
        host.deny(StreamRequest::Camera(Facing::Environment));
        let s = session(host);
        let err = block_on(s.open_camera()).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert!(!s.is_open());
        assert!(!s.is_ready());
    }

    #[test]
    fn test_stop_camera_without_stream_is_noop() {
        let s = session(MockHost::new());
        s.stop_camera();
        s.stop_camera();
        assert!(!s.is_ready());
    }

    #[test]
    fn test_reopen_releases_previous_stream() {
        let s = session(MockHost::new());
        block_on(s.open_camera()).unwrap();
        block_on(s.open_camera()).unwrap();
        assert_eq!(s.host().live_count(), 1);
    }

    #[test]
    fn test_ensure_live_reopens_stale_stream() {
        let s = session(MockHost::new());
        block_on(s.open_camera()).unwrap();
        let first = s.host().attached().unwrap();
        s.host().freeze_attached();

        block_on(s.ensure_live()).unwrap();
        assert!(s.is_ready());
        assert_ne!(s.host().attached(), Some(first));
        assert!(!s.host().is_live(first));
    }

    #[test]
    fn test_ensure_live_keeps_healthy_stream() {
        let s = session(MockHost::new());
        block_on(s.open_camera()).unwrap();
        let first = s.host().attached();
        block_on(s.ensure_live()).unwrap();
        assert_eq!(s.host().attached(), first);
        assert_eq!(s.host().requests.borrow().len(), 1);
    }

    #[test]
    fn test_stop_while_request_pending_releases_late_stream() {
        let s = Rc::new(session(MockHost::new()));
        let gate = s.host().close_gate();

        let mut pool = LocalPool::new();
        let opening = s.clone();
        pool.spawner()
            .spawn_local(async move {
                opening.open_camera().await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(s.host().requests.borrow().len(), 1);

        s.stop_camera();
        gate.send(()).unwrap();
        pool.run();

        assert!(!s.is_open());
        assert!(!s.is_ready());
        assert_eq!(s.host().live_count(), 0);
        assert_eq!(s.host().attached(), None);
        // 代替カメラも要求しない
        assert_eq!(s.host().requests.borrow().len(), 1);
    }

    #[test]
    fn test_open_after_cancelled_open() {
        let s = Rc::new(session(MockHost::new()));
        let gate = s.host().close_gate();

        let mut pool = LocalPool::new();
        let opening = s.clone();
        pool.spawner()
            .spawn_local(async move {
                opening.open_camera().await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();
        s.stop_camera();
        gate.send(()).unwrap();
        pool.run();

        block_on(s.open_camera()).unwrap();
        assert!(s.is_ready());
        assert_eq!(s.host().live_count(), 1);
    }
}
