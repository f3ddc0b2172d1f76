//! メディアデバイスのホスト抽象
//!
//! カメラ・マイクの取得、プレビュー面、canvas合成、エンコーダ、時計を
//! ひとつのトレイトにまとめる。ブラウザ実装は `civic-report-web` 側。

use crate::error::{Error, Result};
use crate::overlay::OverlayInfo;
use crate::types::{Artifact, Dimensions};
use chrono::NaiveDateTime;
use futures::future::{self, Either};
use std::pin::pin;

/// 最初のフレーム待ちの上限(ms)
pub const FRAME_TIMEOUT_MS: u32 = 3000;
/// 既存ストリームの生存確認の上限(ms)
pub const STALE_CHECK_TIMEOUT_MS: u32 = 2000;
/// 動画合成のフレームレート
pub const DRAW_FPS: u32 = 30;

pub const VIDEO_MIME: &str = "video/webm";
pub const AUDIO_MIME: &str = "audio/webm";
pub const PHOTO_MIME: &str = "image/png";

/// カメラの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    /// 背面カメラ
    Environment,
}

/// getUserMedia相当の要求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRequest {
    Camera(Facing),
    /// 制約なしのカメラ
    AnyCamera,
    Microphone,
}

/// エンコーダからの通知
#[derive(Debug)]
pub enum RecorderEvent<B> {
    /// 空でないチャンク
    Data(B),
    Stopped,
}

pub type RecorderSink<B> = Box<dyn FnMut(RecorderEvent<B>)>;

/// ブラウザ（または模擬環境）のメディアAPI
#[allow(async_fn_in_trait)]
pub trait MediaHost {
    type Stream: Clone;
    type Blob: Clone;
    type Recorder: Clone;
    type DrawLoop;

    // --- デバイス ---

    /// 権限拒否・デバイス無しは `Error::Acquisition`
    async fn request_stream(&self, request: StreamRequest) -> Result<Self::Stream>;
    /// ストリームの全トラックを停止
    fn stop_tracks(&self, stream: &Self::Stream);

    // --- プレビュー面 ---

    fn attach_preview(&self, stream: Option<&Self::Stream>);
    async fn play_preview(&self);
    /// 幅・高さが0のあいだはNone
    fn preview_dimensions(&self) -> Option<Dimensions>;
    fn supports_frame_callback(&self) -> bool;
    /// 次の映像フレームが描画されたら完了
    async fn next_video_frame(&self);
    /// 次の描画タイミングまで待つ
    async fn next_paint(&self);

    // --- 合成 ---

    /// 現在のフレームとオーバーレイを静止画にする
    async fn capture_still(
        &self,
        dims: Dimensions,
        overlay: &OverlayInfo,
        local_now: NaiveDateTime,
    ) -> Result<Artifact<Self::Blob>>;
    /// オフスクリーンcanvasへの定期描画を開始し、canvasの映像ストリームを返す
    fn start_draw_loop(
        &self,
        dims: Dimensions,
        overlay: OverlayInfo,
        fps: u32,
    ) -> Result<(Self::DrawLoop, Self::Stream)>;
    fn cancel_draw_loop(&self, draw_loop: Self::DrawLoop);
    /// 映像トラックと音声トラックを1本のストリームにまとめる
    fn combine_tracks(&self, video: &Self::Stream, audio: &Self::Stream) -> Result<Self::Stream>;

    // --- エンコーダ ---

    fn start_recorder(
        &self,
        stream: &Self::Stream,
        mime: &str,
        sink: RecorderSink<Self::Blob>,
    ) -> Result<Self::Recorder>;
    fn pause_recorder(&self, recorder: &Self::Recorder);
    fn resume_recorder(&self, recorder: &Self::Recorder);
    /// 停止要求。完了は `RecorderEvent::Stopped` で通知される
    fn stop_recorder(&self, recorder: &Self::Recorder);
    /// チャンクを連結して1つの成果物にする
    fn assemble(
        &self,
        chunks: Vec<Self::Blob>,
        mime: &str,
        file_name: String,
    ) -> Result<Artifact<Self::Blob>>;
    /// 成果物のプレビューURLを手放す。以後そのURLは表示に使えない
    fn release(&self, artifact: &Artifact<Self::Blob>);

    // --- 時計 ---

    fn now_ms(&self) -> f64;
    fn local_now(&self) -> NaiveDateTime;
    async fn sleep_ms(&self, ms: u32);
}

/// プレビューの幅・高さが0でなくなるまで描画タイミングごとに確認する
pub async fn wait_for_dimensions<H: MediaHost>(host: &H, timeout_ms: u32) -> Option<Dimensions> {
    let start = host.now_ms();
    while host.now_ms() - start < timeout_ms as f64 {
        if let Some(dims) = host.preview_dimensions() {
            return Some(dims);
        }
        host.next_paint().await;
    }
    None
}

/// 最初のフレームを待つ
///
/// フレームコールバックがあればタイムアウトと競争させ、無ければ寸法のポーリング。
pub async fn wait_for_first_frame<H: MediaHost>(host: &H, timeout_ms: u32) -> bool {
    if !host.supports_frame_callback() {
        return wait_for_dimensions(host, timeout_ms).await.is_some();
    }

    let frame = pin!(host.next_video_frame());
    let timeout = pin!(host.sleep_ms(timeout_ms));
    matches!(future::select(frame, timeout).await, Either::Left(_))
}

/// デバイス取得失敗を `Error::Acquisition` にそろえる
pub fn into_acquisition(error: Error) -> Error {
    match error {
        Error::Acquisition(_) => error,
        other => Error::Acquisition(other.to_string()),
    }
}
