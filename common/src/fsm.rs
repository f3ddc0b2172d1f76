//! 録画・録音の状態遷移
//!
//! 不正な遷移はすべて無視する（falseを返すだけでpanicしない）。

/// 録画・録音の状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordingState {
    #[default]
    Idle,
    /// 開始処理中（デバイス取得待ち）
    Starting,
    Recording,
    Paused,
    /// 停止要求済み、エンコーダの停止通知待ち
    Stopping,
    Completed,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Starting => "starting",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Stopping => "stopping",
            RecordingState::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFsm {
    state: RecordingState,
}

impl RecordingFsm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// 録画中または一時停止中
    pub fn is_active(&self) -> bool {
        matches!(self.state, RecordingState::Recording | RecordingState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecordingState::Paused
    }

    /// Idle/Completed → Starting
    pub fn begin(&mut self) -> bool {
        self.transition(
            |s| matches!(s, RecordingState::Idle | RecordingState::Completed),
            RecordingState::Starting,
        )
    }

    /// Starting → Recording
    pub fn started(&mut self) -> bool {
        self.transition(|s| s == RecordingState::Starting, RecordingState::Recording)
    }

    /// 開始失敗。Starting → Idle
    pub fn abort(&mut self) -> bool {
        self.transition(|s| s == RecordingState::Starting, RecordingState::Idle)
    }

    pub fn pause(&mut self) -> bool {
        self.transition(|s| s == RecordingState::Recording, RecordingState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(|s| s == RecordingState::Paused, RecordingState::Recording)
    }

    /// Recording/Paused → Stopping
    pub fn stop(&mut self) -> bool {
        self.transition(
            |s| matches!(s, RecordingState::Recording | RecordingState::Paused),
            RecordingState::Stopping,
        )
    }

    /// Stopping → Completed
    pub fn complete(&mut self) -> bool {
        self.transition(|s| s == RecordingState::Stopping, RecordingState::Completed)
    }

    /// 後始末で強制的にIdleへ戻す
    pub fn reset(&mut self) {
        self.state = RecordingState::Idle;
    }

    fn transition(&mut self, allowed: impl Fn(RecordingState) -> bool, next: RecordingState) -> bool {
        if allowed(self.state) {
            self.state = next;
            true
        } else {
            false
        }
    }
}
