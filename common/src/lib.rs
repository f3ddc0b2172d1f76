//! Civic Report Common Library
//!
//! CLIとWeb(WASM)で共有される型・状態機械・ストア

pub mod types;
pub mod error;
pub mod overlay;
pub mod geo;
pub mod media;
pub mod fsm;
pub mod session;
pub mod capture;
pub mod store;
pub mod submit;
pub mod dashboard;
pub mod routing;

#[cfg(test)]
mod testing;

pub use types::{Artifact, Dimensions, Notification, Report, ReportStatus, Role};
pub use error::{Error, FormField, Result, ValidationError};
pub use overlay::OverlayInfo;
pub use geo::{resolve_overlay, Coordinates, Locator};
pub use media::{MediaHost, RecorderEvent, RecorderSink, StreamRequest};
pub use fsm::{RecordingFsm, RecordingState};
pub use session::CaptureSession;
pub use capture::{PhotoCapture, VideoCapture, VoiceCapture};
pub use store::{MemoryPersistence, NotificationLog, Persistence, ReportStore, SEED_REPORTS};
pub use submit::{
    commit_local, reconcile, submit, validate, MediaSnapshot, ReportForm, ReportUploader,
    SubmitOutcome, UploadFile, UploadPayload,
};
pub use dashboard::{filter_options, summarize_description, FilterOptions, ReportFilter, ReportStats};
pub use routing::{guard, resolve, Guard, Identity, IdentityUser, Route};
