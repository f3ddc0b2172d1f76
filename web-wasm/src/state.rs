//! アプリ全体の状態
//!
//! 撮影オブジェクトやストアは `Rc` なので `StoredValue::new_local` に置き、
//! 画面が購読する値だけをシグナルに写す。

use crate::api::geocode::WebLocator;
use crate::api::reports::HttpUploader;
use crate::config;
use crate::host::WebMediaHost;
use crate::identity;
use crate::storage::LocalStore;
use civic_report_common::{
    CaptureSession, Identity, MediaHost, MediaSnapshot, Notification, NotificationLog, PhotoCapture, Report, ReportStatus,
    ReportStore, Role, VideoCapture, VoiceCapture, SEED_REPORTS,
};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::Blob;

/// 画面に出さない実体
#[derive(Clone)]
pub struct Services {
    pub host: Rc<WebMediaHost>,
    pub session: Rc<CaptureSession<WebMediaHost>>,
    pub photos: Rc<PhotoCapture<WebMediaHost>>,
    pub video: Rc<VideoCapture<WebMediaHost>>,
    pub voice: Rc<VoiceCapture<WebMediaHost>>,
    pub store: Rc<RefCell<ReportStore<LocalStore>>>,
    pub notifications: Rc<RefCell<NotificationLog<LocalStore>>>,
    pub locator: Rc<WebLocator>,
    pub uploader: Rc<HttpUploader>,
}

impl Services {
    fn new() -> Self {
        let host = Rc::new(WebMediaHost::new());
        let session = Rc::new(CaptureSession::new(host.clone()));
        Self {
            photos: Rc::new(PhotoCapture::new(session.clone())),
            video: VideoCapture::new(session.clone()),
            voice: VoiceCapture::new(host.clone()),
            store: Rc::new(RefCell::new(ReportStore::open(LocalStore, SEED_REPORTS))),
            notifications: Rc::new(RefCell::new(NotificationLog::open(LocalStore))),
            locator: Rc::new(WebLocator::new(config::geocoder_base_url())),
            uploader: Rc::new(HttpUploader::new(config::api_base_url())),
            host,
            session,
        }
    }

    /// 撮影済みメディアを受け取り、フォームを空にする
    ///
    /// 録画・録音の途中だったものは破棄する。URLは解放しない。
    pub fn take_media(&self) -> MediaSnapshot<Blob> {
        MediaSnapshot {
            images: self.photos.take(),
            videos: self.video.take(),
            voice_notes: self.voice.take(),
        }
    }

    /// サーバー版に置き換わった後、手元のURLを手放す
    pub fn release_media(&self, media: &MediaSnapshot<Blob>) {
        for artifact in media.images.iter().chain(&media.videos).chain(&media.voice_notes) {
            self.host.release(artifact);
        }
    }
}

/// プレビュー表示用の軽量な情報
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub url: String,
    pub name: String,
}

fn items(artifacts: Vec<civic_report_common::Artifact<Blob>>) -> Vec<MediaItem> {
    artifacts
        .into_iter()
        .map(|a| MediaItem {
            name: a.file_name.unwrap_or_default(),
            url: a.url,
        })
        .collect()
}

#[derive(Clone, Copy)]
pub struct AppContext {
    services: StoredValue<Services, LocalStorage>,
    pub reports: RwSignal<Vec<Report>>,
    pub notifications: RwSignal<Vec<Notification>>,
    /// 撮影オブジェクトが変化するたびに進む
    pub media_version: RwSignal<u32>,
    pub identity: RwSignal<Identity>,
    /// ヘッダーから選んだ画面（Noneはロールの既定画面）
    pub requested: RwSignal<Option<Role>>,
}

impl AppContext {
    pub fn new() -> Self {
        let services = Services::new();
        let reports = RwSignal::new(services.store.borrow().reports().to_vec());
        let notifications =
            RwSignal::new(services.notifications.borrow().notifications().to_vec());
        let media_version = RwSignal::new(0u32);

        let bump: Rc<dyn Fn()> = Rc::new(move || media_version.update(|v| *v += 1));
        services.photos.set_on_change(bump.clone());
        services.video.set_on_change(bump.clone());
        services.voice.set_on_change(bump);

        Self {
            services: StoredValue::new_local(services),
            reports,
            notifications,
            media_version,
            identity: RwSignal::new(Identity::default()),
            requested: RwSignal::new(None),
        }
    }

    pub fn services(&self) -> Services {
        self.services.get_value()
    }

    pub fn refresh_reports(&self) {
        let reports = self.services().store.borrow().reports().to_vec();
        self.reports.set(reports);
    }

    pub fn set_status(&self, id: &str, status: ReportStatus) {
        let changed = self.services().store.borrow_mut().set_status(id, status);
        if changed {
            log::info!("Report {} marked {}", id, status);
            self.refresh_reports();
        }
    }

    /// 空白のみは送らない
    pub fn broadcast(&self, message: &str) -> bool {
        let services = self.services();
        let mut log = services.notifications.borrow_mut();
        if log.add(message, js_sys::Date::now() as i64).is_none() {
            return false;
        }
        self.notifications.set(log.notifications().to_vec());
        true
    }

    pub fn export_reports(&self) {
        match self.services().store.borrow().export_json() {
            Ok(json) => crate::export::download_json(&json),
            Err(e) => log::error!("Export failed: {}", e),
        }
    }

    pub fn photo_items(&self) -> Vec<MediaItem> {
        self.media_version.track();
        items(self.services().photos.photos())
    }

    pub fn video_items(&self) -> Vec<MediaItem> {
        self.media_version.track();
        items(self.services().video.videos())
    }

    pub fn voice_items(&self) -> Vec<MediaItem> {
        self.media_version.track();
        items(self.services().voice.notes())
    }

    pub async fn reload_identity(&self) {
        match identity::get_identity().await {
            Ok(identity) => self.identity.set(identity),
            Err(e) => {
                log::error!("{}", e);
                self.identity.set(Identity {
                    is_loaded: true,
                    user: None,
                });
            }
        }
    }
}

pub fn use_app() -> AppContext {
    expect_context::<AppContext>()
}
