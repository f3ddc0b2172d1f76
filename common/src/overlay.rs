//! 撮影オーバーレイ（日時・住所・緯度経度）
//!
//! 写真と動画の両方で同じレイアウトを使う。描画そのものはホスト側
//! （ブラウザのcanvas）が行い、ここでは文字列と座標だけを決める。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 下部の帯の高さ(px)
pub const BAR_HEIGHT: u32 = 80;
/// 帯の塗り色
pub const BAR_FILL: &str = "rgba(0,0,0,0.6)";
pub const TEXT_FILL: &str = "white";
pub const TEXT_FONT: &str = "16px sans-serif";
pub const TEXT_X: f64 = 10.0;

const DATE_OFFSET: u32 = 55;
const ADDRESS_OFFSET: u32 = 35;
const COORDS_OFFSET: u32 = 15;

/// 撮影開始時点の位置情報スナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayInfo {
    /// 小数6桁固定
    pub lat: String,
    pub lon: String,
    pub address: String,
}

impl OverlayInfo {
    pub fn from_coords(latitude: f64, longitude: f64) -> Self {
        Self {
            lat: format!("{:.6}", latitude),
            lon: format!("{:.6}", longitude),
            address: String::new(),
        }
    }

    pub fn has_coords(&self) -> bool {
        !self.lat.is_empty() && !self.lon.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() && self.lon.is_empty() && self.address.is_empty()
    }
}

/// 帯に描く1行
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// 帯の上端のy座標
pub fn bar_top(height: u32) -> f64 {
    height.saturating_sub(BAR_HEIGHT) as f64
}

/// 描画する行を決める
///
/// 住所は空でなければ、緯度経度は両方そろっていれば表示する。
pub fn overlay_lines(info: &OverlayInfo, local_now: NaiveDateTime, height: u32) -> Vec<OverlayLine> {
    let line = |text: String, offset: u32| OverlayLine {
        text,
        x: TEXT_X,
        y: height.saturating_sub(offset) as f64,
    };

    let mut lines = vec![line(format_timestamp(local_now), DATE_OFFSET)];
    if !info.address.is_empty() {
        lines.push(line(info.address.clone(), ADDRESS_OFFSET));
    }
    if info.has_coords() {
        lines.push(line(format!("Lat: {}  Lon: {}", info.lat, info.lon), COORDS_OFFSET));
    }
    lines
}

pub fn format_timestamp(local_now: NaiveDateTime) -> String {
    local_now.format("%-m/%-d/%Y %-I:%M:%S %p").to_string()
}
