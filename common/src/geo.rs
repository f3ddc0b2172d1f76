//! 位置情報と逆ジオコーディング
//!
//! 取得に失敗しても撮影は止めない。オーバーレイから位置が消えるだけ。

use crate::error::Result;
use crate::overlay::OverlayInfo;
use serde::Deserialize;

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// 端末の現在位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// 位置情報の取得元
#[allow(async_fn_in_trait)]
pub trait Locator {
    async fn current_position(&self) -> Result<Coordinates>;

    /// 緯度経度（小数6桁の文字列）から住所を引く
    async fn reverse_geocode(&self, lat: &str, lon: &str) -> Result<String>;
}

/// 現在位置と住所をまとめて取得（失敗は握りつぶす）
pub async fn resolve_overlay<L: Locator>(locator: &L) -> OverlayInfo {
    let coords = match locator.current_position().await {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Could not get location: {}", e);
            return OverlayInfo::default();
        }
    };

    let mut info = OverlayInfo::from_coords(coords.latitude, coords.longitude);
    match locator.reverse_geocode(&info.lat, &info.lon).await {
        Ok(address) => info.address = address,
        Err(e) => log::warn!("Reverse geocoding failed: {}", e),
    }
    info
}

/// Nominatim逆ジオコーディングURL
pub fn reverse_geocode_url(base: &str, lat: &str, lon: &str) -> String {
    format!(
        "{}/reverse?format=json&lat={}&lon={}",
        base.trim_end_matches('/'),
        lat,
        lon
    )
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Nominatimのレスポンスから住所を取り出す（無ければ "lat, lon"）
pub fn parse_reverse_response(body: &str, lat: &str, lon: &str) -> Result<String> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    Ok(response
        .display_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{}, {}", lat, lon)))
}
