//! コマンドライン指定の座標とNominatim逆ジオコーディング

use super::read_success;
use civic_report_common::geo::{parse_reverse_response, reverse_geocode_url};
use civic_report_common::{Coordinates, Error, Locator, Result};

/// `--lat/--lon` で渡された位置を返す
pub struct CliLocator {
    client: reqwest::Client,
    geocoder_url: String,
    position: Option<Coordinates>,
}

impl CliLocator {
    pub fn new(client: reqwest::Client, geocoder_url: impl Into<String>, position: Option<Coordinates>) -> Self {
        Self {
            client,
            geocoder_url: geocoder_url.into(),
            position,
        }
    }
}

impl Locator for CliLocator {
    async fn current_position(&self) -> Result<Coordinates> {
        self.position
            .ok_or_else(|| Error::Geolocation("--lat/--lon not given".into()))
    }

    async fn reverse_geocode(&self, lat: &str, lon: &str) -> Result<String> {
        let url = reverse_geocode_url(&self.geocoder_url, lat, lon);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Geolocation(e.to_string()))?;
        let body = read_success(response).await.map_err(Error::Geolocation)?;
        parse_reverse_response(&body, lat, lon)
    }
}
