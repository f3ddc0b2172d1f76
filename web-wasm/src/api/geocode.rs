//! ブラウザの位置情報とNominatim逆ジオコーディング

use super::{cors_init, fetch_text};
use crate::js_error::describe;
use civic_report_common::geo::{parse_reverse_response, reverse_geocode_url};
use civic_report_common::{Coordinates, Error, Locator, Result};
use js_sys::{Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Request;

pub struct WebLocator {
    geocoder_url: String,
}

impl WebLocator {
    pub fn new(geocoder_url: impl Into<String>) -> Self {
        Self {
            geocoder_url: geocoder_url.into(),
        }
    }
}

fn read_number(target: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(key)).ok()?.as_f64()
}

impl Locator for WebLocator {
    async fn current_position(&self) -> Result<Coordinates> {
        let geolocation = web_sys::window()
            .ok_or_else(|| Error::Geolocation("no window".into()))?
            .navigator()
            .geolocation()
            .map_err(|e| Error::Geolocation(describe(&e)))?;

        let promise = Promise::new(&mut |resolve, reject| {
            if let Err(e) = geolocation.get_current_position_with_error_callback(&resolve, Some(&reject)) {
                let _ = reject.call1(&JsValue::NULL, &e);
            }
        });
        let position = JsFuture::from(promise).await.map_err(|e| {
            let message = Reflect::get(&e, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
                .unwrap_or_else(|| describe(&e));
            Error::Geolocation(message)
        })?;

        let coords = Reflect::get(&position, &"coords".into())
            .map_err(|e| Error::Geolocation(describe(&e)))?;
        match (read_number(&coords, "latitude"), read_number(&coords, "longitude")) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates { latitude, longitude }),
            _ => Err(Error::Geolocation("position has no coordinates".into())),
        }
    }

    async fn reverse_geocode(&self, lat: &str, lon: &str) -> Result<String> {
        let url = reverse_geocode_url(&self.geocoder_url, lat, lon);
        let request = Request::new_with_str_and_init(&url, &cors_init("GET"))
            .map_err(|e| Error::Geolocation(describe(&e)))?;
        request
            .headers()
            .set("Accept", "application/json")
            .map_err(|e| Error::Geolocation(describe(&e)))?;

        let body = fetch_text(&request).await.map_err(Error::Geolocation)?;
        parse_reverse_response(&body, lat, lon)
    }
}
