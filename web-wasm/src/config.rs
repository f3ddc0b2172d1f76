//! ビルド時設定

use civic_report_common::geo::NOMINATIM_BASE_URL;

/// 通報APIのベースURL（未設定なら同一オリジン）
pub fn api_base_url() -> &'static str {
    option_env!("CIVIC_API_URL").unwrap_or("")
}

pub fn geocoder_base_url() -> &'static str {
    option_env!("CIVIC_GEOCODER_URL").unwrap_or(NOMINATIM_BASE_URL)
}
