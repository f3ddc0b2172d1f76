//! Civic Report Web App (Leptos + WASM)

mod app;
mod components;
mod api;
mod config;
mod export;
mod host;
mod identity;
mod js_error;
mod logger;
mod state;
mod storage;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    logger::init(if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    leptos::mount::mount_to_body(app::App);
}
