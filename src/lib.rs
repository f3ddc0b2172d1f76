//! Civic Report CLI
//!
//! 共通ライブラリのストア・送信処理をローカルファイルとHTTPにつなぐ

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod scanner;
pub mod storage;
