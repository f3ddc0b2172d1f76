//! UIコンポーネント

pub mod header;
pub mod sign_in;
pub mod role_selection;
pub mod upload_area;
pub mod camera_modal;
pub mod voice_notes;
pub mod report_form;
pub mod filter_bar;
pub mod report_card;
pub mod user_dashboard;
pub mod admin_dashboard;
