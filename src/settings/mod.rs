pub mod handlers;
pub mod store;
pub mod types;

pub use handlers::{
    get_settings_handler, reset_settings_handler, save_settings_handler, update_settings_handler,
};
pub use store::SettingsStore;
pub use types::{Settings, SettingsResponse, ThemeMode, ThumbSize};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings patch must be a JSON object")]
    NotAnObject,

    #[error("Invalid settings value: {0}")]
    InvalidValue(#[from] serde_json::Error),
}
