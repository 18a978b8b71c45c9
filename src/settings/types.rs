use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThumbSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Display preferences persisted in `app_settings.json`. Every field falls
/// back to its default when absent from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme_mode: ThemeMode,
    pub accent: String,
    pub show_timestamps: bool,
    pub grid_columns: u32,
    pub thumb_size: ThumbSize,
    pub autoplay_hero: bool,
    /// Seconds.
    pub autoplay_interval: u32,
    /// Minutes, 0 disables.
    pub auto_ping_interval: u32,
    pub webhook_url: String,
    pub auto_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Light,
            accent: "#0b6cff".to_string(),
            show_timestamps: true,
            grid_columns: 4,
            thumb_size: ThumbSize::Medium,
            autoplay_hero: false,
            autoplay_interval: 5,
            auto_ping_interval: 0,
            webhook_url: String::new(),
            auto_save: false,
        }
    }
}

impl Settings {
    /// Clamp numeric fields to the ranges the UI offers.
    pub fn normalized(mut self) -> Self {
        self.grid_columns = self.grid_columns.clamp(2, 6);
        self.autoplay_interval = self.autoplay_interval.clamp(2, 30);
        self.auto_ping_interval = self.auto_ping_interval.min(60);
        self.webhook_url = self.webhook_url.trim().to_string();
        self
    }

    /// Apply a partial JSON object on top of these settings. Unknown keys are
    /// ignored; a mistyped known key rejects the whole patch.
    pub fn merge_json(&self, patch: &serde_json::Value) -> Result<Settings, super::SettingsError> {
        let patch = patch.as_object().ok_or(super::SettingsError::NotAnObject)?;

        let mut merged = serde_json::to_value(self)?;
        if let Some(current) = merged.as_object_mut() {
            for (key, value) in patch {
                if current.contains_key(key) {
                    current.insert(key.clone(), value.clone());
                }
            }
        }

        let settings: Settings = serde_json::from_value(merged)?;
        Ok(settings.normalized())
    }

    pub fn webhook_url(&self) -> Option<&str> {
        let url = self.webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub settings: Settings,
    pub persisted: Option<bool>,
}
