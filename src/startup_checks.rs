use crate::Config;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create storage root: {0}")]
    StorageRootCreationFailed(#[from] std::io::Error),

    #[error("Storage root is not writable: {0}")]
    StorageRootNotWritable(String),

    #[error("Default section name is not a valid directory name: {0:?}")]
    InvalidDefaultSection(String),

    #[error("Settings file is unreadable, defaults will be used: {0}")]
    SettingsFileInvalid(String),
}

impl StartupCheckError {
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::SettingsFileInvalid(_))
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let root = &config.storage.root;
    if !root.exists() {
        info!("Storage root does not exist, creating: {:?}", root);
        if let Err(e) = tokio::fs::create_dir_all(root).await {
            error!("Failed to create storage root: {}", e);
            errors.push(StartupCheckError::StorageRootCreationFailed(e));
        }
    } else {
        info!("Storage root exists: {:?}", root);
    }

    if root.exists() {
        let probe = root.join("_startup_probe.tmp");
        match tokio::fs::write(&probe, b"ok").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                info!("Storage root is writable");
            }
            Err(e) => {
                error!("Storage root is not writable: {}", e);
                errors.push(StartupCheckError::StorageRootNotWritable(e.to_string()));
            }
        }
    }

    if !crate::gallery::is_valid_section_name(&config.storage.default_section) {
        error!(
            "Default section {:?} would be altered by sanitizing",
            config.storage.default_section
        );
        errors.push(StartupCheckError::InvalidDefaultSection(
            config.storage.default_section.clone(),
        ));
    }

    let settings_path = config.storage.settings_path();
    if settings_path.exists() {
        match tokio::fs::read_to_string(&settings_path).await {
            Ok(json) => {
                if let Err(e) = serde_json::from_str::<crate::settings::Settings>(&json) {
                    warn!("Settings file {:?} does not parse: {}", settings_path, e);
                    errors.push(StartupCheckError::SettingsFileInvalid(e.to_string()));
                }
            }
            Err(e) => {
                warn!("Settings file {:?} is unreadable: {}", settings_path, e);
                errors.push(StartupCheckError::SettingsFileInvalid(e.to_string()));
            }
        }
    } else {
        info!("No settings file at {:?}, defaults apply", settings_path);
    }

    let defaults = crate::AppConfig::default();
    if config.app.session_secret == defaults.session_secret {
        warn!("Session secret is the built-in default; set app.session_secret");
    }
    if config.app.shared_password == defaults.shared_password {
        warn!("Shared password is the built-in default; set app.shared_password");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
