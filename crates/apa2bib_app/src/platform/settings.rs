use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use apa2bib_engine::{
    BackoffPolicy, ClientSettings, ConverterSettings, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use engine_logging::{engine_info, redact};
use serde::Deserialize;
use thiserror::Error;

const SETTINGS_DIR: &str = "apa2bib";
const SETTINGS_FILENAME: &str = "settings.ron";
pub(crate) const API_KEY_ENV: &str = "APA2BIB_API_KEY";

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum BackoffKind {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    pub backoff: BackoffKind,
    pub backoff_step_ms: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub prompt_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let converter = ConverterSettings::default();
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: converter.max_attempts,
            attempt_timeout_ms: 30_000,
            backoff: BackoffKind::Linear,
            backoff_step_ms: 1000,
            max_output_tokens: converter.max_output_tokens,
            temperature: converter.temperature,
            prompt_path: None,
        }
    }
}

impl Settings {
    /// Applies environment and command-line overrides.
    pub fn with_overrides(
        mut self,
        lookup_env: impl Fn(&str) -> Option<String>,
        model: Option<String>,
    ) -> Self {
        if let Some(key) = lookup_env(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = model {
            self.model = model;
        }
        self
    }

    pub fn converter_settings(&self) -> ConverterSettings {
        let step = Duration::from_millis(self.backoff_step_ms);
        ConverterSettings {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            backoff: match self.backoff {
                BackoffKind::Linear => BackoffPolicy::Linear { step },
                BackoffKind::Exponential => BackoffPolicy::Exponential { base: step },
            },
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            ..ClientSettings::default()
        }
    }
}

pub(crate) fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILENAME))
}

/// Reads settings from `path`. A missing file yields the defaults.
pub(crate) fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_info!("No settings at {:?}; using defaults", path);
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings: Settings = ron::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    engine_info!(
        "Loaded settings from {:?} (model={}, api_key={})",
        path,
        settings.model,
        settings
            .api_key
            .as_deref()
            .map(redact)
            .unwrap_or_else(|| "<none>".to_string())
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use apa2bib_engine::BackoffPolicy;
    use tempfile::TempDir;

    use super::{load_settings, BackoffKind, Settings, API_KEY_ENV};

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings(&temp.path().join("settings.ron")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.converter_settings().max_attempts, 3);
        assert_eq!(
            settings.converter_settings().attempt_timeout,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.ron");
        fs::write(
            &path,
            r#"(api_key: Some("abc123"), backoff: Exponential, backoff_step_ms: 500)"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("abc123"));
        assert_eq!(settings.backoff, BackoffKind::Exponential);
        assert_eq!(settings.model, Settings::default().model);
        assert_eq!(
            settings.converter_settings().backoff,
            BackoffPolicy::Exponential {
                base: Duration::from_millis(500)
            }
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.ron");
        fs::write(&path, "(api_key: ").unwrap();

        assert!(load_settings(&path).is_err());
    }

    #[test]
    fn environment_and_flag_override_file() {
        let settings = Settings {
            api_key: Some("from-file".to_string()),
            ..Settings::default()
        }
        .with_overrides(
            |name| (name == API_KEY_ENV).then(|| "from-env".to_string()),
            Some("gemini-1.5-pro".to_string()),
        );

        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.model, "gemini-1.5-pro");
    }

    #[test]
    fn blank_environment_key_is_ignored() {
        let settings = Settings {
            api_key: Some("from-file".to_string()),
            ..Settings::default()
        }
        .with_overrides(|_| Some("  ".to_string()), None);

        assert_eq!(settings.api_key.as_deref(), Some("from-file"));
    }
}
