use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use shared::protocol::{DEFAULT_SERVICE_URL, EXPORT_FILE_NAME, UPLOAD_PATH};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "translator.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub service_url: String,
    pub upload_path: String,
    pub export_dir: Option<PathBuf>,
    pub export_file_name: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            upload_path: UPLOAD_PATH.into(),
            export_dir: None,
            export_file_name: EXPORT_FILE_NAME.into(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::ServiceUrl {
            url: self.service_url.clone(),
            reason,
        };

        let base = Url::parse(self.service_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }

        base.join(&self.upload_path)
            .map_err(|err| invalid(err.to_string()))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Directory exports land in: configured value, then the user's download
    /// directory, then the working directory.
    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Loads settings from `path` (or `translator.toml` in the working directory
/// when absent) and then applies environment overrides.
///
/// A missing default file is not an error; a missing explicit file is.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, ConfigError> {
    let settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_settings_file(default_path)?
            } else {
                ClientSettings::default()
            }
        }
    };

    Ok(apply_env_overrides(settings, |name| std::env::var(name).ok()))
}

fn read_settings_file(path: &Path) -> Result<ClientSettings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<ClientSettings>(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn apply_env_overrides(
    mut settings: ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let read = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(*name))
            .filter(|value| !value.trim().is_empty())
            .last()
    };

    if let Some(v) = read(&["TRANSLATOR_SERVICE_URL", "APP__SERVICE_URL"]) {
        settings.service_url = v;
    }
    if let Some(v) = read(&["TRANSLATOR_UPLOAD_PATH", "APP__UPLOAD_PATH"]) {
        settings.upload_path = v;
    }
    if let Some(v) = read(&["TRANSLATOR_EXPORT_DIR", "APP__EXPORT_DIR"]) {
        settings.export_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = read(&["TRANSLATOR_EXPORT_FILE_NAME", "APP__EXPORT_FILE_NAME"]) {
        settings.export_file_name = v;
    }
    if let Some(v) = read(&["TRANSLATOR_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"]) {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
