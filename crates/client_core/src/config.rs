use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use shared::protocol::MATCH_PATH;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";
pub const SETTINGS_FILE: &str = "skillmatch.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: String,
    pub match_path: String,
    pub progress_simulation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            match_path: MATCH_PATH.into(),
            progress_simulation: true,
        }
    }
}

impl Settings {
    /// Absolute URL of the match endpoint.
    pub fn endpoint_url(&self) -> anyhow::Result<Url> {
        let mut base = Url::parse(self.service_url.trim())
            .with_context(|| format!("invalid matching service url '{}'", self.service_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!(
                "matching service url '{}' must use http or https",
                self.service_url
            );
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(self.match_path.trim_start_matches('/'))
            .with_context(|| {
                format!(
                    "failed to join match path '{}' onto '{}'",
                    self.match_path, self.service_url
                )
            })
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Layers defaults, then the settings file, then the environment. Unreadable
/// files and unparseable values are skipped.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            if let Some(v) = file_cfg.get("service_url").and_then(toml::Value::as_str) {
                settings.service_url = v.to_string();
            }
            if let Some(v) = file_cfg.get("match_path").and_then(toml::Value::as_str) {
                settings.match_path = v.to_string();
            }
            match file_cfg.get("progress_simulation") {
                Some(toml::Value::Boolean(v)) => settings.progress_simulation = *v,
                Some(toml::Value::String(v)) => {
                    if let Some(parsed) = parse_flag(v) {
                        settings.progress_simulation = parsed;
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(v) = env("SKILLMATCH_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = env("APP__MATCH_PATH") {
        settings.match_path = v;
    }

    if let Some(v) = env("APP__PROGRESS_SIMULATION") {
        if let Some(parsed) = parse_flag(&v) {
            settings.progress_simulation = parsed;
        }
    }

    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
