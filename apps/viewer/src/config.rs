use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::theme::ThemeMode;

pub const DEFAULT_CONFIG_FILE: &str = "viewer.toml";
const APP_DIR_NAME: &str = "uniroutine";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub fixture_path: PathBuf,
    pub theme_file: Option<PathBuf>,
    /// Used when the terminal does not report its background.
    pub system_theme: ThemeMode,
    pub log_filter: String,
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fixture_path: PathBuf::from("data/routines.json"),
            theme_file: dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("theme")),
            system_theme: ThemeMode::Light,
            log_filter: "info".into(),
            color: true,
        }
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("config: ignoring malformed settings file");
        return;
    };

    if let Some(v) = file_cfg.get("fixture_path") {
        settings.fixture_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("theme_file") {
        settings.theme_file = theme_file_setting(v);
    }
    if let Some(mode) = file_cfg.get("system_theme").and_then(|v| v.parse().ok()) {
        settings.system_theme = mode;
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    if let Some(color) = file_cfg.get("color").and_then(|v| parse_flag(v)) {
        settings.color = color;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROUTINE_FIXTURE") {
        settings.fixture_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__FIXTURE_PATH") {
        settings.fixture_path = PathBuf::from(v);
    }

    if let Some(v) = lookup("APP__THEME_FILE") {
        settings.theme_file = theme_file_setting(&v);
    }

    if let Some(mode) = lookup("APP__SYSTEM_THEME").and_then(|v| v.parse().ok()) {
        settings.system_theme = mode;
    }

    if let Some(v) = lookup("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if lookup("NO_COLOR").is_some() {
        settings.color = false;
    }
    if let Some(color) = lookup("APP__COLOR").and_then(|v| parse_flag(&v)) {
        settings.color = color;
    }
}

/// An empty value disables theme persistence.
fn theme_file_setting(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
