//! Two-value appearance preference, persisted once the user picks one.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown theme '{0}', expected 'light' or 'dark'")]
pub struct UnknownTheme(String);

impl FromStr for ThemeMode {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// Terminal background from `COLORFGBG` ("fg;bg"); low ANSI backgrounds other
/// than white (7) are dark.
pub fn system_theme(colorfgbg: Option<&str>, fallback: ThemeMode) -> ThemeMode {
    let background = colorfgbg
        .and_then(|raw| raw.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok());
    match background {
        Some(0..=6) | Some(8) => ThemeMode::Dark,
        Some(_) => ThemeMode::Light,
        None => fallback,
    }
}

/// The stored choice wins; without one the system preference is followed.
pub fn initial_theme(stored: Option<ThemeMode>, system: ThemeMode) -> ThemeMode {
    stored.unwrap_or(system)
}

#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: Option<PathBuf>,
}

impl ThemeStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Missing or unrecognised content reads as "no stored choice".
    pub fn load(&self) -> Option<ThemeMode> {
        let path = self.path.as_ref()?;
        let raw = fs::read_to_string(path).ok()?;
        raw.parse().ok()
    }

    pub fn save(&self, mode: ThemeMode) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create theme directory '{}'", parent.display())
            })?;
        }
        fs::write(path, mode.as_str())
            .with_context(|| format!("failed to persist theme to '{}'", path.display()))
    }
}
