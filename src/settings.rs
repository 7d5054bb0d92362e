use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::asr::DEFAULT_LOCALE;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslationSettings {
    /// Fixed output language; unset flips between Chinese and English.
    pub target_language: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub locale: String,
    pub segmentation: SegmentationConfig,
    pub translation: TranslationSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.into(),
            segmentation: SegmentationConfig::default(),
            translation: TranslationSettings::default(),
        }
    }
}

/// JSON-file backed settings. Missing files and missing keys fall back to
/// defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn segmentation(&self) -> SegmentationConfig {
        self.read().segmentation.clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn update_locale(&self, locale: impl Into<String>) -> Result<()> {
        let mut settings = self.get();
        settings.locale = locale.into();
        self.update(settings)
    }

    /// Write the current settings, creating the file if needed.
    pub fn save(&self) -> Result<()> {
        let guard = self.read();
        self.persist(&guard)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_settings(path: &Path) -> Result<AppSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get(), AppSettings::default());
        assert_eq!(store.segmentation().min_new_content_chars, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "locale": "zh-CN", "segmentation": { "maxSegmentDurationMs": 15000 } }"#,
        )
        .unwrap();

        let store = SettingsStore::new(&path).unwrap();
        let settings = store.get();
        assert_eq!(settings.locale, "zh-CN");
        assert_eq!(settings.segmentation.max_segment_duration_ms, 15_000);
        assert_eq!(settings.segmentation.min_segment_duration_ms, 5_000);
        assert_eq!(settings.translation.target_language, None);
    }

    #[test]
    fn updates_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(&path).unwrap();
        store.update_locale("ja-JP").unwrap();

        let reopened = SettingsStore::new(&path).unwrap();
        assert_eq!(reopened.get().locale, "ja-JP");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SettingsStore::new(&path).err().unwrap();
        assert!(err.to_string().contains("Failed to parse settings"));
    }
}
