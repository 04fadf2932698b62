use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lap_core::{
    CollaboratorError, ConfigStore, HistoryRecord, HistoryStore, Language, LapTimerConfig,
};
use serde::{Deserialize, Serialize};

use crate::announcer::VoiceConfig;

const APP_DIR: &str = "lap-timer";
const SETTINGS_FILE: &str = "settings.toml";
const HISTORY_FILE: &str = "history.json";

/// Everything the app persists between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub total_minutes: u32,
    pub total_seconds: u32,
    pub total_distance: u32,
    pub lap_distance: u32,
    pub auto_lap: bool,
    /// BCP 47 code, e.g. "zh-CN" or "en-US".
    pub language: String,
    pub voice: VoiceConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let lap = LapTimerConfig::default();
        Self {
            total_minutes: lap.total_minutes(),
            total_seconds: lap.total_seconds(),
            total_distance: lap.total_distance(),
            lap_distance: lap.lap_distance(),
            auto_lap: false,
            language: Language::default().code().to_string(),
            voice: VoiceConfig::default(),
        }
    }
}

impl Settings {
    pub fn lap_config(&self) -> LapTimerConfig {
        LapTimerConfig::new(
            self.total_minutes,
            self.total_seconds,
            self.total_distance,
            self.lap_distance,
        )
    }

    pub fn set_lap_config(&mut self, config: &LapTimerConfig) {
        self.total_minutes = config.total_minutes();
        self.total_seconds = config.total_seconds();
        self.total_distance = config.total_distance();
        self.lap_distance = config.lap_distance();
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language).unwrap_or_default()
    }
}

/// A finished session as stored in the history file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: DateTime<Utc>,
    pub total_time_seconds: u32,
    pub lap_distance: u32,
    pub lap_duration_seconds: u32,
    pub completed_laps: u32,
}

impl HistoryEntry {
    fn now(record: HistoryRecord) -> Self {
        Self {
            recorded_at: Utc::now(),
            total_time_seconds: record.total_time_seconds,
            lap_distance: record.lap_distance,
            lap_duration_seconds: record.lap_duration_seconds,
            completed_laps: record.completed_laps,
        }
    }
}

/// Settings and history files under one data directory.
#[derive(Clone, Debug)]
pub struct TimerStorage {
    dir: PathBuf,
}

impl TimerStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CollaboratorError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn try_load_settings(&self) -> Result<Settings, CollaboratorError> {
        match fs::read_to_string(self.dir.join(SETTINGS_FILE)) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| CollaboratorError::Storage(format!("{}: {}", SETTINGS_FILE, e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored settings, or defaults if there are none or they are unreadable.
    pub fn load_settings(&self) -> Settings {
        self.try_load_settings().unwrap_or_else(|e| {
            log::error!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        })
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), CollaboratorError> {
        let text = toml::to_string_pretty(settings)
            .map_err(|e| CollaboratorError::Storage(format!("{}: {}", SETTINGS_FILE, e)))?;
        self.write_atomic(SETTINGS_FILE, text.as_bytes())
    }

    pub fn load_history(&self) -> Result<Vec<HistoryEntry>, CollaboratorError> {
        match fs::read(self.dir.join(HISTORY_FILE)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CollaboratorError::Storage(format!("{}: {}", HISTORY_FILE, e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn append_history(&self, record: HistoryRecord) -> Result<(), CollaboratorError> {
        let mut history = self.load_history()?;
        history.push(HistoryEntry::now(record));
        self.save_history(&history)
    }

    pub fn clear_history(&self) -> Result<(), CollaboratorError> {
        self.save_history(&[])
    }

    fn save_history(&self, history: &[HistoryEntry]) -> Result<(), CollaboratorError> {
        let bytes = serde_json::to_vec_pretty(history)
            .map_err(|e| CollaboratorError::Storage(format!("{}: {}", HISTORY_FILE, e)))?;
        self.write_atomic(HISTORY_FILE, &bytes)
    }

    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<(), CollaboratorError> {
        let tmp = self.dir.join(format!("{}.tmp", name));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }
}

impl ConfigStore for TimerStorage {
    fn load(&self) -> Result<LapTimerConfig, CollaboratorError> {
        Ok(self.try_load_settings()?.lap_config())
    }

    fn save(&self, config: &LapTimerConfig) -> Result<(), CollaboratorError> {
        let mut settings = self.load_settings();
        settings.set_lap_config(config);
        self.save_settings(&settings)
    }
}

impl HistoryStore for TimerStorage {
    fn append(&mut self, record: HistoryRecord) -> Result<(), CollaboratorError> {
        self.append_history(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, TimerStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = TimerStorage::new(dir.path().join("data")).unwrap();
        (dir, storage)
    }

    fn record(laps: u32) -> HistoryRecord {
        HistoryRecord {
            total_time_seconds: 265,
            lap_distance: 200,
            lap_duration_seconds: 53,
            completed_laps: laps,
        }
    }

    #[test]
    fn test_missing_settings_are_defaults() {
        let (_dir, storage) = storage();
        assert_eq!(storage.try_load_settings().unwrap(), Settings::default());
        assert_eq!(storage.load().unwrap(), LapTimerConfig::default());
    }

    #[test]
    fn test_settings_round_trip() {
        let (_dir, storage) = storage();
        let mut settings = Settings::default();
        settings.auto_lap = true;
        settings.language = "en-US".into();
        settings.voice.command = Some("espeak-ng -s {wpm}".into());
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings(), settings);
        assert_eq!(storage.load_settings().language(), Language::English);
    }

    #[test]
    fn test_config_store_keeps_other_settings() {
        let (_dir, storage) = storage();
        let mut settings = Settings::default();
        settings.auto_lap = true;
        storage.save_settings(&settings).unwrap();

        storage.save(&LapTimerConfig::new(10, 0, 3000, 400)).unwrap();
        let loaded = storage.load_settings();
        assert!(loaded.auto_lap);
        assert_eq!(loaded.lap_config().total_laps(), 8);
        assert_eq!(storage.load().unwrap().lap_duration_seconds(), 75);
    }

    #[test]
    fn test_partial_settings_file_fills_defaults() {
        let (_dir, storage) = storage();
        fs::write(storage.dir().join(SETTINGS_FILE), "lap_distance = 400\n").unwrap();
        let settings = storage.load_settings();
        assert_eq!(settings.lap_distance, 400);
        assert_eq!(settings.total_distance, 1000);
        assert!(settings.voice.enabled);
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let (_dir, storage) = storage();
        fs::write(storage.dir().join(SETTINGS_FILE), "not = [valid").unwrap();
        assert!(storage.try_load_settings().is_err());
        assert_eq!(storage.load_settings(), Settings::default());
    }

    #[test]
    fn test_history_append_and_clear() {
        let (_dir, mut storage) = storage();
        assert!(storage.load_history().unwrap().is_empty());

        storage.append(record(5)).unwrap();
        storage.append(record(3)).unwrap();
        let history = storage.load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].completed_laps, 5);
        assert_eq!(history[1].completed_laps, 3);
        assert!(history[0].recorded_at <= history[1].recorded_at);

        storage.clear_history().unwrap();
        assert!(storage.load_history().unwrap().is_empty());
    }
}
