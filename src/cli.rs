use std::path::PathBuf;

use clap::{ArgAction, Parser};
use lap_core::{ConfigError, Language};

use crate::storage::Settings;

/// Lap countdown timer that speaks the seconds left in each lap.
#[derive(Debug, Parser)]
#[command(name = "lap-timer", version, about)]
pub struct Cli {
    /// Total time, minutes part
    #[arg(long)]
    pub minutes: Option<u32>,

    /// Total time, seconds part (0-59)
    #[arg(long)]
    pub seconds: Option<u32>,

    /// Total distance
    #[arg(long)]
    pub distance: Option<u32>,

    /// Distance of one lap
    #[arg(long)]
    pub lap: Option<u32>,

    /// Advance laps automatically when the lap time runs out
    #[arg(long, action = ArgAction::Set)]
    pub auto_lap: Option<bool>,

    /// Announcement language (zh-CN, en-US)
    #[arg(long)]
    pub language: Option<String>,

    /// Speech command, e.g. "espeak-ng -s {wpm} -v {lang}"
    #[arg(long, env = "LAP_TIMER_SPEAK_WITH")]
    pub speak_with: Option<String>,

    /// Do not announce anything
    #[arg(long)]
    pub quiet: bool,

    /// Directory for settings and history
    #[arg(long, env = "LAP_TIMER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print recorded sessions and exit
    #[arg(long)]
    pub history: bool,

    /// Delete recorded sessions
    #[arg(long)]
    pub clear_history: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown language '{0}', expected zh-CN or en-US")]
    UnknownLanguage(String),
}

impl Cli {
    /// Applies overrides to the stored settings. Returns whether anything changed.
    pub fn apply_to(&self, settings: &mut Settings) -> Result<bool, CliError> {
        let before = settings.clone();

        let mut lap = settings.lap_config();
        lap.set_total_time(
            self.minutes.unwrap_or(lap.total_minutes()),
            self.seconds.unwrap_or(lap.total_seconds()),
        );
        if let Some(distance) = self.distance {
            lap.set_total_distance(distance);
        }
        if let Some(distance) = self.lap {
            lap.set_lap_distance(distance);
        }
        lap.validate()?;
        settings.set_lap_config(&lap);

        if let Some(enabled) = self.auto_lap {
            settings.auto_lap = enabled;
        }
        if let Some(code) = &self.language {
            let language = Language::from_code(code)
                .ok_or_else(|| CliError::UnknownLanguage(code.clone()))?;
            settings.language = language.code().to_string();
        }
        if let Some(command) = &self.speak_with {
            settings.voice.command = Some(command.clone());
        }

        Ok(*settings != before)
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
