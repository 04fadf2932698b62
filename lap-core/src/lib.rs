//! Lap-timer state machine with no platform dependencies.
//! Testable on host; the app injects the clock, speech and storage.

pub mod config;
pub mod engine;
pub mod error;
pub mod ports;
pub mod speech;

pub use config::{LapTimerConfig, MAX_TOTAL_DISTANCE};
pub use engine::{LapMode, LapTimerEngine, LapTimerSnapshot, Phase, TICK_INTERVAL};
pub use error::{CollaboratorError, ConfigError, EngineError, InvalidCommand};
pub use ports::{
    Announcer, Clock, ConfigStore, HistoryRecord, HistoryStore, ManualClock, NoHistory,
    SilentAnnouncer, TickSubscription,
};
pub use speech::{Announcement, Language};

/// Format seconds as "MM:SS"
pub fn format_mmss(secs: u32) -> String {
    let m = secs / 60;
    let s = secs % 60;
    format!("{:02}:{:02}", m, s)
}

/// Format seconds as "HH:MM:SS"
pub fn format_hms(secs: u32) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Format a signed bank balance as "+M:SS" / "-M:SS"
pub fn format_signed(secs: i64) -> String {
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("{}{}:{:02}", sign, abs / 60, abs % 60)
}
