//! Error types for the lap timer.

/// A configuration that cannot drive a run.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The lap budget works out to zero seconds.
    #[error("lap duration is zero; set a total time of at least one second per lap")]
    ZeroLapDuration,

    /// The distances produce no laps at all.
    #[error("configuration has no laps")]
    NoLaps,

    /// Lap distance must be positive and not longer than the total distance.
    #[error("lap distance {lap} must be between 1 and the total distance {total}")]
    LapDistanceOutOfRange { lap: u32, total: u32 },

    /// Total distance is zero or above the supported maximum.
    #[error("total distance {0} must be between 1 and {max}", max = crate::config::MAX_TOTAL_DISTANCE)]
    TotalDistanceOutOfRange(u32),

    /// Seconds component of the total time must be below 60.
    #[error("seconds must be below 60, got {0}")]
    SecondsOutOfRange(u32),
}

/// A command that the engine refused in its current phase.
///
/// Refusing leaves the engine state untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCommand {
    #[error("the timer is not running")]
    NotRunning,

    #[error("the session is complete; reset before starting again")]
    AlreadyCompleted,

    #[error("the configuration cannot change while a session is in progress")]
    ConfigLocked,
}

/// Errors returned by engine commands.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] InvalidCommand),

    /// The clock refused a tick subscription; the session did not start.
    #[error("clock unavailable: {0}")]
    ClockUnavailable(String),
}

/// Failure reported by an injected collaborator.
///
/// The engine logs these and carries on; they never reach its counters.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("speech failed: {0}")]
    Speech(String),

    #[error("storage failed: {0}")]
    Storage(String),

    #[error("clock failed: {0}")]
    Clock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
