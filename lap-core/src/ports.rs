//! Collaborators the engine drives but does not own the implementation of.
//!
//! The host supplies these at construction: a tick source, a speech output,
//! and persistence. Every call is a one-way notification; errors come back
//! only so they can be logged.

use std::time::Duration;

use crate::config::LapTimerConfig;
use crate::error::CollaboratorError;

/// Handle for an active tick subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickSubscription(pub u64);

/// Emits ticks at a fixed cadence until cancelled.
///
/// Ticks are delivered back to the engine by the host (`LapTimerEngine::on_tick`);
/// the clock only starts and stops the stream. At most one tick may be in
/// flight at a time.
pub trait Clock: Send {
    fn subscribe(&mut self, interval: Duration) -> Result<TickSubscription, CollaboratorError>;

    fn cancel(&mut self, subscription: TickSubscription) -> Result<(), CollaboratorError>;
}

/// Speech output. Both calls interrupt whatever is currently being spoken.
pub trait Announcer: Send {
    fn speak_number(&mut self, n: i64) -> Result<(), CollaboratorError>;

    fn speak_message(&mut self, text: &str) -> Result<(), CollaboratorError>;
}

pub trait ConfigStore {
    fn load(&self) -> Result<LapTimerConfig, CollaboratorError>;

    fn save(&self, config: &LapTimerConfig) -> Result<(), CollaboratorError>;
}

/// One finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    pub total_time_seconds: u32,
    pub lap_distance: u32,
    pub lap_duration_seconds: u32,
    pub completed_laps: u32,
}

pub trait HistoryStore: Send {
    fn append(&mut self, record: HistoryRecord) -> Result<(), CollaboratorError>;
}

/// Clock for hosts that call `on_tick` themselves, such as tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    next_id: u64,
}

impl Clock for ManualClock {
    fn subscribe(&mut self, _interval: Duration) -> Result<TickSubscription, CollaboratorError> {
        self.next_id += 1;
        Ok(TickSubscription(self.next_id))
    }

    fn cancel(&mut self, _subscription: TickSubscription) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Announcer that discards everything.
#[derive(Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn speak_number(&mut self, _n: i64) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn speak_message(&mut self, _text: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// History store that keeps nothing.
#[derive(Debug, Default)]
pub struct NoHistory;

impl HistoryStore for NoHistory {
    fn append(&mut self, _record: HistoryRecord) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
