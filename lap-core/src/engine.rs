use std::time::Duration;

use crate::config::LapTimerConfig;
use crate::error::{EngineError, InvalidCommand};
use crate::ports::{
    Announcer, Clock, HistoryRecord, HistoryStore, ManualClock, NoHistory, SilentAnnouncer,
    TickSubscription,
};
use crate::speech::{Announcement, Language};

/// Cadence the engine asks its clock for.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Overtime seconds after which auto-lap banks the lap on its own.
pub const AUTO_LAP_OVERTIME_SECONDS: u32 = 3;

/// How the current lap is being timed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LapMode {
    /// Counting the lap budget down.
    Countdown,
    /// The budget ran out; counting seconds of overrun.
    Overtime { seconds: u32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    /// A session is in progress. `ticking` is false while paused.
    Running {
        ticking: bool,
        mode: LapMode,
        extra_time: bool,
    },
    /// Terminal until reset.
    Completed { extra_time: bool },
}

/// Read-only copy of everything a display needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LapTimerSnapshot {
    pub phase: Phase,
    pub is_running: bool,
    pub remaining_total_seconds: u32,
    pub current_lap_index: u32,
    pub total_laps: u32,
    pub current_lap_remaining_seconds: i64,
    pub is_counting_up: bool,
    pub count_up_seconds: u32,
    pub banked_time_seconds: i64,
    pub per_lap_banked_seconds: Vec<i64>,
    pub is_in_extra_time: bool,
    pub is_auto_lap_enabled: bool,
}

/// The lap-timer state machine.
///
/// Commands and ticks mutate the same state and must reach the engine one
/// at a time; the host serializes them (see `lap-timer`'s message loop).
pub struct LapTimerEngine {
    config: LapTimerConfig,
    auto_lap: bool,
    language: Language,

    phase: Phase,
    remaining_total_seconds: u32,
    current_lap_index: u32,
    current_lap_remaining_seconds: i64,
    banked_time_seconds: i64,
    per_lap_banked_seconds: Vec<i64>,

    subscription: Option<TickSubscription>,
    suspended_by_host: bool,
    // One utterance per tick or command; later messages replace earlier ones.
    pending: Option<Announcement>,

    clock: Box<dyn Clock>,
    announcer: Box<dyn Announcer>,
    history: Box<dyn HistoryStore>,
}

impl LapTimerEngine {
    /// Creates an idle engine with a manual clock, no speech and no history.
    pub fn new(config: LapTimerConfig) -> Self {
        Self {
            config,
            auto_lap: false,
            language: Language::default(),
            phase: Phase::Idle,
            remaining_total_seconds: config.total_duration_seconds(),
            current_lap_index: 0,
            current_lap_remaining_seconds: i64::from(config.lap_duration_seconds()),
            banked_time_seconds: 0,
            per_lap_banked_seconds: Vec::new(),
            subscription: None,
            suspended_by_host: false,
            pending: None,
            clock: Box::new(ManualClock::default()),
            announcer: Box::new(SilentAnnouncer),
            history: Box::new(NoHistory),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_announcer(mut self, announcer: impl Announcer + 'static) -> Self {
        self.announcer = Box::new(announcer);
        self
    }

    pub fn with_history(mut self, history: impl HistoryStore + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_auto_lap(mut self, enabled: bool) -> Self {
        self.auto_lap = enabled;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    // ---- commands ----

    /// Starts a session from idle, or resumes a paused one.
    ///
    /// Already ticking is a no-op. A completed session must be reset first.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.phase {
            Phase::Running { ticking: true, .. } => Ok(()),
            Phase::Completed { .. } => Err(InvalidCommand::AlreadyCompleted.into()),
            Phase::Running {
                ticking: false,
                mode,
                extra_time,
            } => {
                self.subscribe()?;
                self.phase = Phase::Running {
                    ticking: true,
                    mode,
                    extra_time,
                };
                self.suspended_by_host = false;
                log::info!(
                    "resumed on lap {} with {}s left",
                    self.current_lap_index + 1,
                    self.current_lap_remaining_seconds
                );
                Ok(())
            }
            Phase::Idle => {
                self.config.check_runnable()?;
                self.subscribe()?;
                self.remaining_total_seconds = self.config.total_duration_seconds();
                self.current_lap_remaining_seconds = i64::from(self.config.lap_duration_seconds());
                self.phase = Phase::Running {
                    ticking: true,
                    mode: LapMode::Countdown,
                    extra_time: false,
                };
                self.suspended_by_host = false;
                log::info!(
                    "started: {} laps of {}s",
                    self.config.total_laps(),
                    self.config.lap_duration_seconds()
                );
                Ok(())
            }
        }
    }

    /// Stops ticking without touching any counter. Idempotent.
    pub fn pause(&mut self) {
        if let Phase::Running {
            ticking: true,
            mode,
            extra_time,
        } = self.phase
        {
            self.unsubscribe();
            self.phase = Phase::Running {
                ticking: false,
                mode,
                extra_time,
            };
            log::debug!("paused");
        }
    }

    /// Returns to idle with all counters zeroed against the current config.
    pub fn reset(&mut self) {
        self.unsubscribe();
        self.phase = Phase::Idle;
        self.remaining_total_seconds = self.config.total_duration_seconds();
        self.current_lap_remaining_seconds = i64::from(self.config.lap_duration_seconds());
        self.current_lap_index = 0;
        self.banked_time_seconds = 0;
        self.per_lap_banked_seconds.clear();
        self.suspended_by_host = false;
        self.pending = None;
    }

    /// Banks what is left of the current lap (or the overtime owed) and moves on.
    pub fn complete_lap(&mut self) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(InvalidCommand::NotRunning.into());
        }
        self.bank_lap();
        self.flush_announcement();
        Ok(())
    }

    /// Clears the bank and the extra-time and overtime flags. Phase, lap and
    /// countdown are left alone.
    pub fn reset_banked_time(&mut self) {
        self.banked_time_seconds = 0;
        self.per_lap_banked_seconds.clear();
        self.phase = match self.phase {
            Phase::Running { ticking, .. } => Phase::Running {
                ticking,
                mode: LapMode::Countdown,
                extra_time: false,
            },
            Phase::Completed { .. } => Phase::Completed { extra_time: false },
            Phase::Idle => Phase::Idle,
        };
    }

    /// The host is going away (backgrounded, audio interrupted).
    pub fn on_suspend(&mut self) {
        if self.is_running() {
            self.pause();
            self.suspended_by_host = true;
        }
    }

    /// The host is back. Only a pause caused by `on_suspend` is undone.
    pub fn on_resume(&mut self) {
        if !self.suspended_by_host {
            return;
        }
        // start() clears the flag; on failure the next resume tries again.
        if let Err(e) = self.start() {
            log::warn!("could not resume after suspend: {}", e);
        }
    }

    /// Replaces the configuration. Refused while a session is in progress.
    pub fn update_config(&mut self, config: LapTimerConfig) -> Result<(), EngineError> {
        if matches!(self.phase, Phase::Running { .. }) {
            return Err(InvalidCommand::ConfigLocked.into());
        }
        self.config = config;
        let last_lap = config.total_laps().saturating_sub(1);
        if self.current_lap_index > last_lap {
            self.current_lap_index = last_lap;
        }
        if self.phase == Phase::Idle {
            self.remaining_total_seconds = config.total_duration_seconds();
            self.current_lap_remaining_seconds = i64::from(config.lap_duration_seconds());
        }
        Ok(())
    }

    pub fn set_auto_lap(&mut self, enabled: bool) {
        self.auto_lap = enabled;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    // ---- tick ----

    /// Advances the session by one second. Ignored unless ticking.
    pub fn on_tick(&mut self) {
        let Phase::Running { ticking: true, .. } = self.phase else {
            log::debug!("tick ignored in {:?}", self.phase);
            return;
        };

        if self.remaining_total_seconds > 0 {
            self.remaining_total_seconds -= 1;
        }

        match self.lap_mode() {
            LapMode::Overtime { seconds } => {
                let seconds = seconds + 1;
                self.set_lap_mode(LapMode::Overtime { seconds });
                if self.auto_lap && seconds >= AUTO_LAP_OVERTIME_SECONDS {
                    self.bank_lap();
                }
            }
            LapMode::Countdown => {
                self.queue(Announcement::Remaining(self.current_lap_remaining_seconds));
                self.current_lap_remaining_seconds -= 1;
                if self.current_lap_remaining_seconds <= 0 {
                    self.lap_budget_exhausted();
                }
            }
        }

        if self.is_in_extra_time()
            && self.current_lap_remaining_seconds <= 0
            && matches!(self.phase, Phase::Running { .. })
        {
            self.finish();
            self.queue(Announcement::ExtraTimeExhausted);
        }

        self.flush_announcement();
    }

    fn lap_budget_exhausted(&mut self) {
        if self.should_enter_extra_time() {
            self.current_lap_remaining_seconds = self.banked_time_seconds;
            if let Phase::Running { ticking, mode, .. } = self.phase {
                self.phase = Phase::Running {
                    ticking,
                    mode,
                    extra_time: true,
                };
            }
            log::info!("extra time: {}s", self.banked_time_seconds);
            self.queue(Announcement::ExtraTimeGranted(self.banked_time_seconds));
        } else if self.auto_lap {
            self.bank_lap();
            self.queue(Announcement::AutoAdvance);
        } else {
            self.set_lap_mode(LapMode::Overtime { seconds: 0 });
            self.queue(Announcement::TimeUp);
        }
    }

    fn should_enter_extra_time(&self) -> bool {
        !self.is_in_extra_time()
            && self.current_lap_index + 1 == self.config.total_laps()
            && self.banked_time_seconds > 0
    }

    fn bank_lap(&mut self) {
        let saved = match self.lap_mode() {
            LapMode::Overtime { seconds } => {
                self.set_lap_mode(LapMode::Countdown);
                -i64::from(seconds)
            }
            LapMode::Countdown => self.current_lap_remaining_seconds,
        };
        self.banked_time_seconds += saved;
        self.per_lap_banked_seconds.push(saved);
        self.current_lap_remaining_seconds = i64::from(self.config.lap_duration_seconds());
        log::debug!(
            "lap {} banked {:+}s (total {:+}s)",
            self.current_lap_index + 1,
            saved,
            self.banked_time_seconds
        );

        if self.current_lap_index + 1 < self.config.total_laps() {
            self.current_lap_index += 1;
        } else {
            self.finish();
            self.queue(Announcement::Completed {
                banked: self.banked_time_seconds,
            });
        }
    }

    fn finish(&mut self) {
        self.unsubscribe();
        let extra_time = self.is_in_extra_time();
        self.phase = Phase::Completed { extra_time };
        log::info!(
            "session complete after {} laps, bank {:+}s",
            self.current_lap_index + 1,
            self.banked_time_seconds
        );
        let record = HistoryRecord {
            total_time_seconds: self.config.total_duration_seconds(),
            lap_distance: self.config.lap_distance(),
            lap_duration_seconds: self.config.lap_duration_seconds(),
            completed_laps: self.current_lap_index + 1,
        };
        if let Err(e) = self.history.append(record) {
            log::warn!("failed to record session history: {}", e);
        }
    }

    // ---- collaborators ----

    /// A session only ticks with a live subscription, so this failure is the
    /// caller's to handle.
    fn subscribe(&mut self) -> Result<(), EngineError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let sub = self.clock.subscribe(TICK_INTERVAL).map_err(|e| {
            log::warn!("clock subscription failed: {}", e);
            EngineError::ClockUnavailable(e.to_string())
        })?;
        self.subscription = Some(sub);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(sub) = self.subscription.take() {
            if let Err(e) = self.clock.cancel(sub) {
                log::warn!("clock cancel failed: {}", e);
            }
        }
    }

    fn queue(&mut self, announcement: Announcement) {
        match self.pending {
            Some(current) if current.is_completion() && !announcement.is_completion() => {}
            _ => self.pending = Some(announcement),
        }
    }

    fn flush_announcement(&mut self) {
        let Some(announcement) = self.pending.take() else {
            return;
        };
        let result = match announcement {
            Announcement::Remaining(n) => self.announcer.speak_number(n),
            other => match other.message(self.language) {
                Some(text) => self.announcer.speak_message(&text),
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            log::warn!("announcement failed: {}", e);
        }
    }

    fn lap_mode(&self) -> LapMode {
        match self.phase {
            Phase::Running { mode, .. } => mode,
            _ => LapMode::Countdown,
        }
    }

    fn set_lap_mode(&mut self, new_mode: LapMode) {
        if let Phase::Running { ticking, extra_time, .. } = self.phase {
            self.phase = Phase::Running {
                ticking,
                mode: new_mode,
                extra_time,
            };
        }
    }

    // ---- observers ----

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { ticking: true, .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, Phase::Completed { .. })
    }

    pub fn config(&self) -> &LapTimerConfig {
        &self.config
    }

    pub fn auto_lap(&self) -> bool {
        self.auto_lap
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Subscription ticks must carry to be accepted by the host.
    pub fn subscription(&self) -> Option<TickSubscription> {
        self.subscription
    }

    pub fn remaining_total_seconds(&self) -> u32 {
        self.remaining_total_seconds
    }

    pub fn current_lap_index(&self) -> u32 {
        self.current_lap_index
    }

    pub fn total_laps(&self) -> u32 {
        self.config.total_laps()
    }

    pub fn current_lap_remaining_seconds(&self) -> i64 {
        self.current_lap_remaining_seconds
    }

    pub fn is_counting_up(&self) -> bool {
        matches!(self.lap_mode(), LapMode::Overtime { .. })
    }

    pub fn count_up_seconds(&self) -> u32 {
        match self.lap_mode() {
            LapMode::Overtime { seconds } => seconds,
            LapMode::Countdown => 0,
        }
    }

    pub fn banked_time_seconds(&self) -> i64 {
        self.banked_time_seconds
    }

    pub fn per_lap_banked_seconds(&self) -> &[i64] {
        &self.per_lap_banked_seconds
    }

    pub fn is_in_extra_time(&self) -> bool {
        matches!(
            self.phase,
            Phase::Running { extra_time: true, .. } | Phase::Completed { extra_time: true }
        )
    }

    pub fn snapshot(&self) -> LapTimerSnapshot {
        LapTimerSnapshot {
            phase: self.phase,
            is_running: self.is_running(),
            remaining_total_seconds: self.remaining_total_seconds,
            current_lap_index: self.current_lap_index,
            total_laps: self.total_laps(),
            current_lap_remaining_seconds: self.current_lap_remaining_seconds,
            is_counting_up: self.is_counting_up(),
            count_up_seconds: self.count_up_seconds(),
            banked_time_seconds: self.banked_time_seconds,
            per_lap_banked_seconds: self.per_lap_banked_seconds.clone(),
            is_in_extra_time: self.is_in_extra_time(),
            is_auto_lap_enabled: self.auto_lap,
        }
    }
}
