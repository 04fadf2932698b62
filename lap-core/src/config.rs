use crate::error::ConfigError;

/// Upper bound on the total distance of a session, in distance units.
pub const MAX_TOTAL_DISTANCE: u32 = 100_000;

const DEFAULT_MINUTES: u32 = 4;
const DEFAULT_SECONDS: u32 = 25;
const DEFAULT_TOTAL_DISTANCE: u32 = 1000;
const DEFAULT_LAP_DISTANCE: u32 = 200;

/// Session parameters: total time budget and the distances that split it into laps.
///
/// Lap count and lap duration are derived on every read, so they always
/// reflect the current inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LapTimerConfig {
    total_minutes: u32,
    total_seconds: u32,
    total_distance: u32,
    lap_distance: u32,
}

impl Default for LapTimerConfig {
    fn default() -> Self {
        Self {
            total_minutes: DEFAULT_MINUTES,
            total_seconds: DEFAULT_SECONDS,
            total_distance: DEFAULT_TOTAL_DISTANCE,
            lap_distance: DEFAULT_LAP_DISTANCE,
        }
    }
}

impl LapTimerConfig {
    pub fn new(minutes: u32, seconds: u32, total_distance: u32, lap_distance: u32) -> Self {
        Self {
            total_minutes: minutes,
            total_seconds: seconds,
            total_distance,
            lap_distance,
        }
    }

    pub fn set_total_time(&mut self, minutes: u32, seconds: u32) {
        self.total_minutes = minutes;
        self.total_seconds = seconds;
    }

    pub fn set_total_distance(&mut self, distance: u32) {
        self.total_distance = distance;
    }

    pub fn set_lap_distance(&mut self, distance: u32) {
        self.lap_distance = distance;
    }

    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn total_distance(&self) -> u32 {
        self.total_distance
    }

    pub fn lap_distance(&self) -> u32 {
        self.lap_distance
    }

    pub fn total_duration_seconds(&self) -> u32 {
        self.total_minutes
            .saturating_mul(60)
            .saturating_add(self.total_seconds)
    }

    /// `max(1, ceil(total_distance / lap_distance))`; a zero lap distance counts as one lap.
    pub fn total_laps(&self) -> u32 {
        if self.lap_distance == 0 {
            return 1;
        }
        self.total_distance.div_ceil(self.lap_distance).max(1)
    }

    /// `floor(total_duration / total_laps)`, or 0 for a degenerate configuration.
    pub fn lap_duration_seconds(&self) -> u32 {
        let total = self.total_duration_seconds();
        if total == 0 || self.total_distance == 0 || self.lap_distance == 0 {
            return 0;
        }
        total / self.total_laps()
    }

    /// Checks the bounds an input surface is expected to enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_seconds >= 60 {
            return Err(ConfigError::SecondsOutOfRange(self.total_seconds));
        }
        if self.total_distance == 0 || self.total_distance > MAX_TOTAL_DISTANCE {
            return Err(ConfigError::TotalDistanceOutOfRange(self.total_distance));
        }
        if self.lap_distance == 0 || self.lap_distance > self.total_distance {
            return Err(ConfigError::LapDistanceOutOfRange {
                lap: self.lap_distance,
                total: self.total_distance,
            });
        }
        self.check_runnable()
    }

    /// The minimum needed to start a run: at least one lap of at least one second.
    pub fn check_runnable(&self) -> Result<(), ConfigError> {
        if self.total_laps() < 1 {
            return Err(ConfigError::NoLaps);
        }
        if self.lap_duration_seconds() == 0 {
            return Err(ConfigError::ZeroLapDuration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derivation() {
        let cfg = LapTimerConfig::default();
        assert_eq!(cfg.total_duration_seconds(), 265);
        assert_eq!(cfg.total_laps(), 5);
        assert_eq!(cfg.lap_duration_seconds(), 53);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_last_lap_rounds_laps_up() {
        let cfg = LapTimerConfig::new(5, 0, 1000, 300);
        assert_eq!(cfg.total_laps(), 4);
        assert_eq!(cfg.lap_duration_seconds(), 75);
    }

    #[test]
    fn test_lap_longer_than_total_is_one_lap() {
        let cfg = LapTimerConfig::new(1, 0, 100, 400);
        assert_eq!(cfg.total_laps(), 1);
        assert_eq!(cfg.lap_duration_seconds(), 60);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::LapDistanceOutOfRange { lap: 400, total: 100 })
        );
    }

    #[test]
    fn test_setters_recompute() {
        let mut cfg = LapTimerConfig::default();
        cfg.set_lap_distance(400);
        assert_eq!(cfg.total_laps(), 3);
        assert_eq!(cfg.lap_duration_seconds(), 88);
        cfg.set_total_time(6, 0);
        assert_eq!(cfg.lap_duration_seconds(), 120);
        cfg.set_total_distance(2000);
        assert_eq!(cfg.total_laps(), 5);
        assert_eq!(cfg.lap_duration_seconds(), 72);
    }

    #[test]
    fn test_degenerate_configs_yield_zero_duration() {
        assert_eq!(LapTimerConfig::new(0, 0, 1000, 200).lap_duration_seconds(), 0);
        assert_eq!(LapTimerConfig::new(4, 25, 0, 200).lap_duration_seconds(), 0);
        assert_eq!(LapTimerConfig::new(4, 25, 1000, 0).lap_duration_seconds(), 0);
        assert_eq!(LapTimerConfig::new(4, 25, 1000, 0).total_laps(), 1);
        // 3 seconds over 5 laps floors to zero.
        assert_eq!(LapTimerConfig::new(0, 3, 1000, 200).lap_duration_seconds(), 0);
    }

    #[test]
    fn test_check_runnable() {
        assert_eq!(
            LapTimerConfig::new(0, 0, 1000, 200).check_runnable(),
            Err(ConfigError::ZeroLapDuration)
        );
        assert!(LapTimerConfig::new(0, 5, 1000, 200).check_runnable().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        assert_eq!(
            LapTimerConfig::new(4, 60, 1000, 200).validate(),
            Err(ConfigError::SecondsOutOfRange(60))
        );
        assert_eq!(
            LapTimerConfig::new(4, 0, MAX_TOTAL_DISTANCE + 1, 200).validate(),
            Err(ConfigError::TotalDistanceOutOfRange(MAX_TOTAL_DISTANCE + 1))
        );
        assert_eq!(
            LapTimerConfig::new(4, 0, 1000, 0).validate(),
            Err(ConfigError::LapDistanceOutOfRange { lap: 0, total: 1000 })
        );
    }
}
