use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_WARN_AFTER: Duration = Duration::from_millis(170_000);
pub const DEFAULT_RESET_AFTER: Duration = Duration::from_millis(180_000);

/// Both thresholds are measured from the same last qualifying input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTuning {
    pub warn_after: Duration,
    pub reset_after: Duration,
}

impl Default for WatchdogTuning {
    fn default() -> Self {
        Self {
            warn_after: DEFAULT_WARN_AFTER,
            reset_after: DEFAULT_RESET_AFTER,
        }
    }
}

impl WatchdogTuning {
    /// Keeps the default lead between warning and reset.
    pub fn with_reset_after(reset_after: Duration) -> Self {
        let lead = DEFAULT_RESET_AFTER - DEFAULT_WARN_AFTER;
        Self {
            warn_after: reset_after.saturating_sub(lead),
            reset_after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogSignal {
    None,
    Warn,
    Reset,
}

#[derive(Debug, Clone)]
pub struct InactivityWatchdog {
    tuning: WatchdogTuning,
    last_activity: Duration,
    warning_active: bool,
}

impl InactivityWatchdog {
    pub fn new(tuning: WatchdogTuning, now: Duration) -> Self {
        let tuning = WatchdogTuning {
            warn_after: tuning.warn_after.min(tuning.reset_after),
            reset_after: tuning.reset_after,
        };
        Self {
            tuning,
            last_activity: now,
            warning_active: false,
        }
    }

    pub fn record_activity(&mut self, now: Duration) {
        self.last_activity = self.last_activity.max(now);
        self.warning_active = false;
    }

    pub fn idle(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_activity)
    }

    pub fn warning_active(&self) -> bool {
        self.warning_active
    }

    /// `Warn` is returned once per idle stretch; `Reset` leaves re-arming to
    /// [`InactivityWatchdog::reset_to_initial`].
    pub fn check(&mut self, now: Duration) -> WatchdogSignal {
        let idle = self.idle(now);
        if idle >= self.tuning.reset_after {
            info!(idle_ms = idle.as_millis() as u64, "idle_reset_due");
            return WatchdogSignal::Reset;
        }
        if idle >= self.tuning.warn_after && !self.warning_active {
            self.warning_active = true;
            warn!(
                idle_ms = idle.as_millis() as u64,
                reset_in_ms = (self.tuning.reset_after - idle).as_millis() as u64,
                "idle_warning"
            );
            return WatchdogSignal::Warn;
        }
        WatchdogSignal::None
    }

    pub fn reset_to_initial(&mut self, now: Duration) {
        self.last_activity = now;
        self.warning_active = false;
    }
}
