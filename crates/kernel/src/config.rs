//! Scheduler configuration.

use crate::error::ConfigurationError;
use modgrid_types::SimTime;

/// How the apply-loop is paced against wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Apply events as fast as possible, ignoring wall-clock time.
    /// Used for batch and regression runs where only logical ordering
    /// matters.
    RunAhead,

    /// Apply an event only once elapsed wall-clock time (minus time spent
    /// paused) has reached its firing time. Required when a human-facing
    /// visualization is attached.
    RealTimePaced,
}

/// Whether the run terminates on its own when the queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    /// The run ends when the queue is empty (or the maximum date is
    /// reached).
    Bounded,

    /// The run keeps going when the queue drains, waiting for injected
    /// events. Requires an explicit stop from the driver unless
    /// `auto_stop` opts into ending at quiescence.
    Unbounded,
}

/// Complete scheduler configuration, validated at spawn time.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub pacing: PacingMode,
    pub length: RunLength,
    /// Upper bound on the simulation clock. Only meaningful for bounded
    /// runs; the run ends at this date without applying later events.
    pub maximum_date: Option<SimTime>,
    /// Enter `Running` immediately at spawn, without an explicit `start`.
    pub auto_start: bool,
    /// Under [`RunLength::Unbounded`], treat a drained queue as
    /// quiescence and end the run.
    pub auto_stop: bool,
    /// Interval between keyframe observer notifications. `None` disables
    /// keyframes entirely.
    pub keyframe_interval: Option<SimTime>,
}

impl SchedulerConfig {
    pub fn new(pacing: PacingMode) -> Self {
        SchedulerConfig {
            pacing,
            length: RunLength::Bounded,
            maximum_date: None,
            auto_start: false,
            auto_stop: false,
            keyframe_interval: None,
        }
    }

    pub fn with_maximum_date(mut self, maximum_date: SimTime) -> Self {
        self.maximum_date = Some(maximum_date);
        self
    }

    pub fn with_unbounded(mut self) -> Self {
        self.length = RunLength::Unbounded;
        self
    }

    pub fn with_auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    pub fn with_auto_stop(mut self) -> Self {
        self.auto_stop = true;
        self
    }

    pub fn with_keyframe_interval(mut self, interval: SimTime) -> Self {
        self.keyframe_interval = Some(interval);
        self
    }

    /// Validate the configuration. Called by `Scheduler::spawn`; a failure
    /// aborts startup.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.maximum_date.is_some() && self.length == RunLength::Unbounded {
            return Err(ConfigurationError::MaximumDateUnbounded);
        }
        if self.keyframe_interval == Some(SimTime::ZERO) {
            return Err(ConfigurationError::ZeroKeyframeInterval);
        }
        Ok(())
    }
}
