//! Scheduled parameter automation.
//!
//! A lane holds time-ordered events against the engine clock (seconds) and
//! evaluates the parameter at any time:
//!
//! - `SetValue` jumps to its value at its time.
//! - `ExponentialRamp` moves from the previous event's value to its own,
//!   ending at its time: `v0 * (v1 / v0)^((t - t0) / (t1 - t0))`.
//!
//! # Example
//!
//! ```
//! use igem_synth::AutomationLane;
//!
//! let mut lane = AutomationLane::new(1.0);
//! lane.set_value_at_time(0.0001, 0.0);
//! lane.exponential_ramp_to_value_at_time(0.5, 0.01);
//!
//! assert_eq!(lane.value_at(0.02), 0.5);
//! ```

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AutomationEvent {
    SetValue { time: f64, value: f32 },
    ExponentialRamp { time: f64, value: f32 },
}

impl AutomationEvent {
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::ExponentialRamp { time, .. } => time,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            AutomationEvent::SetValue { value, .. }
            | AutomationEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

/// Automation timeline for a single parameter.
#[derive(Clone, Debug)]
pub struct AutomationLane {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationLane {
    /// `default_value` applies before the first event.
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    /// Ramps from the preceding event's value, reaching `value` at `time`.
    ///
    /// Ramps between values of opposite sign (or to/from zero) hold the
    /// starting value and jump at `time`.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::ExponentialRamp { time, value });
    }

    /// Removes every event scheduled at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.events.retain(|e| e.time() < from);
    }

    // Events at equal times keep insertion order.
    fn insert(&mut self, event: AutomationEvent) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let index = self.events.partition_point(|e| e.time() <= time);

        if let Some(&AutomationEvent::ExponentialRamp {
            time: end_time,
            value: end_value,
        }) = self.events.get(index)
        {
            // A ramp with nothing before it holds the default.
            let Some(previous) = index.checked_sub(1).map(|i| self.events[i]) else {
                return self.default_value;
            };
            return exponential(
                previous.value(),
                end_value,
                (time - previous.time()) / (end_time - previous.time()),
            );
        }

        match index.checked_sub(1) {
            Some(i) => self.events[i].value(),
            None => self.default_value,
        }
    }

    /// Drops events that no longer affect values at or after `time`.
    pub fn prune(&mut self, time: f64) {
        let obsolete = self
            .events
            .iter()
            .skip(1)
            .take_while(|e| e.time() <= time)
            .count();
        if obsolete > 0 {
            self.events.drain(..obsolete);
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Time of the last scheduled event.
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time())
    }
}

impl Default for AutomationLane {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[inline]
fn exponential(start: f32, end: f32, progress: f64) -> f32 {
    if start == 0.0 || end == 0.0 || (start < 0.0) != (end < 0.0) {
        return start;
    }
    let progress = progress.clamp(0.0, 1.0);
    (start as f64 * (end as f64 / start as f64).powf(progress)) as f32
}
