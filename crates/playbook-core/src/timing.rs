use std::sync::Mutex;
use std::time::Duration;

/// Thread-safe slot holding the duration of the most recent run.
///
/// Actions and menu options each carry one; the lifecycle driver records
/// into it when the invocation timer stops.
#[derive(Debug, Default)]
pub struct TimingSlot(Mutex<Option<Duration>>);

impl TimingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, duration: Duration) {
        *self.0.lock().expect("timing slot poisoned") = Some(duration);
    }

    /// Duration of the last completed run, if any.
    pub fn last(&self) -> Option<Duration> {
        *self.0.lock().expect("timing slot poisoned")
    }
}
