use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use crate::foundation::core::EpochMillis;

/// Time source for the scheduler. Suspension happens only through [`Clock::sleep_until`]
/// and [`Clock::wait_until`].
pub trait Clock {
    fn now(&self) -> EpochMillis;
    fn sleep_until(&mut self, due: EpochMillis);

    /// Wait until `due` unless a message arrives on `wake` first.
    fn wait_until<T>(&mut self, due: EpochMillis, wake: &Receiver<T>) -> Option<T>;
}

/// Wall clock; sleeps the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        chrono::Utc::now().timestamp_millis()
    }

    fn sleep_until(&mut self, due: EpochMillis) {
        let wait = due.saturating_sub(self.now());
        if wait > 0 {
            std::thread::sleep(Duration::from_millis(wait as u64));
        }
    }

    fn wait_until<T>(&mut self, due: EpochMillis, wake: &Receiver<T>) -> Option<T> {
        let wait = due.saturating_sub(self.now());
        if wait <= 0 {
            return wake.try_recv().ok();
        }
        match wake.recv_timeout(Duration::from_millis(wait as u64)) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.sleep_until(due);
                None
            }
        }
    }
}

/// Simulated clock that jumps forward instead of sleeping.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualClock {
    now: EpochMillis,
}

impl ManualClock {
    pub fn new(now: EpochMillis) -> Self {
        Self { now }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += millis(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> EpochMillis {
        self.now
    }

    fn sleep_until(&mut self, due: EpochMillis) {
        self.now = self.now.max(due);
    }

    /// Takes a message that is already waiting; otherwise jumps to `due`.
    fn wait_until<T>(&mut self, due: EpochMillis, wake: &Receiver<T>) -> Option<T> {
        if let Ok(msg) = wake.try_recv() {
            return Some(msg);
        }
        self.sleep_until(due);
        None
    }
}

pub fn millis(d: Duration) -> EpochMillis {
    EpochMillis::try_from(d.as_millis()).unwrap_or(EpochMillis::MAX)
}

/// `HH:MM:SS` in the local timezone, for status lines.
pub fn local_time(ts: EpochMillis) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| format!("t={ts}ms"))
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/clock.rs"]
mod tests;
