use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    foundation::{
        core::EpochMillis,
        error::{PlacerError, PlacerResult},
    },
    placement::client::AttemptOutcome,
    schedule::clock::millis,
};

/// Re-arm delays per attempt outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Added to every server-reported cooldown end.
    pub safety_margin: Duration,
    /// Everything already matches the order.
    pub idle_retry: Duration,
    /// Unparseable response or a failed submit.
    pub transient_retry: Duration,
    /// Live canvas fetch failed.
    pub canvas_retry: Duration,
    /// Slot has no access token yet.
    pub token_poll: Duration,
    /// No order map loaded yet.
    pub order_poll: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(3),
            idle_retry: Duration::from_secs(30),
            transient_retry: Duration::from_secs(10),
            canvas_retry: Duration::from_secs(15),
            token_poll: Duration::from_secs(1),
            order_poll: Duration::from_secs(2),
        }
    }
}

/// What to do with a slot after an attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rearm {
    At(EpochMillis),
    Halt(String),
}

impl RetryPolicy {
    pub fn after(&self, delay: Duration, now: EpochMillis) -> EpochMillis {
        now.saturating_add(millis(delay))
    }

    /// Cooldown end plus margin; never earlier than `now`.
    pub fn after_cooldown(&self, next_available: EpochMillis, now: EpochMillis) -> EpochMillis {
        next_available
            .saturating_add(millis(self.safety_margin))
            .max(now)
    }

    pub fn rearm(&self, outcome: &AttemptOutcome, now: EpochMillis) -> Rearm {
        match outcome {
            AttemptOutcome::NotReady => Rearm::At(self.after(self.order_poll, now)),
            AttemptOutcome::CanvasUnavailable(_) => Rearm::At(self.after(self.canvas_retry, now)),
            AttemptOutcome::NothingToDo(_) => Rearm::At(self.after(self.idle_retry, now)),
            AttemptOutcome::Placed { next_available, .. }
            | AttemptOutcome::RateLimited { next_available } => {
                Rearm::At(self.after_cooldown(*next_available, now))
            }
            AttemptOutcome::Fatal { message } => Rearm::Halt(message.clone()),
            AttemptOutcome::Transient(_) => Rearm::At(self.after(self.transient_retry, now)),
        }
    }

    pub fn validate(&self) -> PlacerResult<()> {
        let named = [
            ("idle_retry", self.idle_retry),
            ("transient_retry", self.transient_retry),
            ("canvas_retry", self.canvas_retry),
            ("token_poll", self.token_poll),
            ("order_poll", self.order_poll),
        ];
        for (name, d) in named {
            if d.is_zero() {
                return Err(PlacerError::config(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/policy.rs"]
mod tests;
