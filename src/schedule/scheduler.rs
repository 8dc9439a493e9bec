use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    auth::tokens::{SessionCookie, TokenSource},
    foundation::{
        core::{EpochMillis, SlotId},
        error::{PlacerError, PlacerResult},
    },
    placement::client::{AttemptOutcome, PlacementClient},
    protocol::realtime::ServerEvent,
    schedule::{
        clock::{Clock, local_time, millis},
        policy::{Rearm, RetryPolicy},
        slot::{AccountSlot, Armed, SlotState},
    },
    source::order::{OrderLoader, TargetOrder},
};

const NOT_LOGGED_IN: &str = "user is not logged in";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerTimings {
    /// First attempts are spread evenly over this window.
    pub stagger_window: Duration,
    pub token_refresh: Duration,
    /// How long the scheduler waits for one attempt before serving other slots meanwhile.
    pub attempt_grace: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            stagger_window: Duration::from_secs(300),
            token_refresh: Duration::from_secs(30 * 60),
            attempt_grace: Duration::from_secs(30),
        }
    }
}

/// Offset of slot `k` out of `n` within the stagger window.
pub fn stagger_offset(window: Duration, k: usize, n: usize) -> EpochMillis {
    if n == 0 {
        return 0;
    }
    let offset = i128::from(millis(window)) * k as i128 / n as i128;
    EpochMillis::try_from(offset).unwrap_or(EpochMillis::MAX)
}

/// State shared by every slot: the current order snapshot, the slots, and the incoming side
/// of the coordination channel.
pub struct PlacerContext {
    order: Option<Arc<TargetOrder>>,
    slots: Vec<AccountSlot>,
    events: Receiver<ServerEvent>,
}

impl PlacerContext {
    pub fn new(sessions: Vec<SessionCookie>, events: Receiver<ServerEvent>) -> Self {
        let slots = sessions
            .into_iter()
            .enumerate()
            .map(|(i, s)| AccountSlot::new(SlotId(i), s))
            .collect();
        Self {
            order: None,
            slots,
            events,
        }
    }

    pub fn order(&self) -> Option<&Arc<TargetOrder>> {
        self.order.as_ref()
    }

    /// Swap in a new order. Holders of the previous `Arc` keep their snapshot.
    pub fn replace_order(&mut self, order: Arc<TargetOrder>) {
        self.order = Some(order);
    }

    pub fn slots(&self) -> &[AccountSlot] {
        &self.slots
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Job {
    RefreshTokens,
    Attempt(SlotId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due: EpochMillis,
    ticket: u64,
    job: Job,
}

/// Result of an attempt thread, matched back to its slot by `ticket`.
#[derive(Debug)]
struct Finished {
    slot: SlotId,
    ticket: u64,
    outcome: AttemptOutcome,
}

/// Drives every slot from one priority queue of due jobs.
pub struct Scheduler<C: Clock> {
    ctx: PlacerContext,
    tokens: Box<dyn TokenSource>,
    orders: OrderLoader,
    client: Arc<PlacementClient>,
    policy: RetryPolicy,
    timings: SchedulerTimings,
    clock: C,
    queue: BinaryHeap<Reverse<Entry>>,
    next_ticket: u64,
    results_tx: Sender<Finished>,
    results: Receiver<Finished>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        ctx: PlacerContext,
        tokens: Box<dyn TokenSource>,
        orders: OrderLoader,
        client: PlacementClient,
        policy: RetryPolicy,
        timings: SchedulerTimings,
        clock: C,
    ) -> Self {
        let (results_tx, results) = mpsc::channel();
        Self {
            ctx,
            tokens,
            orders,
            client: Arc::new(client),
            policy,
            timings,
            clock,
            queue: BinaryHeap::new(),
            next_ticket: 0,
            results_tx,
            results,
        }
    }

    pub fn context(&self) -> &PlacerContext {
        &self.ctx
    }

    pub fn slot(&self, id: SlotId) -> Option<&AccountSlot> {
        self.ctx.slots.get(id.0)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Fetch tokens, then arm every slot at its staggered start.
    pub fn start(&mut self) {
        let now = self.clock.now();
        self.refresh_tokens();
        let refresh_at = now.saturating_add(millis(self.timings.token_refresh));
        self.push(refresh_at, Job::RefreshTokens);

        let n = self.ctx.slots.len();
        for k in 0..n {
            let due = now.saturating_add(stagger_offset(self.timings.stagger_window, k, n));
            let slot = &mut self.ctx.slots[k];
            slot.state = if slot.token.is_some() {
                SlotState::Scheduled
            } else {
                SlotState::WaitingForTokens
            };
            self.arm(SlotId(k), due);
        }
        tracing::info!(slots = n, "placement started");
    }

    /// Run until every slot has halted.
    pub fn run(&mut self) -> PlacerResult<()> {
        self.start();
        while self.run_next() {}
        if self.ctx.slots.is_empty() {
            return Ok(());
        }
        Err(PlacerError::auth("every account slot stopped after a critical error"))
    }

    /// Wait for the earliest due job and run it, or apply an attempt that finished late in
    /// the meantime. Returns `false` once nothing is left.
    pub fn run_next(&mut self) -> bool {
        if self.ctx.slots.iter().all(AccountSlot::is_halted) {
            return false;
        }
        let Some(entry) = self.peek_live() else {
            return false;
        };
        if let Some(done) = self.clock.wait_until(entry.due, &self.results) {
            self.finish(done);
            return true;
        }
        let Some(entry) = self.pop_live() else {
            return false;
        };
        self.drain_events();
        self.dispatch(entry);
        true
    }

    /// Run every job due at or before `deadline`, then leave the clock at `deadline`.
    pub fn run_until(&mut self, deadline: EpochMillis) {
        loop {
            let due = self.peek_live().is_some_and(|e| e.due <= deadline);
            if due && self.run_next() {
                continue;
            }
            match self.clock.wait_until(deadline, &self.results) {
                Some(done) => self.finish(done),
                None => break,
            }
        }
        self.drain_events();
    }

    /// Earliest job that has not been superseded.
    fn peek_live(&mut self) -> Option<Entry> {
        while let Some(Reverse(entry)) = self.queue.peek().copied() {
            if self.is_live(&entry) {
                return Some(entry);
            }
            self.queue.pop();
        }
        None
    }

    fn pop_live(&mut self) -> Option<Entry> {
        let entry = self.peek_live()?;
        self.queue.pop();
        Some(entry)
    }

    pub fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Map { file, reason } => {
                let reason = reason.unwrap_or_else(|| "connected to server".to_string());
                match self.orders.load(&file) {
                    Ok(order) => {
                        tracing::info!(
                            %reason,
                            ordered = order.real_work().len(),
                            "new map loaded"
                        );
                        self.ctx.replace_order(order);
                    }
                    Err(e) => {
                        tracing::warn!(%reason, %file, error = %e, "could not load new map; keeping the previous one");
                    }
                }
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.ctx.events.try_recv() {
            self.apply_event(event);
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        match entry.job {
            Job::RefreshTokens => true,
            Job::Attempt(id) => self
                .ctx
                .slots
                .get(id.0)
                .and_then(|s| s.armed)
                .is_some_and(|a| a.ticket == entry.ticket),
        }
    }

    fn dispatch(&mut self, entry: Entry) {
        match entry.job {
            Job::RefreshTokens => {
                self.refresh_tokens();
                let next = self
                    .clock
                    .now()
                    .saturating_add(millis(self.timings.token_refresh));
                self.push(next, Job::RefreshTokens);
            }
            Job::Attempt(id) => self.run_attempt(id),
        }
    }

    fn refresh_tokens(&mut self) {
        let mut refreshed = 0usize;
        for slot in self.ctx.slots.iter_mut().filter(|s| !s.is_halted()) {
            match self.tokens.access_token(&slot.session) {
                Ok(token) => {
                    tracing::debug!(slot = %slot.id, token = %token.redacted(), "refreshed token");
                    slot.token = Some(token);
                    refreshed += 1;
                }
                Err(e) => {
                    tracing::warn!(slot = %slot.id, error = %e, "token refresh failed; keeping previous token");
                }
            }
        }
        tracing::info!(refreshed, total = self.ctx.slots.len(), "refreshed tokens");
    }

    fn run_attempt(&mut self, id: SlotId) {
        let Some(slot) = self.ctx.slots.get_mut(id.0) else {
            return;
        };
        slot.armed = None;

        let Some(token) = slot.token.clone() else {
            slot.state = SlotState::WaitingForTokens;
            let due = self.policy.after(self.policy.token_poll, self.clock.now());
            self.arm(id, due);
            return;
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        slot.state = SlotState::Attempting;
        slot.in_flight = Some(ticket);

        let order = self.ctx.order.clone();
        let client = Arc::clone(&self.client);
        let results = self.results_tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("attempt-{id}"))
            .spawn(move || {
                let outcome = client.attempt(id, order.as_deref(), &token);
                // The scheduler may be gone during shutdown.
                let _ = results.send(Finished {
                    slot: id,
                    ticket,
                    outcome,
                });
            });
        if let Err(e) = spawned {
            self.finish(Finished {
                slot: id,
                ticket,
                outcome: AttemptOutcome::Transient(PlacerError::transport(format!(
                    "spawn attempt thread: {e}"
                ))),
            });
            return;
        }
        self.await_attempt(id, ticket);
    }

    /// Apply results as they arrive until `id`'s attempt is back or the grace period ends.
    /// A slot still running after that stays `Attempting` and is re-armed when it reports.
    fn await_attempt(&mut self, id: SlotId, ticket: u64) {
        let grace = self.timings.attempt_grace;
        let started = Instant::now();
        loop {
            let left = grace.saturating_sub(started.elapsed());
            match self.results.recv_timeout(left) {
                Ok(done) => {
                    let ours = done.slot == id && done.ticket == ticket;
                    self.finish(done);
                    if ours {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        slot = %id,
                        "attempt still running after {grace:?}; serving the other slots meanwhile"
                    );
                    return;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Turn a finished attempt into the slot's next state.
    fn finish(&mut self, done: Finished) {
        let Finished {
            slot: id,
            ticket,
            outcome,
        } = done;
        let Some(slot) = self.ctx.slots.get_mut(id.0) else {
            return;
        };
        if slot.in_flight != Some(ticket) {
            return;
        }
        slot.in_flight = None;

        let now = self.clock.now();
        log_outcome(id, &outcome, &self.policy);

        match self.policy.rearm(&outcome, now) {
            Rearm::At(due) => {
                if let AttemptOutcome::Placed { .. } | AttemptOutcome::RateLimited { .. } = outcome
                {
                    tracing::info!(slot = %id, "next pixel at {}", local_time(due));
                }
                self.ctx.slots[id.0].state = SlotState::Scheduled;
                self.arm(id, due);
            }
            Rearm::Halt(reason) => {
                let guidance = if reason == NOT_LOGGED_IN {
                    " Did you copy the reddit_session cookie correctly?"
                } else {
                    ""
                };
                tracing::error!(slot = %id, "[!!] critical error: {reason}.{guidance}");
                tracing::error!(slot = %id, "[!!] fix this and restart the placer");
                self.ctx.slots[id.0].state = SlotState::Halted { reason };
            }
        }
    }

    /// Arm `id` for `due`, superseding any earlier arming.
    fn arm(&mut self, id: SlotId, due: EpochMillis) {
        let ticket = self.push(due, Job::Attempt(id));
        if let Some(slot) = self.ctx.slots.get_mut(id.0) {
            slot.armed = Some(Armed { due, ticket });
        }
    }

    fn push(&mut self, due: EpochMillis, job: Job) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push(Reverse(Entry { due, ticket, job }));
        ticket
    }
}

fn log_outcome(id: SlotId, outcome: &AttemptOutcome, policy: &RetryPolicy) {
    match outcome {
        AttemptOutcome::NotReady => {
            tracing::debug!(slot = %id, "no order loaded yet");
        }
        AttemptOutcome::CanvasUnavailable(e) if !e.is_retryable() => {
            tracing::error!(slot = %id, error = %e, "could not load the live canvas; retrying in {:?}", policy.canvas_retry);
        }
        AttemptOutcome::CanvasUnavailable(e) => {
            tracing::warn!(slot = %id, error = %e, "could not load the live canvas; retrying in {:?}", policy.canvas_retry);
        }
        AttemptOutcome::NothingToDo(summary) => {
            tracing::info!(
                slot = %id,
                ordered = summary.real,
                "all pixels are already in place; retrying in {:?}",
                policy.idle_retry
            );
        }
        AttemptOutcome::Placed { pixel, .. } => {
            tracing::info!(slot = %id, "placed pixel at ({}, {})", pixel.x, pixel.y);
        }
        AttemptOutcome::RateLimited { .. } => {
            tracing::info!(slot = %id, "placed too soon, cooldown still running");
        }
        AttemptOutcome::Fatal { .. } => {}
        AttemptOutcome::Transient(e) => {
            tracing::warn!(slot = %id, error = %e, "placement failed; retrying in {:?}", policy.transient_retry);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
