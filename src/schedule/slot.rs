use crate::{
    auth::tokens::{AccessToken, SessionCookie},
    foundation::core::{EpochMillis, SlotId},
};

/// Lifecycle of one account slot.
///
/// `Idle -> WaitingForTokens -> Scheduled -> Attempting -> Scheduled ...`, with `Halted` as
/// the only terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    WaitingForTokens,
    Scheduled,
    Attempting,
    Halted { reason: String },
}

/// Pending wake-up of a slot. `ticket` matches exactly one queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Armed {
    pub(crate) due: EpochMillis,
    pub(crate) ticket: u64,
}

#[derive(Clone, Debug)]
pub struct AccountSlot {
    pub id: SlotId,
    pub session: SessionCookie,
    pub token: Option<AccessToken>,
    pub state: SlotState,
    pub(crate) armed: Option<Armed>,
    /// Ticket of the attempt currently running for this slot.
    pub(crate) in_flight: Option<u64>,
}

impl AccountSlot {
    pub fn new(id: SlotId, session: SessionCookie) -> Self {
        Self {
            id,
            session,
            token: None,
            state: SlotState::Idle,
            armed: None,
            in_flight: None,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, SlotState::Halted { .. })
    }

    /// When the slot next wakes up, if it is armed.
    pub fn due(&self) -> Option<EpochMillis> {
        self.armed.map(|a| a.due)
    }
}
