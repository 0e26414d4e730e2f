//! # Finality State Machine
//!
//! One submission moves through:
//!
//! ```text
//! Idle ──► Subscribed ──► Submitted ──► Confirmed
//!   │           │              ├──────► TimedOut
//!   │           │              └──────► Abandoned
//!   │           └──► SubmitRejected
//!   └──► SubscribeFailed
//! ```
//!
//! Terminal states are absorbing: once a result is recorded, later events
//! cannot change it. `Abandoned` covers the event stream ending before the
//! race was decided.

use std::time::Instant;

/// Where a tracked submission is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalityState {
    /// Nothing sent yet.
    Idle,
    /// Listening for ledger closes and the account's transactions.
    Subscribed,
    /// Tentatively accepted; racing confirmation against expiry.
    Submitted,
    /// Terminal: seen validated in a closed ledger.
    Confirmed,
    /// Terminal: a ledger past `LastLedgerSequence` closed first.
    TimedOut,
    /// Terminal: the submit was refused or never got through.
    SubmitRejected,
    /// Terminal: the subscription could not be set up.
    SubscribeFailed,
    /// Terminal: the event stream ended mid-race.
    Abandoned,
}

impl FinalityState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FinalityState::Confirmed
                | FinalityState::TimedOut
                | FinalityState::SubmitRejected
                | FinalityState::SubscribeFailed
                | FinalityState::Abandoned
        )
    }
}

/// Tracks the lifecycle of a single submission.
#[derive(Debug)]
pub struct FinalityStateMachine {
    state: FinalityState,
    tx_id: String,
    last_ledger_sequence: Option<u32>,
    started_at: Instant,
}

impl FinalityStateMachine {
    pub fn new(tx_id: impl Into<String>, last_ledger_sequence: Option<u32>) -> Self {
        Self {
            state: FinalityState::Idle,
            tx_id: tx_id.into(),
            last_ledger_sequence,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> FinalityState {
        self.state
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn last_ledger_sequence(&self) -> Option<u32> {
        self.last_ledger_sequence
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// `true` when a ledger with this index closing means the transaction
    /// can no longer be included. Never true without an expiry.
    pub fn is_expired_at(&self, ledger_index: u32) -> bool {
        self.last_ledger_sequence
            .map(|lls| ledger_index > lls)
            .unwrap_or(false)
    }

    fn transition(&mut self, from: FinalityState, to: FinalityState) -> bool {
        if self.state == from {
            self.state = to;
            true
        } else {
            false
        }
    }

    pub fn mark_subscribed(&mut self) -> bool {
        self.transition(FinalityState::Idle, FinalityState::Subscribed)
    }

    pub fn mark_subscribe_failed(&mut self) -> bool {
        self.transition(FinalityState::Idle, FinalityState::SubscribeFailed)
    }

    pub fn mark_submitted(&mut self) -> bool {
        self.transition(FinalityState::Subscribed, FinalityState::Submitted)
    }

    pub fn mark_submit_rejected(&mut self) -> bool {
        self.transition(FinalityState::Subscribed, FinalityState::SubmitRejected)
    }

    pub fn mark_confirmed(&mut self) -> bool {
        self.transition(FinalityState::Submitted, FinalityState::Confirmed)
    }

    pub fn mark_timed_out(&mut self) -> bool {
        self.transition(FinalityState::Submitted, FinalityState::TimedOut)
    }

    pub fn mark_abandoned(&mut self) -> bool {
        self.transition(FinalityState::Submitted, FinalityState::Abandoned)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut sm = FinalityStateMachine::new("ABC", Some(1000));
        assert_eq!(sm.state(), FinalityState::Idle);
        assert!(!sm.is_terminal());

        assert!(sm.mark_subscribed());
        assert!(sm.mark_submitted());
        assert!(sm.mark_confirmed());
        assert_eq!(sm.state(), FinalityState::Confirmed);
        assert!(sm.is_terminal());
    }

    #[test]
    fn terminal_states_are_immutable() {
        let mut sm = FinalityStateMachine::new("ABC", Some(1000));
        sm.mark_subscribed();
        sm.mark_submitted();
        sm.mark_confirmed();

        assert!(!sm.mark_timed_out());
        assert!(!sm.mark_abandoned());
        assert_eq!(sm.state(), FinalityState::Confirmed);
    }

    #[test]
    fn cannot_skip_subscription() {
        let mut sm = FinalityStateMachine::new("ABC", None);
        assert!(!sm.mark_submitted());
        assert!(!sm.mark_confirmed());
        assert_eq!(sm.state(), FinalityState::Idle);
    }

    #[test]
    fn rejection_never_enters_race() {
        let mut sm = FinalityStateMachine::new("ABC", Some(10));
        sm.mark_subscribed();
        assert!(sm.mark_submit_rejected());
        assert!(!sm.mark_submitted());
        assert!(!sm.mark_timed_out());
        assert_eq!(sm.state(), FinalityState::SubmitRejected);
    }

    #[test]
    fn subscribe_failure_is_terminal() {
        let mut sm = FinalityStateMachine::new("ABC", Some(10));
        assert!(sm.mark_subscribe_failed());
        assert!(!sm.mark_subscribed());
        assert!(sm.is_terminal());
    }

    #[test]
    fn expiry_is_strictly_greater() {
        let sm = FinalityStateMachine::new("ABC", Some(1000));
        assert!(!sm.is_expired_at(999));
        assert!(!sm.is_expired_at(1000));
        assert!(sm.is_expired_at(1001));

        let forever = FinalityStateMachine::new("ABC", None);
        assert!(!forever.is_expired_at(u32::MAX));
    }
}
