use crate::models::error::SError;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Overwrite,
    Skip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub decision: Decision,
    /// Reuse this decision for every later conflict of the same task.
    pub apply_to_all: bool,
}

impl Confirmation {
    pub fn once(decision: Decision) -> Self {
        Self {
            decision,
            apply_to_all: false,
        }
    }

    pub fn for_all(decision: Decision) -> Self {
        Self {
            decision,
            apply_to_all: true,
        }
    }
}

#[derive(Default)]
struct GateState {
    paused: bool,
    pending: bool,
    response: Option<Confirmation>,
}

/// Blocking request/response channel between one worker and its caller.
///
/// The worker is the only side that waits. Every state change, abort included,
/// happens under the mutex before `notify_all`, so a waiting worker cannot miss it.
#[derive(Default)]
pub struct ConfirmationGate {
    state: Mutex<GateState>,
    cond: Condvar,
    aborted: AtomicBool,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the worker until the caller answers or the task is aborted.
    ///
    /// `announce` runs once the request is registered, so an answer sent in reaction
    /// to it is never lost. Returns `Ok(None)` when aborted.
    pub(crate) fn request<F: FnOnce()>(&self, announce: F) -> Result<Option<Confirmation>, SError> {
        let mut state = self.state.lock();
        if state.pending {
            return Err(SError::ConfirmationPending);
        }
        state.pending = true;
        state.response = None;
        announce();

        while state.response.is_none() && !self.is_aborted() {
            self.cond.wait(&mut state);
        }

        state.pending = false;
        if self.is_aborted() {
            state.response = None;
            return Ok(None);
        }
        Ok(state.response.take())
    }

    /// Records the caller's answer. Returns false when nothing was being asked.
    pub fn respond(&self, confirmation: Confirmation) -> bool {
        let mut state = self.state.lock();
        if !state.pending || state.response.is_some() {
            return false;
        }
        state.response = Some(confirmation);
        self.cond.notify_all();
        true
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }

    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        self.cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Blocks while paused. Returns false if the task was aborted meanwhile.
    pub(crate) fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock();
        while state.paused && !self.is_aborted() {
            self.cond.wait(&mut state);
        }
        !self.is_aborted()
    }

    /// One-way. Releases any pending request or pause.
    pub fn abort(&self) {
        let _state = self.state.lock();
        self.aborted.store(true, Ordering::SeqCst);
        self.cond.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}
