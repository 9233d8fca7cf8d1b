//! Effect program lifecycle.
//!
//! Every effect program owns a [`ProgramCell`] driving the state machine
//! `Unloaded → Loading → Ready | Failed`. Readiness lives in an atomic
//! so `paint` callers can check it without coordination, and a `Failed`
//! program stays failed for the session: the warn fires once at the
//! transition and the CPU route takes over from then on.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum ProgramState {
    Unloaded = 0,
    Loading = 1,
    Ready = 2,
    Failed = 3,
}

#[derive(Debug)]
pub struct ProgramCell {
    name: &'static str,
    state: AtomicU8,
}

impl ProgramCell {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(ProgramState::Unloaded as u8),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ProgramState {
        match self.state.load(Ordering::Acquire) {
            0 => ProgramState::Unloaded,
            1 => ProgramState::Loading,
            2 => ProgramState::Ready,
            _ => ProgramState::Failed,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == ProgramState::Ready as u8
    }

    /// Claims the load. Returns `false` when a load already ran or is
    /// in flight, collapsing concurrent `load()` calls to one.
    pub fn begin_load(&self) -> bool {
        self.state
            .compare_exchange(
                ProgramState::Unloaded as u8,
                ProgramState::Loading as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Publishes the load outcome. Failure is permanent for the session.
    pub fn finish_load(&self, ok: bool) {
        let next = if ok { ProgramState::Ready } else { ProgramState::Failed };
        self.state.store(next as u8, Ordering::Release);
        if ok {
            log::debug!("{} program ready", self.name);
        } else {
            log::warn!(
                "{} program failed to load; painting the CPU route for the rest of the session",
                self.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_claims_exactly_once() {
        let cell = ProgramCell::new("test");
        assert_eq!(cell.state(), ProgramState::Unloaded);
        assert!(cell.begin_load());
        assert!(!cell.begin_load());
        assert_eq!(cell.state(), ProgramState::Loading);
    }

    #[test]
    fn failure_is_terminal() {
        let cell = ProgramCell::new("test");
        assert!(cell.begin_load());
        cell.finish_load(false);
        assert_eq!(cell.state(), ProgramState::Failed);
        assert!(!cell.is_ready());
        // No way back to Loading.
        assert!(!cell.begin_load());
    }

    #[test]
    fn success_reports_ready() {
        let cell = ProgramCell::new("test");
        assert!(cell.begin_load());
        cell.finish_load(true);
        assert!(cell.is_ready());
    }
}
