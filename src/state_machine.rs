/// Session status — drives which inputs are live and what the status line
/// shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Listening,
    Thinking,
    Success,
}

/// Current status plus an epoch counter. Every transition bumps the epoch;
/// anything scheduled against an old epoch (the success auto-revert) is
/// ignored when it lands, so a timer can never fire into a state it wasn't
/// armed for.
#[derive(Debug)]
pub struct SessionState {
    status: SessionStatus,
    epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            epoch: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn set(&mut self, next: SessionStatus) {
        if self.status == next {
            return;
        }
        log::debug!("Status: {:?} -> {:?}", self.status, next);
        self.status = next;
        self.epoch += 1;
    }

    /// Voice capture activated. Only leaves `Idle`.
    pub fn begin_listening(&mut self) -> bool {
        if self.status != SessionStatus::Idle {
            return false;
        }
        self.set(SessionStatus::Listening);
        true
    }

    /// Capture ended without a submittable transcript, or was cancelled.
    pub fn end_listening(&mut self) {
        if self.status == SessionStatus::Listening {
            self.set(SessionStatus::Idle);
        }
    }

    /// A submission was accepted. Refused while a turn is already in
    /// flight — at most one `Thinking` cycle at a time.
    pub fn begin_thinking(&mut self) -> bool {
        if self.status == SessionStatus::Thinking {
            return false;
        }
        self.set(SessionStatus::Thinking);
        true
    }

    /// Reply handled, nothing was booked.
    pub fn settle_idle(&mut self) {
        self.set(SessionStatus::Idle);
    }

    /// A confirmation landed. Returns the epoch the auto-revert must carry.
    pub fn settle_success(&mut self) -> u64 {
        self.set(SessionStatus::Success);
        self.epoch
    }

    /// The success hold elapsed. Reverts only if nothing moved the state
    /// since the timer was armed.
    pub fn revert_success(&mut self, armed_epoch: u64) -> bool {
        if self.status == SessionStatus::Success && self.epoch == armed_epoch {
            self.set(SessionStatus::Idle);
            return true;
        }
        false
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listening_only_from_idle() {
        let mut state = SessionState::new();
        assert!(state.begin_listening());
        assert_eq!(state.status(), SessionStatus::Listening);

        // already listening
        assert!(!state.begin_listening());

        state.begin_thinking();
        assert!(!state.begin_listening());
        assert_eq!(state.status(), SessionStatus::Thinking);
    }

    #[test]
    fn test_end_listening_reverts_to_idle() {
        let mut state = SessionState::new();
        state.begin_listening();
        state.end_listening();
        assert_eq!(state.status(), SessionStatus::Idle);

        // no effect outside Listening
        state.begin_thinking();
        state.end_listening();
        assert_eq!(state.status(), SessionStatus::Thinking);
    }

    #[test]
    fn test_at_most_one_thinking_cycle() {
        let mut state = SessionState::new();
        assert!(state.begin_thinking());
        assert!(!state.begin_thinking());
        state.settle_idle();
        assert!(state.begin_thinking());
    }

    #[test]
    fn test_thinking_reachable_from_listening_and_success() {
        let mut state = SessionState::new();
        state.begin_listening();
        assert!(state.begin_thinking());

        state.settle_success();
        assert!(state.begin_thinking());
    }

    #[test]
    fn test_success_reverts_with_matching_epoch() {
        let mut state = SessionState::new();
        state.begin_thinking();
        let armed = state.settle_success();
        assert_eq!(state.status(), SessionStatus::Success);
        assert!(state.revert_success(armed));
        assert_eq!(state.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_stale_revert_is_ignored() {
        let mut state = SessionState::new();
        state.begin_thinking();
        let armed = state.settle_success();

        // a new submission preempts the pending revert
        assert!(state.begin_thinking());
        assert!(!state.revert_success(armed));
        assert_eq!(state.status(), SessionStatus::Thinking);
    }

    #[test]
    fn test_revert_only_fires_once() {
        let mut state = SessionState::new();
        state.begin_thinking();
        let armed = state.settle_success();
        assert!(state.revert_success(armed));
        assert!(!state.revert_success(armed));
        assert_eq!(state.status(), SessionStatus::Idle);
    }
}
