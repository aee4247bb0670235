//! Interrupt handling for watch mode (SIGINT/SIGTERM)
//!
//! On the first signal the watch loop is asked to stop. The poll sleep is
//! the only preemptible point, so a cycle already in flight runs to
//! completion first. A second signal exits immediately.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code used when a second interrupt forces an immediate exit
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared interrupt flags
#[derive(Debug, Default)]
pub struct InterruptState {
    stop_requested: AtomicBool,
    immediate_exit: AtomicBool,
    signal_count: AtomicU8,
}

impl InterruptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the loop has been asked to stop
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn is_immediate_exit(&self) -> bool {
        self.immediate_exit.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record one signal and return what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);

        match count {
            0 => {
                self.stop_requested.store(true, Ordering::SeqCst);
                SignalAction::RequestStop
            }
            1 => {
                self.immediate_exit.store(true, Ordering::SeqCst);
                SignalAction::ImmediateExit
            }
            _ => SignalAction::Ignore,
        }
    }

    /// Request a stop without a signal
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: finish the current cycle, then stop
    RequestStop,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal
    Ignore,
}

/// Installs the process-wide handler around an [`InterruptState`]
pub struct InterruptHandler {
    state: Arc<InterruptState>,
}

impl InterruptHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(InterruptState::new()),
        }
    }

    pub fn state(&self) -> Arc<InterruptState> {
        Arc::clone(&self.state)
    }

    /// Install the handler. Must be called at most once per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::RequestStop => {
                tracing::debug!("interrupt received, stopping after current step");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(EXIT_CODE_INTERRUPTED);
            }
            SignalAction::Ignore => {}
        })
    }
}

impl Default for InterruptHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = InterruptState::new();
        assert!(!state.is_stop_requested());
        assert!(!state.is_immediate_exit());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_first_signal_requests_stop() {
        let state = InterruptState::new();
        assert_eq!(state.handle_signal(), SignalAction::RequestStop);
        assert!(state.is_stop_requested());
        assert!(!state.is_immediate_exit());
    }

    #[test]
    fn test_second_signal_exits_immediately() {
        let state = InterruptState::new();
        state.handle_signal();
        assert_eq!(state.handle_signal(), SignalAction::ImmediateExit);
        assert!(state.is_immediate_exit());
    }

    #[test]
    fn test_third_signal_ignored() {
        let state = InterruptState::new();
        state.handle_signal();
        state.handle_signal();
        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }

    #[test]
    fn test_request_stop_without_signal() {
        let state = InterruptState::new();
        state.request_stop();
        assert!(state.is_stop_requested());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_handler_shares_state() {
        let handler = InterruptHandler::new();
        let a = handler.state();
        let b = handler.state();
        a.request_stop();
        assert!(b.is_stop_requested());
    }
}
