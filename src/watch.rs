//! Watch mode
//!
//! Polls one file's modification time and re-runs the cycle when it
//! changes. Writes that land inside the debounce window are coalesced into
//! a single cycle. The loop is strictly sequential: a long cycle delays the
//! next poll, and no two cycles ever overlap.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::Local;

use crate::analysis::AnalysisStep;
use crate::build::BuildStep;
use crate::console::{Console, Level};
use crate::cycle::CycleOrchestrator;
use crate::signal::InterruptState;
use crate::verify::VerificationStep;

/// Longest uninterrupted sleep; bounds interrupt latency
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Polling and debounce intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            debounce: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Watch file does not exist: {0}")]
    Missing(PathBuf),

    #[error("Cannot read modification time of {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Something the watch loop can trigger
pub trait Cycle {
    /// Run one cycle, returning whether it fully succeeded
    fn trigger(&mut self) -> bool;
}

impl<B, V, A> Cycle for CycleOrchestrator<B, V, A>
where
    B: BuildStep,
    V: VerificationStep,
    A: AnalysisStep,
{
    fn trigger(&mut self) -> bool {
        self.run_cycle().success()
    }
}

/// Sleeping, abstracted so tests can simulate time passing
pub trait Pause {
    /// Wait `duration`. Returns `false` if interrupted before it elapsed.
    fn pause(&mut self, duration: Duration, interrupt: &InterruptState) -> bool;
}

/// Real sleep, sliced so an interrupt is noticed quickly
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration, interrupt: &InterruptState) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if interrupt.is_stop_requested() {
                return false;
            }
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
        !interrupt.is_stop_requested()
    }
}

/// Watched file and the last modification time acted upon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    pub target_path: PathBuf,
    pub last_modified: SystemTime,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    /// A change was seen and one cycle ran with this outcome
    Triggered(bool),
    Interrupted,
}

pub struct Watcher {
    state: WatchState,
    config: WatchConfig,
    console: Console,
    unreadable_reported: bool,
}

impl Watcher {
    /// Begin watching `path`, recording its current mtime as the baseline.
    pub fn start(path: &Path, config: WatchConfig, console: Console) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::Missing(path.to_path_buf()));
        }
        let last_modified = modified(path)?;

        Ok(Self {
            state: WatchState {
                target_path: path.to_path_buf(),
                last_modified,
            },
            config,
            console,
            unreadable_reported: false,
        })
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Sleep one poll interval, then check for a change and react to it.
    pub fn poll<C, P>(&mut self, cycle: &mut C, pause: &mut P, interrupt: &InterruptState) -> PollOutcome
    where
        C: Cycle,
        P: Pause,
    {
        if !pause.pause(self.config.poll_interval, interrupt) {
            return PollOutcome::Interrupted;
        }

        let Some(current) = self.read_modified() else {
            return PollOutcome::Unchanged;
        };
        // Any difference counts, including a move backwards in time.
        if current == self.state.last_modified {
            return PollOutcome::Unchanged;
        }

        let name = self
            .state
            .target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.state.target_path.display().to_string());
        self.console.note(
            Level::Info,
            &format!("\n🔄 Change detected in {} at {}", name, Local::now().format("%H:%M:%S")),
        );
        tracing::debug!(path = %self.state.target_path.display(), "modification detected");

        if !pause.pause(self.config.debounce, interrupt) {
            return PollOutcome::Interrupted;
        }

        // Baseline is taken after the debounce so the whole burst counts once.
        self.state.last_modified = self.read_modified().unwrap_or(current);

        let ok = cycle.trigger();
        self.announce_watching();
        PollOutcome::Triggered(ok)
    }

    /// Poll until interrupted.
    pub fn run<C, P>(&mut self, cycle: &mut C, pause: &mut P, interrupt: &InterruptState)
    where
        C: Cycle,
        P: Pause,
    {
        self.announce_watching();
        self.console.note(Level::Info, "Press Ctrl+C to stop\n");

        loop {
            match self.poll(cycle, pause, interrupt) {
                PollOutcome::Interrupted => break,
                PollOutcome::Triggered(ok) => {
                    tracing::debug!(success = ok, "watch cycle finished");
                }
                PollOutcome::Unchanged => {}
            }
        }

        self.console.note(Level::Info, "\n\n👋 Watch mode stopped");
    }

    fn announce_watching(&self) {
        self.console.note(
            Level::Info,
            &format!("\n👁 Watching {} for changes...", self.state.target_path.display()),
        );
    }

    fn read_modified(&mut self) -> Option<SystemTime> {
        match modified(&self.state.target_path) {
            Ok(t) => {
                self.unreadable_reported = false;
                Some(t)
            }
            Err(e) => {
                // Editors that save by rename briefly remove the file.
                if !self.unreadable_reported {
                    tracing::warn!(error = %e, "watch target unreadable, will keep polling");
                    self.unreadable_reported = true;
                }
                None
            }
        }
    }
}

fn modified(path: &Path) -> Result<SystemTime, WatchError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| WatchError::Metadata {
            path: path.to_path_buf(),
            source,
        })
}
