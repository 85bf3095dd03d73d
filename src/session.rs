use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::metrics::{compute_stats, TypingStats};
use crate::refresh::{NoopScheduler, RefreshGuard, RefreshScheduler};
use crate::time_series::WpmSample;

pub use crate::refresh::Epoch;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharState {
    Upcoming,
    Current,
    Correct,
    Incorrect,
}

/// One reference character and how the user is doing on it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharStatus {
    pub char: char,
    pub state: CharState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Active,
    Completed,
}

/// Read-only view of a session, safe to take at any time
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub typed_text: String,
    pub statuses: Vec<CharStatus>,
    pub current_index: usize,
    pub is_completed: bool,
    pub phase: SessionPhase,
    pub stats: TypingStats,
}

#[derive(Clone, Copy, Debug, Default)]
struct SessionClock {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

impl SessionClock {
    fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.stopped_at = None;
    }

    fn stop(&mut self, now: Instant) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(now);
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            (None, _) => Duration::ZERO,
        }
    }
}

/// The typing-session engine.
///
/// Owns the reference text, what has been typed against it, the per-character
/// status array, the session clock and the derived statistics. Every input
/// event rescores the whole typed text, so the status array is a pure function
/// of the current input and never of its history.
///
/// The periodic statistics refresh is held as a [`RefreshGuard`] that lives
/// only while the session is Active; completion, reset and drop all release it.
/// Ticks carry the [`Epoch`] they were scheduled under and are ignored once the
/// session has been reset.
pub struct TypingSession {
    reference: Vec<char>,
    reference_text: String,
    typed: String,
    statuses: Vec<CharStatus>,
    current_index: usize,
    phase: SessionPhase,
    session_clock: SessionClock,
    stats: TypingStats,
    wpm_samples: Vec<WpmSample>,
    epoch: Epoch,
    refresh: Option<RefreshGuard>,
    refresh_interval: Duration,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn RefreshScheduler>,
}

impl TypingSession {
    /// Session on the system clock with no periodic refresh
    pub fn new(reference_text: impl Into<String>) -> Self {
        Self::with_runtime(
            reference_text,
            Arc::new(SystemClock),
            Box::new(NoopScheduler),
            DEFAULT_REFRESH_INTERVAL,
        )
    }

    pub fn with_runtime(
        reference_text: impl Into<String>,
        clock: Arc<dyn Clock>,
        scheduler: Box<dyn RefreshScheduler>,
        refresh_interval: Duration,
    ) -> Self {
        let mut session = Self {
            reference: Vec::new(),
            reference_text: String::new(),
            typed: String::new(),
            statuses: Vec::new(),
            current_index: 0,
            phase: SessionPhase::Idle,
            session_clock: SessionClock::default(),
            stats: TypingStats::default(),
            wpm_samples: Vec::new(),
            epoch: Epoch::default(),
            refresh: None,
            refresh_interval,
            clock,
            scheduler,
        };
        session.initialize(reference_text.into());
        session
    }

    fn initialize(&mut self, reference_text: String) {
        // Release the old refresh before anything else so it can't observe the new state
        self.refresh = None;
        self.epoch = self.epoch.next();

        self.reference = reference_text.chars().collect();
        self.statuses = self
            .reference
            .iter()
            .enumerate()
            .map(|(idx, &char)| CharStatus {
                char,
                state: if idx == 0 {
                    CharState::Current
                } else {
                    CharState::Upcoming
                },
            })
            .collect();
        self.reference_text = reference_text;
        self.typed.clear();
        self.current_index = 0;
        self.phase = SessionPhase::Idle;
        self.session_clock = SessionClock::default();
        self.stats = TypingStats::default();
        self.wpm_samples.clear();

        tracing::debug!(
            epoch = self.epoch.0,
            chars = self.reference.len(),
            "session initialized"
        );
    }

    /// Back to Idle on the same reference text
    pub fn reset(&mut self) {
        let text = std::mem::take(&mut self.reference_text);
        self.initialize(text);
    }

    /// Back to Idle on a new reference text
    pub fn replace_text(&mut self, reference_text: impl Into<String>) {
        self.initialize(reference_text.into());
    }

    /// Feed the full current contents of the input field.
    ///
    /// Ignored once the session is completed. The first call starts the clock.
    pub fn handle_input(&mut self, value: &str) {
        if self.phase == SessionPhase::Completed {
            return;
        }

        let now = self.clock.now();
        if self.phase == SessionPhase::Idle {
            self.start(now);
        }

        self.typed.clear();
        self.typed.push_str(value);
        let typed_len = self.rescore();

        // An empty reference is complete as soon as anything arrives
        if typed_len == self.reference.len() || self.reference.is_empty() {
            self.complete(now);
        }

        self.recompute_stats(now);
    }

    /// Periodic refresh entry point. Returns whether the tick was applied.
    pub fn on_refresh(&mut self, epoch: Epoch) -> bool {
        if epoch != self.epoch || self.phase != SessionPhase::Active || self.refresh.is_none() {
            tracing::trace!(
                tick_epoch = epoch.0,
                epoch = self.epoch.0,
                phase = ?self.phase,
                "ignoring refresh tick"
            );
            return false;
        }

        let now = self.clock.now();
        self.recompute_stats(now);
        let elapsed = self.session_clock.elapsed(now).as_secs_f64();
        self.wpm_samples.push(WpmSample::new(elapsed, self.stats.wpm));
        true
    }

    fn start(&mut self, now: Instant) {
        self.session_clock.start(now);
        self.phase = SessionPhase::Active;
        self.refresh = Some(self.scheduler.schedule(self.epoch, self.refresh_interval));
        tracing::debug!(epoch = self.epoch.0, "session started");
    }

    fn complete(&mut self, now: Instant) {
        self.phase = SessionPhase::Completed;
        self.session_clock.stop(now);
        self.refresh = None;
        tracing::debug!(
            epoch = self.epoch.0,
            elapsed_ms = self.session_clock.elapsed(now).as_millis() as u64,
            "session completed"
        );
    }

    /// Rescore every reference position against the typed text.
    /// Returns the typed length in chars.
    fn rescore(&mut self) -> usize {
        let typed_len = self.typed.chars().count();
        let scored = typed_len.min(self.reference.len());
        let mut typed_chars = self.typed.chars();

        for (idx, status) in self.statuses.iter_mut().enumerate() {
            status.state = match typed_chars.next() {
                Some(c) if c == status.char => CharState::Correct,
                Some(_) => CharState::Incorrect,
                None if idx == scored => CharState::Current,
                None => CharState::Upcoming,
            };
        }

        self.current_index = scored;
        typed_len
    }

    fn recompute_stats(&mut self, now: Instant) {
        let (correct, incorrect) = self.statuses[..self.current_index].iter().fold(
            (0, 0),
            |(correct, incorrect), status| match status.state {
                CharState::Correct => (correct + 1, incorrect),
                _ => (correct, incorrect + 1),
            },
        );
        let total = self.typed.chars().count();
        self.stats = compute_stats(total, correct, incorrect, self.session_clock.elapsed(now));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            typed_text: self.typed.clone(),
            statuses: self.statuses.clone(),
            current_index: self.current_index,
            is_completed: self.is_completed(),
            phase: self.phase,
            stats: self.stats.clone(),
        }
    }

    pub fn reference_text(&self) -> &str {
        &self.reference_text
    }

    pub fn typed_text(&self) -> &str {
        &self.typed
    }

    pub fn statuses(&self) -> &[CharStatus] {
        &self.statuses
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn stats(&self) -> &TypingStats {
        &self.stats
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_started(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    /// Whether a periodic refresh is currently held
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    /// Elapsed session time; frozen once completed
    pub fn elapsed(&self) -> Duration {
        self.session_clock.elapsed(self.clock.now())
    }

    pub fn wpm_samples(&self) -> &[WpmSample] {
        &self.wpm_samples
    }
}

impl fmt::Debug for TypingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypingSession")
            .field("reference_text", &self.reference_text)
            .field("typed", &self.typed)
            .field("current_index", &self.current_index)
            .field("phase", &self.phase)
            .field("epoch", &self.epoch)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
