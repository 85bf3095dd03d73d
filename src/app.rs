use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::Clock;
use crate::content::{Book, ContentProvider, Difficulty};
use crate::error::ContentError;
use crate::refresh::RefreshScheduler;
use crate::runtime::AppEvent;
use crate::session::TypingSession;
use crate::stats::{StatsSink, TypingRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Which text the user is practising on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub book_id: u32,
    pub difficulty: Difficulty,
    /// Overrides the library text when set
    pub custom_prompt: Option<String>,
}

/// Ties the content library, the typing session and the stats sink together.
///
/// The session itself never sees the library or the sink: the app resolves
/// the reference text, forwards input, and hands the final snapshot to the
/// sink once a session completes.
pub struct App {
    library: Box<dyn ContentProvider>,
    sink: Option<Box<dyn StatsSink>>,
    selection: Selection,
    session: TypingSession,
    pub state: AppState,
    recorded: bool,
    personal_best: Option<u32>,
    new_best: bool,
    /// Last collaborator failure, shown in the footer
    pub notice: Option<String>,
}

impl App {
    pub fn new(
        library: Box<dyn ContentProvider>,
        selection: Selection,
        clock: Arc<dyn Clock>,
        scheduler: Box<dyn RefreshScheduler>,
        refresh_interval: Duration,
    ) -> Result<Self, ContentError> {
        let text = resolve_text(library.as_ref(), &selection)?;
        let session = TypingSession::with_runtime(text, clock, scheduler, refresh_interval);

        Ok(Self {
            library,
            sink: None,
            selection,
            session,
            state: AppState::Typing,
            recorded: false,
            personal_best: None,
            new_best: false,
            notice: None,
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn StatsSink>) -> Self {
        self.sink = Some(sink);
        self.refresh_personal_best();
        self
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn book(&self) -> Option<&Book> {
        self.library.book(self.selection.book_id)
    }

    pub fn personal_best(&self) -> Option<u32> {
        self.personal_best
    }

    /// Whether the recorded session beat every earlier one for this selection
    pub fn is_new_best(&self) -> bool {
        self.new_best
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    pub fn on_event(&mut self, event: AppEvent) -> Control {
        match event {
            AppEvent::Key(key) => return self.on_key(key),
            AppEvent::Refresh(epoch) => {
                self.session.on_refresh(epoch);
            }
            AppEvent::Tick | AppEvent::Resize => {}
        }
        Control::Continue
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Char('c') if ctrl => return Control::Quit,
            KeyCode::Tab | KeyCode::Left => self.restart(),
            KeyCode::Right => self.next_book(),
            _ => match self.state {
                AppState::Typing => match key.code {
                    KeyCode::Char('w') | KeyCode::Char('h') if ctrl => self.delete_word(),
                    KeyCode::Backspace if ctrl => self.delete_word(),
                    KeyCode::Backspace => self.backspace(),
                    KeyCode::Char(c) if !ctrl => self.type_char(c),
                    _ => {}
                },
                AppState::Results => match key.code {
                    KeyCode::Char('r') => self.restart(),
                    KeyCode::Char('n') => self.next_book(),
                    KeyCode::Char('d') => self.cycle_difficulty(),
                    _ => {}
                },
            },
        }
        Control::Continue
    }

    pub fn type_char(&mut self, c: char) {
        let mut next = self.session.typed_text().to_owned();
        next.push(c);
        self.input(&next);
    }

    pub fn backspace(&mut self) {
        let mut next = self.session.typed_text().to_owned();
        if next.pop().is_some() {
            self.input(&next);
        }
    }

    /// Remove trailing whitespace and then the word before it
    pub fn delete_word(&mut self) {
        let typed = self.session.typed_text();
        let trimmed = typed.trim_end();
        let keep = trimmed
            .rfind(char::is_whitespace)
            .map(|idx| idx + trimmed[idx..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        if keep < typed.len() {
            let next = typed[..keep].to_owned();
            self.input(&next);
        }
    }

    /// Forward the full input value to the session
    pub fn input(&mut self, value: &str) {
        self.session.handle_input(value);
        if self.session.is_completed() {
            self.record_completion();
            self.state = AppState::Results;
        }
    }

    /// Same text, fresh session
    pub fn restart(&mut self) {
        self.session.reset();
        self.state = AppState::Typing;
        self.recorded = false;
        self.new_best = false;
    }

    pub fn next_book(&mut self) {
        let next = self.library.next_book_id(self.selection.book_id);
        self.select(next, self.selection.difficulty);
    }

    pub fn cycle_difficulty(&mut self) {
        self.select(self.selection.book_id, self.selection.difficulty.next());
    }

    /// Switch book and/or difficulty. Any change resets the session; if the
    /// library can't supply the text the current session keeps running.
    pub fn select(&mut self, book_id: u32, difficulty: Difficulty) {
        let changed = book_id != self.selection.book_id
            || difficulty != self.selection.difficulty
            || self.selection.custom_prompt.is_some();
        if !changed {
            return;
        }

        match self.library.excerpt(book_id, difficulty) {
            Ok(text) => {
                tracing::debug!(book_id, %difficulty, "selection changed");
                self.selection = Selection {
                    book_id,
                    difficulty,
                    custom_prompt: None,
                };
                self.session.replace_text(text);
                self.state = AppState::Typing;
                self.recorded = false;
                self.new_best = false;
                self.notice = None;
                self.refresh_personal_best();
            }
            Err(err) => {
                tracing::warn!(book_id, %difficulty, %err, "could not load excerpt");
                self.notice = Some(err.to_string());
            }
        }
    }

    fn record_completion(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        // Free-form prompts have no book identity to file them under
        if self.selection.custom_prompt.is_some() {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let stats = self.session.stats();
        let record = TypingRecord {
            book_id: self.selection.book_id,
            wpm: stats.wpm,
            accuracy: stats.accuracy,
            difficulty: self.selection.difficulty,
            timestamp: Local::now(),
        };
        let previous_best = self.personal_best;
        match sink.record(&record) {
            Ok(id) => {
                tracing::info!(id, wpm = record.wpm, accuracy = record.accuracy, "session recorded");
                self.new_best = previous_best.map_or(true, |best| record.wpm > best);
            }
            Err(err) => {
                tracing::warn!(%err, "could not record session");
                self.notice = Some(err.to_string());
            }
        }
        self.refresh_personal_best();
    }

    fn refresh_personal_best(&mut self) {
        self.personal_best = self.sink.as_ref().and_then(|sink| {
            sink.best_wpm(self.selection.book_id, self.selection.difficulty)
                .map_err(|err| tracing::warn!(%err, "could not read personal best"))
                .ok()
                .flatten()
        });
    }
}

fn resolve_text(library: &dyn ContentProvider, selection: &Selection) -> Result<String, ContentError> {
    match &selection.custom_prompt {
        Some(prompt) => Ok(prompt.clone()),
        None => library.excerpt(selection.book_id, selection.difficulty),
    }
}
