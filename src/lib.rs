// Library surface for the binary, headless tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod refresh;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod time_series;

pub use session::{CharState, CharStatus, SessionPhase, SessionSnapshot, TypingSession};
