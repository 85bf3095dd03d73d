use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters that make up one "word" for WPM purposes
pub const CHARS_PER_WORD: f64 = 5.0;

/// Lower bound on elapsed minutes so the first keystroke doesn't blow up WPM
pub const MIN_ELAPSED_MINUTES: f64 = 0.01;

/// Live statistics for one session, always derived from scratch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStats {
    pub wpm: u32,
    pub accuracy: u32,
    pub elapsed: String,
    pub total_chars: usize,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
}

impl Default for TypingStats {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            elapsed: format_elapsed(Duration::ZERO),
            total_chars: 0,
            correct_chars: 0,
            incorrect_chars: 0,
        }
    }
}

/// Gross words per minute over `elapsed`, rounded and floored at zero
pub fn wpm(total_chars: usize, elapsed: Duration) -> u32 {
    let words = total_chars as f64 / CHARS_PER_WORD;
    let minutes = (elapsed.as_secs_f64() / 60.0).max(MIN_ELAPSED_MINUTES);
    (words / minutes).round().max(0.0) as u32
}

/// Integer percentage of entered characters that were correct
pub fn accuracy(correct_chars: usize, total_chars: usize) -> u32 {
    if total_chars == 0 {
        return 100;
    }
    let pct = (correct_chars as f64 / total_chars as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

/// `m:ss`, with whole seconds truncated
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn compute_stats(
    total_chars: usize,
    correct_chars: usize,
    incorrect_chars: usize,
    elapsed: Duration,
) -> TypingStats {
    TypingStats {
        wpm: wpm(total_chars, elapsed),
        accuracy: accuracy(correct_chars, total_chars),
        elapsed: format_elapsed(elapsed),
        total_chars,
        correct_chars,
        incorrect_chars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = TypingStats::default();
        assert_eq!(stats.wpm, 0);
        assert_eq!(stats.accuracy, 100);
        assert_eq!(stats.elapsed, "0:00");
        assert_eq!(stats.total_chars, 0);
    }

    #[test]
    fn test_wpm_one_minute() {
        // 300 chars in 60 seconds = 60 words in one minute
        assert_eq!(wpm(300, Duration::from_secs(60)), 60);
        assert_eq!(wpm(150, Duration::from_secs(30)), 60);
    }

    #[test]
    fn test_wpm_at_zero_elapsed_uses_floor() {
        // 1 char = 0.2 words over the 0.01 minute floor
        assert_eq!(wpm(1, Duration::ZERO), 20);
        assert_eq!(wpm(0, Duration::ZERO), 0);
    }

    #[test]
    fn test_wpm_rounds() {
        // 7 chars in 10 seconds: 1.4 words / (1/6) min = 8.4
        assert_eq!(wpm(7, Duration::from_secs(10)), 8);
        // 8 chars in 10 seconds: 9.6
        assert_eq!(wpm(8, Duration::from_secs(10)), 10);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(0, 0), 100);
        assert_eq!(accuracy(90, 100), 90);
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(0, 5), 0);
        assert_eq!(accuracy(5, 5), 100);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0:00");
        assert_eq!(format_elapsed(Duration::from_millis(9_999)), "0:09");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1:05");
        assert_eq!(format_elapsed(Duration::from_secs(600)), "10:00");
    }

    #[test]
    fn test_compute_stats() {
        let stats = compute_stats(10, 8, 2, Duration::from_secs(12));
        assert_eq!(stats.wpm, 10);
        assert_eq!(stats.accuracy, 80);
        assert_eq!(stats.elapsed, "0:12");
        assert_eq!(stats.correct_chars, 8);
        assert_eq!(stats.incorrect_chars, 2);
    }
}
