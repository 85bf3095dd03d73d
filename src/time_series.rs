use serde::{Deserialize, Serialize};

/// WPM observed at a refresh tick, `elapsed_secs` after the session started
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WpmSample {
    pub elapsed_secs: f64,
    pub wpm: u32,
}

impl WpmSample {
    pub fn new(elapsed_secs: f64, wpm: u32) -> Self {
        Self { elapsed_secs, wpm }
    }
}

impl From<WpmSample> for (f64, f64) {
    fn from(s: WpmSample) -> Self {
        (s.elapsed_secs, s.wpm as f64)
    }
}

/// Samples as `(x, y)` pairs for a line chart
pub fn chart_points(samples: &[WpmSample]) -> Vec<(f64, f64)> {
    samples.iter().copied().map(Into::into).collect()
}

pub fn peak_wpm(samples: &[WpmSample]) -> u32 {
    samples.iter().map(|s| s.wpm).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_points() {
        let samples = [WpmSample::new(1.0, 30), WpmSample::new(2.0, 45)];
        assert_eq!(chart_points(&samples), vec![(1.0, 30.0), (2.0, 45.0)]);
    }

    #[test]
    fn test_peak_wpm() {
        assert_eq!(peak_wpm(&[]), 0);
        let samples = [
            WpmSample::new(1.0, 30),
            WpmSample::new(2.0, 52),
            WpmSample::new(3.0, 41),
        ];
        assert_eq!(peak_wpm(&samples), 52);
    }
}
