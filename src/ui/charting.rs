/// X (seconds) and Y (WPM) upper bounds for the results chart
pub fn compute_chart_params(points: &[(f64, f64)], elapsed_secs: f64) -> (f64, f64) {
    let highest_wpm = points.iter().map(|&(_, wpm)| wpm).fold(0.0_f64, f64::max);

    let last_sample = points.last().map_or(0.0, |&(t, _)| t);
    let overall_duration = last_sample.max(elapsed_secs).max(1.0);

    // Next multiple of ten above the peak
    let y_max = ((highest_wpm / 10.0).floor() + 1.0) * 10.0;

    (overall_duration, y_max)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[], 0.4);
        assert_eq!(x, 1.0);
        assert_eq!(y, 10.0);
    }

    #[test]
    fn test_compute_chart_params_uses_peak_and_duration() {
        let (x, y) = compute_chart_params(&[(1.0, 40.0), (2.0, 80.0), (3.0, 60.0)], 3.4);
        assert_eq!(x, 3.4);
        assert_eq!(y, 90.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.26), "1.3");
    }
}
