//! Unicode bar sparklines for daily increases.
//!
//! Output is deterministic (handy for golden tests):
//! - the most recent `width` values are drawn, one column each
//! - bars scale between the window's min and max
//! - non-finite values render as a blank column

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the last `width` values as a sparkline. Empty for `width == 0`.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if width == 0 || values.is_empty() {
        return String::new();
    }
    let window = &values[values.len().saturating_sub(width)..];

    let finite = window.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    window
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return ' ';
            }
            let span = max - min;
            if span <= 0.0 {
                return BARS[BARS.len() / 2];
            }
            let level = ((v - min) / span * (BARS.len() - 1) as f64).round() as usize;
            BARS[level.min(BARS.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_between_min_and_max() {
        assert_eq!(sparkline(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 8), "▁▂▃▄▅▆▇█");
    }

    #[test]
    fn keeps_most_recent_window() {
        let line = sparkline(&[100.0, 1.0, 2.0, 3.0], 3);
        assert_eq!(line.chars().count(), 3);
        assert_eq!(line, "▁▅█");
    }

    #[test]
    fn flat_and_degenerate_inputs() {
        assert_eq!(sparkline(&[5.0, 5.0, 5.0], 10), "▅▅▅");
        assert_eq!(sparkline(&[1.0, f64::NAN, 3.0], 10), "▁ █");
        assert_eq!(sparkline(&[], 10), "");
        assert_eq!(sparkline(&[1.0, 2.0], 0), "");
    }
}
