//! Rolling-window statistics used by the mean-reversion evaluator.
//!
//! All functions work on a plain slice (oldest first) and return `None`
//! instead of dividing by zero.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Number of standard deviations `value` lies from the mean of `window`.
///
/// Returns `None` when the window is empty or flat. A flat window is
/// detected relative to the mean so rounding noise on identical prices does
/// not turn into a huge z-score.
pub fn z_score(window: &[f64], value: f64) -> Option<f64> {
    let mean = mean(window)?;
    let std_dev = population_std_dev(window)?;
    if std_dev <= f64::EPSILON * mean.abs().max(1.0) {
        return None;
    }
    Some((value - mean) / std_dev)
}
