//! Simple moving average with a one-observation minimum.
//!
//! Unlike a strict SMA, the first `window - 1` values are defined: each is the
//! mean of however many closes are available so far.

/// Rolling mean of `values` over `window` observations.
///
/// Output has the same length as the input. A `window` of 0 is treated as 1.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }
    out
}
