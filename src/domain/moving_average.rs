//! Trailing simple moving average with a minimum of one period.
//!
//! SMA(n)[i] = mean(C[max(0, i+1-n)..=i]) over the finite values in the window.
//! There is no warmup gap: before the window fills, the average is taken over
//! however many bars exist. A window with no finite value yields NaN.

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0_f64, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Number of leading entries whose average covers fewer than `window` bars.
pub fn partial_count(len: usize, window: usize) -> usize {
    len.min(window.saturating_sub(1))
}
