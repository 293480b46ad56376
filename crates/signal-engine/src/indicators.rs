//! Windowed indicator functions.
//!
//! Each function recomputes from the full window on every call and returns
//! `None` (or `false`) when the window is too short, never a partial value.

/// Exponential moving average of `values`.
///
/// Seeded with the simple average of the first `period` values, then smoothed
/// over the rest with `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    Some(
        values[period..]
            .iter()
            .fold(seed, |ema, value| value * k + ema * (1.0 - k)),
    )
}

/// EMA as of the previous bar: the same computation with the last value dropped.
pub fn prev_ema(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period + 1 {
        return None;
    }
    ema(&values[..values.len() - 1], period)
}

/// Relative strength index over the trailing `period` close-to-close changes.
///
/// Uses simple averages of gains and losses. A window without losses is 100.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let (gains, losses) = closes[closes.len() - period - 1..]
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), diff| {
            if diff > 0.0 {
                (gains + diff, losses)
            } else {
                (gains, losses - diff)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

/// Whether the latest volume exceeds `multiplier` times the mean of the
/// `period` volumes before it.
pub fn volume_above_avg(volumes: &[f64], period: usize, multiplier: f64) -> bool {
    if period == 0 || volumes.len() < period + 1 {
        return false;
    }

    let last = volumes.len() - 1;
    let avg = volumes[last - period..last].iter().sum::<f64>() / period as f64;
    volumes[last] > avg * multiplier
}
