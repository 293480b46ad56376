//! Signal rules over the indicator snapshot.

use rayon::prelude::*;
use scalp_core::{Candle, PositionSide, SignalConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::indicators::{ema, prev_ema, rsi, volume_above_avg};

/// RSI level treated as a pullback inside an uptrend.
pub const RSI_DIP: f64 = 40.0;
/// RSI level treated as a bounce inside a downtrend.
pub const RSI_SPIKE: f64 = 60.0;

/// Discrete trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Long,
    Short,
    CloseLong,
    CloseShort,
    /// No action this cycle.
    #[serde(rename = "none")]
    Hold,
}

impl Signal {
    /// Side to open, for entry signals.
    pub fn entry_side(&self) -> Option<PositionSide> {
        match self {
            Signal::Long => Some(PositionSide::Long),
            Signal::Short => Some(PositionSide::Short),
            _ => None,
        }
    }

    /// Whether this signal asks to close a position on `side`.
    pub fn closes(&self, side: PositionSide) -> bool {
        matches!(
            (self, side),
            (Signal::CloseLong, PositionSide::Long) | (Signal::CloseShort, PositionSide::Short)
        )
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Long => "long",
            Signal::Short => "short",
            Signal::CloseLong => "close_long",
            Signal::CloseShort => "close_short",
            Signal::Hold => "none",
        };
        f.write_str(s)
    }
}

/// Indicator values the signal was derived from. `None` means not enough history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub prev_ema_fast: Option<f64>,
    pub prev_ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub vol_ok: bool,
    /// Last close in the window.
    pub price: Option<f64>,
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    pub signal: Signal,
    /// Human-readable justification; diagnostic only.
    pub reason: String,
    pub indicators: IndicatorSnapshot,
}

impl SignalOutput {
    fn new(signal: Signal, reason: String, indicators: IndicatorSnapshot) -> Self {
        Self {
            signal,
            reason,
            indicators,
        }
    }
}

/// Stateless signal engine.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Compute indicators for a candle window.
    pub fn indicators(&self, candles: &[Candle]) -> IndicatorSnapshot {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let cfg = &self.config;

        IndicatorSnapshot {
            ema_fast: ema(&closes, cfg.ema_fast),
            ema_slow: ema(&closes, cfg.ema_slow),
            prev_ema_fast: prev_ema(&closes, cfg.ema_fast),
            prev_ema_slow: prev_ema(&closes, cfg.ema_slow),
            rsi: rsi(&closes, cfg.rsi_period),
            vol_ok: volume_above_avg(&volumes, cfg.volume_period, cfg.volume_multiplier),
            price: closes.last().copied(),
        }
    }

    /// Evaluate the entry and exit rules in priority order; the first match wins.
    pub fn analyze(&self, candles: &[Candle]) -> SignalOutput {
        let indicators = self.indicators(candles);
        let output = self.decide(indicators);

        debug!(
            signal = %output.signal,
            reason = %output.reason,
            candles = candles.len(),
            "Signal evaluated"
        );

        output
    }

    /// Analyze several independent instruments in parallel.
    pub fn analyze_many(&self, windows: &[(String, Vec<Candle>)]) -> Vec<(String, SignalOutput)> {
        windows
            .par_iter()
            .map(|(symbol, candles)| (symbol.clone(), self.analyze(candles)))
            .collect()
    }

    fn decide(&self, indicators: IndicatorSnapshot) -> SignalOutput {
        let (ema_fast, ema_slow, prev_fast, prev_slow, rsi) = match (
            indicators.ema_fast,
            indicators.ema_slow,
            indicators.prev_ema_fast,
            indicators.prev_ema_slow,
            indicators.rsi,
        ) {
            (Some(f), Some(s), Some(pf), Some(ps), Some(r)) => (f, s, pf, ps, r),
            _ => {
                return SignalOutput::new(Signal::Hold, "insufficient data".to_string(), indicators)
            }
        };

        let cfg = &self.config;
        let bullish_cross = prev_fast <= prev_slow && ema_fast > ema_slow;
        let bearish_cross = prev_fast >= prev_slow && ema_fast < ema_slow;
        let uptrend = ema_fast > ema_slow;
        let downtrend = ema_fast < ema_slow;
        let vol_ok = indicators.vol_ok;

        let (signal, reason) = if bullish_cross && rsi < cfg.rsi_buy_max {
            (Signal::Long, format!("EMA cross up + RSI={:.1}", rsi))
        } else if bearish_cross && rsi > cfg.rsi_sell_min {
            (Signal::Short, format!("EMA cross down + RSI={:.1}", rsi))
        } else if rsi < cfg.rsi_buy_ideal && uptrend && vol_ok {
            (Signal::Long, format!("RSI oversold {:.1} + uptrend + vol", rsi))
        } else if rsi > cfg.rsi_sell_ideal && downtrend && vol_ok {
            (Signal::Short, format!("RSI overbought {:.1} + downtrend + vol", rsi))
        } else if rsi < RSI_DIP && uptrend {
            (Signal::Long, format!("RSI dip {:.1} in uptrend", rsi))
        } else if rsi > RSI_SPIKE && downtrend {
            (Signal::Short, format!("RSI spike {:.1} in downtrend", rsi))
        } else if downtrend && rsi > RSI_SPIKE {
            // Shadowed by the spike rule with the stock thresholds.
            (Signal::CloseLong, format!("Trend fading, RSI={:.1}", rsi))
        } else if uptrend && rsi < RSI_DIP {
            (Signal::CloseShort, format!("Trend reversing, RSI={:.1}", rsi))
        } else {
            (Signal::Hold, "no signal".to_string())
        };

        SignalOutput::new(signal, reason, indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| {
                Candle::new(i as i64 * 300_000, close, close, close, close, volume)
            })
            .collect()
    }

    fn flat_volume(closes: &[f64]) -> Vec<Candle> {
        window(closes, &vec![100.0; closes.len()])
    }

    fn spiked_volume(closes: &[f64]) -> Vec<Candle> {
        let mut volumes = vec![100.0; closes.len()];
        if let Some(last) = volumes.last_mut() {
            *last = 200.0;
        }
        window(closes, &volumes)
    }

    /// Trend-following configuration: EMA 5/20, RSI 5, volume 5 x 1.2.
    fn trend_engine() -> SignalEngine {
        SignalEngine::new(SignalConfig {
            ema_fast: 5,
            ema_slow: 20,
            rsi_period: 5,
            volume_period: 5,
            ..Default::default()
        })
    }

    /// Crossover configuration: EMA 2/6, RSI 14.
    fn cross_engine() -> SignalEngine {
        SignalEngine::new(SignalConfig {
            ema_fast: 2,
            ema_slow: 6,
            rsi_period: 14,
            volume_period: 5,
            ..Default::default()
        })
    }

    /// 100, 102, ..., 158 followed by `tail`.
    fn rising_then(tail: &[f64]) -> Vec<f64> {
        (0..30).map(|i| 100.0 + 2.0 * i as f64).chain(tail.iter().copied()).collect()
    }

    /// 200, 198, ..., 142 followed by `tail`.
    fn falling_then(tail: &[f64]) -> Vec<f64> {
        (0..30).map(|i| 200.0 - 2.0 * i as f64).chain(tail.iter().copied()).collect()
    }

    #[test]
    fn test_insufficient_data() {
        let engine = trend_engine();
        let output = engine.analyze(&flat_volume(&[100.0; 20]));
        assert_eq!(output.signal, Signal::Hold);
        assert_eq!(output.reason, "insufficient data");
        assert!(output.indicators.ema_fast.is_some());
        assert!(output.indicators.prev_ema_slow.is_none());
        assert_eq!(output.indicators.price, Some(100.0));
    }

    #[test]
    fn test_empty_window() {
        let output = trend_engine().analyze(&[]);
        assert_eq!(output.signal, Signal::Hold);
        assert_eq!(output.indicators, IndicatorSnapshot::default());
    }

    #[test]
    fn test_flat_market_is_no_signal() {
        // RSI is 100 with no losses, but there is no trend in either direction.
        let output = trend_engine().analyze(&flat_volume(&[100.0; 40]));
        assert_eq!(output.signal, Signal::Hold);
        assert_eq!(output.reason, "no signal");
        assert_eq!(output.indicators.rsi, Some(100.0));
    }

    #[test]
    fn test_crossover_outranks_rsi_dip() {
        // Steady decline then a jump on the last bar: fast EMA crosses above the
        // slow EMA while RSI (35.0) is also a dip in the new uptrend.
        let closes: Vec<f64> = (0..21).map(|i| 100.0 - i as f64).chain([87.0]).collect();
        let output = cross_engine().analyze(&flat_volume(&closes));

        let ind = output.indicators;
        assert!(ind.prev_ema_fast.unwrap() <= ind.prev_ema_slow.unwrap());
        assert!(ind.ema_fast.unwrap() > ind.ema_slow.unwrap());
        assert!(ind.rsi.unwrap() < RSI_DIP);

        assert_eq!(output.signal, Signal::Long);
        assert_eq!(output.reason, "EMA cross up + RSI=35.0");
    }

    #[test]
    fn test_bearish_crossover() {
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).chain([113.0]).collect();
        let output = cross_engine().analyze(&flat_volume(&closes));
        assert_eq!(output.signal, Signal::Short);
        assert_eq!(output.reason, "EMA cross down + RSI=65.0");
    }

    #[test]
    fn test_crossover_blocked_by_rsi_ceiling() {
        let engine = SignalEngine::new(SignalConfig {
            rsi_buy_max: 30.0,
            ..cross_engine().config().clone()
        });
        let closes: Vec<f64> = (0..21).map(|i| 100.0 - i as f64).chain([87.0]).collect();
        let output = engine.analyze(&flat_volume(&closes));
        // Falls through to the dip rule.
        assert_eq!(output.signal, Signal::Long);
        assert_eq!(output.reason, "RSI dip 35.0 in uptrend");
    }

    #[test]
    fn test_bearish_crossover_blocked_by_rsi_floor() {
        let engine = SignalEngine::new(SignalConfig {
            rsi_sell_min: 70.0,
            ..cross_engine().config().clone()
        });
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).chain([113.0]).collect();
        let output = engine.analyze(&flat_volume(&closes));
        // Falls through to the spike rule.
        assert_eq!(output.signal, Signal::Short);
        assert_eq!(output.reason, "RSI spike 65.0 in downtrend");
    }

    #[test]
    fn test_oversold_uptrend_with_volume() {
        let closes = rising_then(&[157.0, 156.0, 155.0, 156.0, 155.0]);
        let output = trend_engine().analyze(&spiked_volume(&closes));
        assert!(output.indicators.vol_ok);
        assert_eq!(output.signal, Signal::Long);
        assert_eq!(output.reason, "RSI oversold 20.0 + uptrend + vol");
    }

    #[test]
    fn test_oversold_uptrend_without_volume_is_dip() {
        let closes = rising_then(&[157.0, 156.0, 155.0, 156.0, 155.0]);
        let output = trend_engine().analyze(&flat_volume(&closes));
        assert!(!output.indicators.vol_ok);
        assert_eq!(output.signal, Signal::Long);
        assert_eq!(output.reason, "RSI dip 20.0 in uptrend");
    }

    #[test]
    fn test_dip_in_uptrend() {
        let closes = rising_then(&[156.0, 155.0, 154.0, 155.0, 156.0]);
        let output = trend_engine().analyze(&spiked_volume(&closes));
        assert_eq!(output.signal, Signal::Long);
        assert_eq!(output.reason, "RSI dip 33.3 in uptrend");
    }

    #[test]
    fn test_overbought_downtrend_with_volume() {
        let closes = falling_then(&[143.0, 144.0, 145.0, 144.0, 145.0]);
        let output = trend_engine().analyze(&spiked_volume(&closes));
        assert_eq!(output.signal, Signal::Short);
        assert_eq!(output.reason, "RSI overbought 80.0 + downtrend + vol");
    }

    #[test]
    fn test_spike_in_downtrend_wins_over_trend_fading_exit() {
        let closes = falling_then(&[143.0, 144.0, 145.0, 144.0, 145.0]);
        let output = trend_engine().analyze(&flat_volume(&closes));
        assert_eq!(output.signal, Signal::Short);
        assert_eq!(output.reason, "RSI spike 80.0 in downtrend");
    }

    #[test]
    fn test_signal_helpers() {
        assert_eq!(Signal::Long.entry_side(), Some(PositionSide::Long));
        assert_eq!(Signal::CloseLong.entry_side(), None);
        assert!(Signal::CloseShort.closes(PositionSide::Short));
        assert!(!Signal::CloseShort.closes(PositionSide::Long));
        assert_eq!(serde_json::to_string(&Signal::Hold).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&Signal::CloseLong).unwrap(), "\"close_long\"");
    }

    #[test]
    fn test_analyze_many_matches_single_analysis() {
        let engine = trend_engine();
        let up = spiked_volume(&rising_then(&[157.0, 156.0, 155.0, 156.0, 155.0]));
        let down = flat_volume(&falling_then(&[143.0, 144.0, 145.0, 144.0, 145.0]));
        let windows = vec![("BTC".to_string(), up.clone()), ("ETH".to_string(), down.clone())];

        let results = engine.analyze_many(&windows);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "BTC");
        assert_eq!(results[0].1, engine.analyze(&up));
        assert_eq!(results[1].1.signal, Signal::Short);
    }
}
