//! Signal Engine
//!
//! Technical indicators over a candle window and the prioritised rules that turn
//! them into a trading signal. Everything here is pure; the engine holds only its
//! configuration and can be shared freely between instruments.

pub mod engine;
pub mod indicators;

pub use engine::{IndicatorSnapshot, Signal, SignalEngine, SignalOutput};
pub use indicators::{ema, prev_ema, rsi, volume_above_avg};
