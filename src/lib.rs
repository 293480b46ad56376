//! Scalp-Bot: signal and risk decision core for a perpetual-futures scalping agent
//!
//! This is the root crate that provides benchmark and integration-test access to
//! the workspace members. For actual functionality, use the individual crates:
//!
//! - `scalp-core`: Candle and side types, strategy configuration, errors
//! - `signal-engine`: EMA/RSI/volume indicators and signal rules
//! - `risk-manager`: Daily stop, loss-streak cooldown, sizing, protective levels
//! - `scalp-agent`: Per-cycle decisions and the `scalp-eval` CLI

pub use risk_manager as risk;
pub use scalp_agent as agent;
pub use scalp_core as core;
pub use signal_engine as signal;
