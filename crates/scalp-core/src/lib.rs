//! Scalp Core Library
//!
//! Shared types, configuration, and errors for the signal engine, risk manager,
//! and the agent that combines them.

pub mod config;
pub mod error;
pub mod types;

pub use config::{MarketConfig, RiskConfig, SignalConfig, StrategyConfig};
pub use error::{Error, Result};
pub use types::{Candle, PositionSide};
