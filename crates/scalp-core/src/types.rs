//! Market data and position types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Wire form of a candle: `[timestamp, open, high, low, close, volume]`.
type CandleTuple = (i64, f64, f64, f64, f64, f64);

/// One OHLCV bar.
///
/// Serialized as a fixed-order six element array, the shape exchanges return
/// from their OHLCV endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "CandleTuple", into = "CandleTuple")]
pub struct Candle {
    /// Bar open time in epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<CandleTuple> for Candle {
    fn from((timestamp, open, high, low, close, volume): CandleTuple) -> Self {
        Self::new(timestamp, open, high, low, close, volume)
    }
}

impl From<Candle> for CandleTuple {
    fn from(c: Candle) -> Self {
        (c.timestamp, c.open, c.high, c.low, c.close, c.volume)
    }
}

/// Parse a JSON array of candles and check it is usable as an analysis window.
///
/// Timestamps must be non-decreasing and every value finite.
pub fn parse_candles(json: &str) -> Result<Vec<Candle>> {
    let candles: Vec<Candle> = serde_json::from_str(json)?;

    for (i, candle) in candles.iter().enumerate() {
        if !candle.is_finite() {
            return Err(Error::InvalidMarketData(format!(
                "candle {} at {} has a non-finite value",
                i, candle.timestamp
            )));
        }
        if i > 0 && candle.timestamp < candles[i - 1].timestamp {
            return Err(Error::InvalidMarketData(format!(
                "candle {} at {} is older than its predecessor",
                i, candle.timestamp
            )));
        }
    }

    Ok(candles)
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

impl FromStr for PositionSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(PositionSide::Long),
            "short" | "sell" => Ok(PositionSide::Short),
            other => Err(Error::InvalidMarketData(format!(
                "unknown position side: {}",
                other
            ))),
        }
    }
}
