//! Configuration management for the scalping decision core.
//!
//! Both engines receive their section of [`StrategyConfig`] at construction, so
//! several instruments or accounts can run with different parameters side by side.

use chrono::Duration;
use config::builder::DefaultState;
use config::ConfigBuilder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::{Error, Result};

/// Prefix for layered environment overrides, e.g. `SCALP__RISK__LEVERAGE=5`.
pub const ENV_PREFIX: &str = "SCALP";

/// Complete strategy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub signal: SignalConfig,
    pub risk: RiskConfig,
    pub market: MarketConfig,
}

/// Indicator periods and RSI thresholds for the signal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Fast EMA period.
    pub ema_fast: usize,
    /// Slow EMA period.
    pub ema_slow: usize,
    pub rsi_period: usize,
    /// Upper RSI bound for a long on a bullish crossover.
    pub rsi_buy_max: f64,
    /// RSI below which an uptrend with volume is a long.
    pub rsi_buy_ideal: f64,
    /// Lower RSI bound for a short on a bearish crossover.
    pub rsi_sell_min: f64,
    /// RSI above which a downtrend with volume is a short.
    pub rsi_sell_ideal: f64,
    /// Number of prior bars averaged for volume confirmation.
    pub volume_period: usize,
    /// Last volume must exceed this multiple of the average.
    pub volume_multiplier: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            ema_fast: 21,
            ema_slow: 50,
            rsi_period: 14,
            rsi_buy_max: 45.0,
            rsi_buy_ideal: 30.0,
            rsi_sell_min: 55.0,
            rsi_sell_ideal: 70.0,
            volume_period: 20,
            volume_multiplier: 1.2,
        }
    }
}

/// Account-level risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade (e.g., 0.02 = 2%).
    pub max_risk_per_trade: Decimal,
    /// Fraction of the day's starting equity that may be lost before halting.
    pub daily_max_loss: Decimal,
    /// Stop-loss distance as a fraction of entry price.
    pub stop_loss_pct: Decimal,
    /// Take-profit distance as a fraction of entry price.
    pub take_profit_pct: Decimal,
    pub leverage: Decimal,
    /// Maximum fraction of equity a single position may post as margin.
    pub margin_cap: Decimal,
    /// Maximum time a position may stay open, in milliseconds.
    pub max_hold_ms: i64,
    /// Consecutive non-winning trades that start a cooldown.
    pub consecutive_loss_limit: u32,
    /// Cooldown length after a loss streak, in minutes.
    pub cooldown_minutes: i64,
    /// Minimum spacing between cooldown status notices, in minutes.
    pub cooldown_notice_minutes: i64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: Decimal::new(2, 2), // 2%
            daily_max_loss: Decimal::new(5, 2),     // 5%
            stop_loss_pct: Decimal::new(8, 3),      // 0.8%
            take_profit_pct: Decimal::new(16, 3),   // 1.6%
            leverage: Decimal::new(10, 0),
            margin_cap: Decimal::new(8, 1), // 80% of equity
            max_hold_ms: 24 * 60 * 60 * 1000,
            consecutive_loss_limit: 3,
            cooldown_minutes: 120,
            cooldown_notice_minutes: 30,
        }
    }
}

impl RiskConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }

    pub fn cooldown_notice_interval(&self) -> Duration {
        Duration::minutes(self.cooldown_notice_minutes)
    }

    pub fn max_hold(&self) -> Duration {
        Duration::milliseconds(self.max_hold_ms)
    }
}

/// Instruments and candle window handed to the agent by its data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub pairs: Vec<String>,
    pub timeframe: String,
    /// Number of most recent candles analysed per cycle.
    pub candle_limit: usize,
    /// Decisions are produced but never routed to an exchange.
    pub dry_run: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            pairs: vec![
                "BTC/USDC:USDC".to_string(),
                "ETH/USDC:USDC".to_string(),
                "SOL/USDC:USDC".to_string(),
            ],
            timeframe: "5m".to_string(),
            candle_limit: 100,
            dry_run: true,
        }
    }
}

impl StrategyConfig {
    /// Load configuration from individual environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let signal_defaults = SignalConfig::default();
        let risk_defaults = RiskConfig::default();
        let market_defaults = MarketConfig::default();

        let config = Self {
            signal: SignalConfig {
                ema_fast: env_or("EMA_FAST", signal_defaults.ema_fast),
                ema_slow: env_or("EMA_SLOW", signal_defaults.ema_slow),
                rsi_period: env_or("RSI_PERIOD", signal_defaults.rsi_period),
                rsi_buy_max: env_or("RSI_BUY_MAX", signal_defaults.rsi_buy_max),
                rsi_buy_ideal: env_or("RSI_BUY_IDEAL", signal_defaults.rsi_buy_ideal),
                rsi_sell_min: env_or("RSI_SELL_MIN", signal_defaults.rsi_sell_min),
                rsi_sell_ideal: env_or("RSI_SELL_IDEAL", signal_defaults.rsi_sell_ideal),
                volume_period: env_or("VOLUME_PERIOD", signal_defaults.volume_period),
                volume_multiplier: env_or("VOLUME_MULTIPLIER", signal_defaults.volume_multiplier),
            },
            risk: RiskConfig {
                max_risk_per_trade: env_or("MAX_RISK_PER_TRADE", risk_defaults.max_risk_per_trade),
                daily_max_loss: env_or("DAILY_MAX_LOSS", risk_defaults.daily_max_loss),
                stop_loss_pct: env_or("STOP_LOSS_PCT", risk_defaults.stop_loss_pct),
                take_profit_pct: env_or("TAKE_PROFIT_PCT", risk_defaults.take_profit_pct),
                leverage: env_or("LEVERAGE", risk_defaults.leverage),
                margin_cap: env_or("MARGIN_CAP", risk_defaults.margin_cap),
                max_hold_ms: env_or("MAX_HOLD_MS", risk_defaults.max_hold_ms),
                consecutive_loss_limit: env_or(
                    "CONSECUTIVE_LOSS_LIMIT",
                    risk_defaults.consecutive_loss_limit,
                ),
                cooldown_minutes: env_or("COOLDOWN_MINUTES", risk_defaults.cooldown_minutes),
                cooldown_notice_minutes: env_or(
                    "COOLDOWN_NOTICE_MINUTES",
                    risk_defaults.cooldown_notice_minutes,
                ),
            },
            market: MarketConfig {
                pairs: env::var("PAIRS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(|p| p.trim().to_string())
                            .filter(|p| !p.is_empty())
                            .collect()
                    })
                    .unwrap_or(market_defaults.pairs),
                timeframe: env::var("TIMEFRAME").unwrap_or(market_defaults.timeframe),
                candle_limit: env_or("CANDLE_LIMIT", market_defaults.candle_limit),
                dry_run: env::var("DRY_RUN")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(market_defaults.dry_run),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Load layered configuration: defaults, then an optional file (TOML, JSON,
    /// or YAML by extension), then `SCALP__<SECTION>__<FIELD>` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("market.pairs"),
        );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.signal;
        if s.ema_fast == 0 || s.ema_slow == 0 || s.rsi_period == 0 || s.volume_period == 0 {
            return Err(Error::config("indicator periods must be positive"));
        }
        if s.ema_fast >= s.ema_slow {
            return Err(Error::config(format!(
                "ema_fast ({}) must be shorter than ema_slow ({})",
                s.ema_fast, s.ema_slow
            )));
        }
        for (name, value) in [
            ("rsi_buy_max", s.rsi_buy_max),
            ("rsi_buy_ideal", s.rsi_buy_ideal),
            ("rsi_sell_min", s.rsi_sell_min),
            ("rsi_sell_ideal", s.rsi_sell_ideal),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::config(format!("{} must be within [0, 100], got {}", name, value)));
            }
        }
        if !s.volume_multiplier.is_finite() || s.volume_multiplier < 0.0 {
            return Err(Error::config("volume_multiplier must be a non-negative number"));
        }

        let r = &self.risk;
        for (name, value) in [
            ("max_risk_per_trade", r.max_risk_per_trade),
            ("daily_max_loss", r.daily_max_loss),
            ("stop_loss_pct", r.stop_loss_pct),
            ("margin_cap", r.margin_cap),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(Error::config(format!("{} must be within (0, 1], got {}", name, value)));
            }
        }
        if r.take_profit_pct <= Decimal::ZERO {
            return Err(Error::config("take_profit_pct must be positive"));
        }
        if r.leverage <= Decimal::ZERO {
            return Err(Error::config("leverage must be positive"));
        }
        if r.max_hold_ms <= 0 {
            return Err(Error::config("max_hold_ms must be positive"));
        }
        if r.consecutive_loss_limit == 0 {
            return Err(Error::config("consecutive_loss_limit must be at least 1"));
        }
        if r.cooldown_minutes < 0 || r.cooldown_notice_minutes <= 0 {
            return Err(Error::config(
                "cooldown_minutes must be non-negative and cooldown_notice_minutes positive",
            ));
        }

        if self.market.candle_limit == 0 {
            return Err(Error::config("candle_limit must be positive"));
        }
        if self.market.candle_limit <= s.ema_slow {
            warn!(
                candle_limit = self.market.candle_limit,
                ema_slow = s.ema_slow,
                "Candle window too short for the slow EMA; every cycle will report insufficient data"
            );
        }

        Ok(())
    }

    /// Configuration for tests and replays with short warm-up periods.
    pub fn fast_test_config() -> Self {
        Self {
            signal: SignalConfig {
                ema_fast: 5,
                ema_slow: 20,
                rsi_period: 5,
                volume_period: 5,
                ..Default::default()
            },
            risk: RiskConfig::default(),
            market: MarketConfig {
                candle_limit: 100,
                ..Default::default()
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
