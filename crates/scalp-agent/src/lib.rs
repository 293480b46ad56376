//! Scalp Agent
//!
//! One evaluation cycle of the trading agent: gate on the risk manager, read the
//! signal, and turn an entry into a sized order plan with protective levels.
//! Execution of the plan is left to the caller.

use risk_manager::{BreakerState, RiskManager};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use scalp_core::{Candle, PositionSide, StrategyConfig};
use serde::{Deserialize, Serialize};
use signal_engine::{IndicatorSnapshot, SignalEngine, SignalOutput};
use tracing::{debug, info};

/// A position the caller currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: PositionSide,
    /// Open time in epoch milliseconds.
    pub opened_at_ms: i64,
}

/// Parameters for an order the caller should place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub margin_required: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub reason: String,
    pub indicators: IndicatorSnapshot,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CycleDecision {
    /// Open a new position.
    Enter { plan: OrderPlan },
    /// Close the open position.
    Exit { side: PositionSide, reason: String },
    /// Do nothing this cycle.
    Hold { reason: String },
    /// New entries are not permitted right now.
    Halted { breaker: BreakerState },
}

/// Why an entry signal did not become an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EntryRejected {
    #[error("no usable entry price")]
    NoPrice,
    #[error("position size rounds to zero")]
    ZeroSize,
}

/// Signal engine and risk manager for one account.
pub struct DecisionCore {
    engine: SignalEngine,
    risk: RiskManager,
    candle_limit: usize,
}

impl DecisionCore {
    pub fn new(config: &StrategyConfig) -> Self {
        Self::with_risk_manager(config, RiskManager::new(config.risk.clone()))
    }

    /// Use a pre-built risk manager (custom clock or observer).
    pub fn with_risk_manager(config: &StrategyConfig, risk: RiskManager) -> Self {
        Self {
            engine: SignalEngine::new(config.signal.clone()),
            risk,
            candle_limit: config.market.candle_limit,
        }
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    /// Forward the realised P&L of a closed trade to the risk manager.
    pub fn record_closed_trade(&mut self, pnl: Decimal, equity: Decimal) -> BreakerState {
        self.risk.check_new_day(equity);
        self.risk.record_pnl(pnl, equity)
    }

    /// Run one decision cycle over the latest candles.
    ///
    /// Exits are evaluated even while the breakers block new entries.
    pub fn evaluate(
        &mut self,
        candles: &[Candle],
        equity: Decimal,
        position: Option<&OpenPosition>,
    ) -> CycleDecision {
        self.risk.check_new_day(equity);

        let start = candles.len().saturating_sub(self.candle_limit);
        let window = &candles[start..];

        let decision = match position {
            Some(position) => self.evaluate_open(window, position),
            None => self.evaluate_flat(window, equity),
        };

        debug!(decision = ?decision, "Cycle evaluated");
        decision
    }

    fn evaluate_open(&self, window: &[Candle], position: &OpenPosition) -> CycleDecision {
        if self.risk.is_expired(position.opened_at_ms) {
            return CycleDecision::Exit {
                side: position.side,
                reason: "max hold time exceeded".to_string(),
            };
        }

        let output = self.engine.analyze(window);
        if output.signal.closes(position.side) {
            CycleDecision::Exit {
                side: position.side,
                reason: output.reason,
            }
        } else {
            CycleDecision::Hold {
                reason: output.reason,
            }
        }
    }

    fn evaluate_flat(&mut self, window: &[Candle], equity: Decimal) -> CycleDecision {
        if !self.risk.can_trade() {
            return CycleDecision::Halted {
                breaker: self.risk.breaker_state(),
            };
        }

        let output = self.engine.analyze(window);
        let side = match output.signal.entry_side() {
            Some(side) => side,
            None => {
                return CycleDecision::Hold {
                    reason: output.reason,
                }
            }
        };

        match self.plan_entry(side, output, equity) {
            Ok(plan) => {
                info!(
                    side = %plan.side,
                    entry_price = %plan.entry_price,
                    size = %plan.size,
                    stop_loss = %plan.stop_loss,
                    take_profit = %plan.take_profit,
                    reason = %plan.reason,
                    "Entry planned"
                );
                CycleDecision::Enter { plan }
            }
            Err(rejected) => CycleDecision::Hold {
                reason: rejected.to_string(),
            },
        }
    }

    fn plan_entry(
        &self,
        side: PositionSide,
        output: SignalOutput,
        equity: Decimal,
    ) -> Result<OrderPlan, EntryRejected> {
        let entry_price = output
            .indicators
            .price
            .and_then(Decimal::from_f64)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or(EntryRejected::NoPrice)?;

        let sizing = self.risk.calc_position_size(equity, entry_price);
        if sizing.size <= Decimal::ZERO {
            return Err(EntryRejected::ZeroSize);
        }

        let levels = self.risk.calc_sltp(entry_price, side);

        Ok(OrderPlan {
            side,
            entry_price,
            size: sizing.size,
            margin_required: sizing.margin_required,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            reason: output.reason,
            indicators: output.indicators,
        })
    }
}
