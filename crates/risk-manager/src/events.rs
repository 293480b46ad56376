//! Structured notifications emitted by the risk manager.
//!
//! Decision logic only produces [`RiskEvent`]s; an observer decides how (or
//! whether) to surface them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Something the risk manager wants the outside world to know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RiskEvent {
    /// Date rolled over; the daily record was reset.
    NewTradingDay {
        date: NaiveDate,
        start_equity: Decimal,
    },
    /// Running realised P&L after a recorded trade.
    DailyPnl { total_pnl: Decimal, equity: Decimal },
    /// Loss streak reached the limit; new entries are paused.
    CooldownStarted { consecutive_losses: u32 },
    /// Periodic reminder while a cooldown is running.
    CooldownRemaining { remaining_minutes: i64 },
    CooldownEnded,
    /// Daily loss limit breached; trading halted until the next day.
    DailyStopTriggered { total_pnl: Decimal, loss_limit: Decimal },
    /// Position sized within the margin cap.
    PositionSized {
        equity: Decimal,
        risk_amount: Decimal,
        notional: Decimal,
        size: Decimal,
        margin_required: Decimal,
    },
    /// Requested position needed too much margin and was reduced to the cap.
    PositionClamped {
        equity: Decimal,
        requested_margin: Decimal,
        max_margin: Decimal,
    },
}

/// Receives risk events.
#[cfg_attr(test, mockall::automock)]
pub trait RiskObserver: Send + Sync {
    fn on_event(&self, event: &RiskEvent);
}

/// Default observer: renders events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RiskObserver for TracingObserver {
    fn on_event(&self, event: &RiskEvent) {
        match event {
            RiskEvent::NewTradingDay { date, start_equity } => {
                info!(date = %date, start_equity = %start_equity, "New trading day, daily P&L and circuit breaker reset");
            }
            RiskEvent::DailyPnl { total_pnl, equity } => {
                info!(total_pnl = %total_pnl, equity = %equity, "Daily P&L updated");
            }
            RiskEvent::CooldownStarted { consecutive_losses } => {
                warn!(consecutive_losses = consecutive_losses, "Consecutive loss limit reached, entering cooldown");
            }
            RiskEvent::CooldownRemaining { remaining_minutes } => {
                info!(remaining_minutes = remaining_minutes, "Circuit breaker cooldown active");
            }
            RiskEvent::CooldownEnded => {
                info!("Circuit breaker cooldown ended, resuming trading");
            }
            RiskEvent::DailyStopTriggered { total_pnl, loss_limit } => {
                warn!(total_pnl = %total_pnl, loss_limit = %loss_limit, "Daily max loss reached, trading stopped for the day");
            }
            RiskEvent::PositionSized {
                equity,
                risk_amount,
                notional,
                size,
                margin_required,
            } => {
                info!(
                    equity = %equity,
                    risk_amount = %risk_amount,
                    notional = %notional,
                    size = %size,
                    margin_required = %margin_required,
                    "Position sized"
                );
            }
            RiskEvent::PositionClamped {
                equity,
                requested_margin,
                max_margin,
            } => {
                warn!(
                    equity = %equity,
                    requested_margin = %requested_margin,
                    max_margin = %max_margin,
                    "Position too large for margin cap, reducing"
                );
            }
        }
    }
}
