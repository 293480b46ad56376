//! Account-level risk gate: daily loss limit, loss-streak cooldown, sizing.

use chrono::Duration;
use rust_decimal::Decimal;
use scalp_core::{PositionSide, RiskConfig};
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::daily_state::{BreakerState, DailyState};
use crate::events::{RiskEvent, RiskObserver, TracingObserver};
use crate::sizing::{size_position, PositionSizing, ProtectiveLevels};

/// Risk manager for one trading account.
///
/// Owns the account's [`DailyState`]. Every instrument traded on the account
/// must go through the same instance (see [`crate::SharedRiskManager`]).
pub struct RiskManager {
    config: RiskConfig,
    state: DailyState,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn RiskObserver>,
}

impl RiskManager {
    /// Create a risk manager on the system clock, logging events via `tracing`.
    pub fn new(config: RiskConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a risk manager on a custom clock.
    pub fn with_clock(config: RiskConfig, clock: Arc<dyn Clock>) -> Self {
        let state = DailyState::new(clock.today());
        Self {
            config,
            state,
            clock,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn RiskObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Current daily record.
    pub fn state(&self) -> &DailyState {
        &self.state
    }

    /// Reset the daily record when the calendar date has changed, seeding the
    /// new day's starting equity. On the very first call, only seeds the equity.
    /// A missing or non-positive starting equity is re-seeded on each call.
    pub fn check_new_day(&mut self, equity: Decimal) {
        let today = self.clock.today();
        if today != self.state.date {
            self.state = DailyState::for_new_day(today, equity);
            self.emit(RiskEvent::NewTradingDay {
                date: today,
                start_equity: equity,
            });
        }
        if self.state.start_equity.map_or(true, |e| e <= Decimal::ZERO) {
            self.state.start_equity = Some(equity);
        }
    }

    /// Record the realised P&L of a closed trade and update the breakers.
    pub fn record_pnl(&mut self, pnl: Decimal, equity: Decimal) -> BreakerState {
        let now = self.clock.now();
        self.state.total_pnl = self.state.total_pnl.saturating_add(pnl);

        if pnl > Decimal::ZERO {
            self.state.consecutive_losses = 0;
            self.state.cooling_down = false;
        } else {
            self.state.consecutive_losses += 1;
            self.state.last_loss_time = Some(now);

            if self.state.consecutive_losses >= self.config.consecutive_loss_limit {
                self.state.cooling_down = true;
                self.state.last_cooldown_notice = None;
                self.emit(RiskEvent::CooldownStarted {
                    consecutive_losses: self.state.consecutive_losses,
                });
            }
        }

        self.emit(RiskEvent::DailyPnl {
            total_pnl: self.state.total_pnl,
            equity,
        });

        if let Some(loss_limit) = self.state.loss_limit(self.config.daily_max_loss) {
            if !self.state.stopped && self.state.total_pnl <= -loss_limit {
                self.state.stopped = true;
                self.emit(RiskEvent::DailyStopTriggered {
                    total_pnl: self.state.total_pnl,
                    loss_limit,
                });
            }
        }

        let breaker = self.breaker_state();
        debug!(
            pnl = %pnl,
            total_pnl = %self.state.total_pnl,
            consecutive_losses = self.state.consecutive_losses,
            breaker = ?breaker,
            "Trade result recorded"
        );
        breaker
    }

    /// Whether a new position may be opened now. Clears an expired cooldown.
    pub fn can_trade(&mut self) -> bool {
        if self.state.stopped {
            return false;
        }

        if !self.state.cooling_down {
            return true;
        }

        let now = self.clock.now();
        if let Some(remaining) = self.state.cooldown_remaining(now, self.config.cooldown()) {
            let notice_due = self
                .state
                .last_cooldown_notice
                .map_or(true, |at| now - at >= self.config.cooldown_notice_interval());
            if notice_due {
                self.state.last_cooldown_notice = Some(now);
                self.emit(RiskEvent::CooldownRemaining {
                    remaining_minutes: ceil_minutes(remaining),
                });
            }
            return false;
        }

        self.state.cooling_down = false;
        self.state.last_cooldown_notice = None;
        self.emit(RiskEvent::CooldownEnded);
        true
    }

    /// Current breaker state, without side effects.
    pub fn breaker_state(&self) -> BreakerState {
        self.state
            .breaker_state(self.clock.now(), self.config.cooldown())
    }

    /// Size a position for `equity` at `price`.
    pub fn calc_position_size(&self, equity: Decimal, price: Decimal) -> PositionSizing {
        let breakdown = size_position(&self.config, equity, price);

        if breakdown.clamped {
            self.emit(RiskEvent::PositionClamped {
                equity,
                requested_margin: breakdown.requested_margin,
                max_margin: breakdown.max_margin,
            });
        } else {
            self.emit(RiskEvent::PositionSized {
                equity,
                risk_amount: breakdown.risk_amount,
                notional: breakdown.notional,
                size: breakdown.sizing.size,
                margin_required: breakdown.sizing.margin_required,
            });
        }

        breakdown.sizing
    }

    /// Stop-loss and take-profit for an entry at `price`.
    pub fn calc_sltp(&self, price: Decimal, side: PositionSide) -> ProtectiveLevels {
        ProtectiveLevels::for_entry(&self.config, price, side)
    }

    /// Whether a position opened at `open_timestamp_ms` has exceeded the max hold time.
    pub fn is_expired(&self, open_timestamp_ms: i64) -> bool {
        self.clock
            .now()
            .timestamp_millis()
            .saturating_sub(open_timestamp_ms)
            > self.config.max_hold_ms
    }

    fn emit(&self, event: RiskEvent) {
        self.observer.on_event(&event);
    }
}

fn ceil_minutes(d: Duration) -> i64 {
    (d.num_milliseconds() + 59_999) / 60_000
}
