//! Per-day account aggregate behind the circuit breaker.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Circuit breaker state derived from the daily record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// New positions may be opened.
    Trading,
    /// Paused after a loss streak until the cooldown window passes.
    Cooldown,
    /// Daily loss limit breached; only a new calendar day resumes trading.
    DailyStopped,
}

/// Daily P&L and loss-streak record for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyState {
    /// UTC date of the last equity check.
    pub date: NaiveDate,
    /// Equity at the first check of the day.
    pub start_equity: Option<Decimal>,
    /// Realised P&L recorded today.
    pub total_pnl: Decimal,
    /// Daily loss limit hit. Stays set until the date rolls over.
    pub stopped: bool,
    pub consecutive_losses: u32,
    pub last_loss_time: Option<DateTime<Utc>>,
    pub cooling_down: bool,
    /// Last time a cooldown status notice was emitted.
    pub last_cooldown_notice: Option<DateTime<Utc>>,
}

impl DailyState {
    /// Empty record for `date` with no starting equity yet.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            start_equity: None,
            total_pnl: Decimal::ZERO,
            stopped: false,
            consecutive_losses: 0,
            last_loss_time: None,
            cooling_down: false,
            last_cooldown_notice: None,
        }
    }

    /// Fresh record for a new trading day seeded with that day's equity.
    pub fn for_new_day(date: NaiveDate, start_equity: Decimal) -> Self {
        Self {
            start_equity: Some(start_equity),
            ..Self::new(date)
        }
    }

    /// Loss at which the daily stop trips, as a positive amount.
    pub fn loss_limit(&self, daily_max_loss: Decimal) -> Option<Decimal> {
        self.start_equity
            .filter(|equity| *equity > Decimal::ZERO)
            .map(|equity| equity * daily_max_loss)
    }

    /// Time left in the cooldown at `now`, if one is running.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        if !self.cooling_down {
            return None;
        }
        let last_loss = self.last_loss_time?;
        let elapsed = now - last_loss;
        if elapsed < cooldown {
            Some(cooldown - elapsed)
        } else {
            None
        }
    }

    /// Breaker state at `now`, without clearing an expired cooldown.
    pub fn breaker_state(&self, now: DateTime<Utc>, cooldown: Duration) -> BreakerState {
        if self.stopped {
            BreakerState::DailyStopped
        } else if self.cooldown_remaining(now, cooldown).is_some() {
            BreakerState::Cooldown
        } else {
            BreakerState::Trading
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn test_new_day_record_is_clean() {
        let state = DailyState::for_new_day(date(), Decimal::new(1000, 0));
        assert_eq!(state.start_equity, Some(Decimal::new(1000, 0)));
        assert_eq!(state.total_pnl, Decimal::ZERO);
        assert!(!state.stopped);
        assert!(!state.cooling_down);
        assert_eq!(state.consecutive_losses, 0);
    }

    #[test]
    fn test_loss_limit() {
        let state = DailyState::for_new_day(date(), Decimal::new(1000, 0));
        assert_eq!(state.loss_limit(Decimal::new(5, 2)), Some(Decimal::new(50, 0)));
        assert_eq!(DailyState::new(date()).loss_limit(Decimal::new(5, 2)), None);
        let zero = DailyState::for_new_day(date(), Decimal::ZERO);
        assert_eq!(zero.loss_limit(Decimal::new(5, 2)), None);
    }

    #[test]
    fn test_breaker_state_precedence() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut state = DailyState::new(date());
        assert_eq!(state.breaker_state(now, Duration::hours(2)), BreakerState::Trading);

        state.cooling_down = true;
        state.last_loss_time = Some(now - Duration::minutes(30));
        assert_eq!(state.breaker_state(now, Duration::hours(2)), BreakerState::Cooldown);
        assert_eq!(
            state.cooldown_remaining(now, Duration::hours(2)),
            Some(Duration::minutes(90))
        );

        state.stopped = true;
        assert_eq!(state.breaker_state(now, Duration::hours(2)), BreakerState::DailyStopped);
    }

    #[test]
    fn test_expired_cooldown_reads_as_trading() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut state = DailyState::new(date());
        state.cooling_down = true;
        state.last_loss_time = Some(now - Duration::hours(2));
        assert_eq!(state.cooldown_remaining(now, Duration::hours(2)), None);
        assert_eq!(state.breaker_state(now, Duration::hours(2)), BreakerState::Trading);
    }
}
