//! Shared handle for hosts that trade several instruments on one account.

use rust_decimal::Decimal;
use scalp_core::PositionSide;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::daily_state::{BreakerState, DailyState};
use crate::manager::RiskManager;
use crate::sizing::{PositionSizing, ProtectiveLevels};

/// Cloneable, task-safe wrapper around a [`RiskManager`].
///
/// Daily P&L, loss streak, and cooldown belong to the account, so every
/// instrument's updates are serialized through one lock.
#[derive(Clone)]
pub struct SharedRiskManager {
    inner: Arc<Mutex<RiskManager>>,
    /// Fast path flag for checking the daily stop.
    is_stopped: Arc<AtomicBool>,
}

impl SharedRiskManager {
    pub fn new(manager: RiskManager) -> Self {
        let stopped = manager.state().stopped;
        Self {
            inner: Arc::new(Mutex::new(manager)),
            is_stopped: Arc::new(AtomicBool::new(stopped)),
        }
    }

    /// Whether the daily stop is active (lock-free).
    pub fn is_stopped(&self) -> bool {
        self.is_stopped.load(Ordering::SeqCst)
    }

    pub async fn check_new_day(&self, equity: Decimal) {
        let mut manager = self.inner.lock().await;
        let was_stopped = manager.state().stopped;
        manager.check_new_day(equity);
        self.sync_flag(&manager);
        if was_stopped && !manager.state().stopped {
            info!("Daily stop lifted by date rollover");
        }
    }

    pub async fn record_pnl(&self, pnl: Decimal, equity: Decimal) -> BreakerState {
        let mut manager = self.inner.lock().await;
        let breaker = manager.record_pnl(pnl, equity);
        self.sync_flag(&manager);
        breaker
    }

    pub async fn can_trade(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.inner.lock().await.can_trade()
    }

    pub async fn breaker_state(&self) -> BreakerState {
        self.inner.lock().await.breaker_state()
    }

    /// Snapshot of the daily record.
    pub async fn state(&self) -> DailyState {
        self.inner.lock().await.state().clone()
    }

    pub async fn calc_position_size(&self, equity: Decimal, price: Decimal) -> PositionSizing {
        self.inner.lock().await.calc_position_size(equity, price)
    }

    pub async fn calc_sltp(&self, price: Decimal, side: PositionSide) -> ProtectiveLevels {
        self.inner.lock().await.calc_sltp(price, side)
    }

    pub async fn is_expired(&self, open_timestamp_ms: i64) -> bool {
        self.inner.lock().await.is_expired(open_timestamp_ms)
    }

    fn sync_flag(&self, manager: &RiskManager) {
        self.is_stopped
            .store(manager.state().stopped, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use scalp_core::RiskConfig;

    fn shared() -> (SharedRiskManager, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap());
        let manager = RiskManager::with_clock(RiskConfig::default(), Arc::new(clock.clone()));
        (SharedRiskManager::new(manager), clock)
    }

    #[tokio::test]
    async fn test_losses_from_all_instruments_share_one_streak() {
        let (risk, _clock) = shared();
        risk.check_new_day(Decimal::new(1000, 0)).await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let risk = risk.clone();
            handles.push(tokio::spawn(async move {
                risk.record_pnl(Decimal::new(-1, 0), Decimal::new(999, 0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(risk.state().await.consecutive_losses, 3);
        assert_eq!(risk.breaker_state().await, BreakerState::Cooldown);
        assert!(!risk.can_trade().await);
    }

    #[tokio::test]
    async fn test_stop_flag_follows_daily_state() {
        let (risk, clock) = shared();
        risk.check_new_day(Decimal::new(1000, 0)).await;
        assert!(!risk.is_stopped());

        risk.record_pnl(Decimal::new(-50, 0), Decimal::new(950, 0)).await;
        assert!(risk.is_stopped());
        assert!(!risk.can_trade().await);

        clock.advance(Duration::days(1));
        risk.check_new_day(Decimal::new(950, 0)).await;
        assert!(!risk.is_stopped());
        assert!(risk.can_trade().await);
    }

    #[test]
    fn test_sizing_through_shared_handle() {
        let (risk, _clock) = shared();
        let sizing = tokio_test::block_on(
            risk.calc_position_size(Decimal::new(500, 0), Decimal::new(67000, 0)),
        );
        assert_eq!(sizing.margin_required, Decimal::new(125, 0));
    }
}
