//! Risk Manager
//!
//! Daily loss limit, consecutive-loss cooldown, position sizing, protective
//! price levels, and position expiry for a single trading account.

pub mod clock;
pub mod daily_state;
pub mod events;
pub mod manager;
pub mod shared;
pub mod sizing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use daily_state::{BreakerState, DailyState};
pub use events::{RiskEvent, RiskObserver, TracingObserver};
pub use manager::RiskManager;
pub use shared::SharedRiskManager;
pub use sizing::{PositionSizing, ProtectiveLevels};
