//! Position sizing and protective price levels.

use rust_decimal::{Decimal, RoundingStrategy};
use scalp_core::{PositionSide, RiskConfig};
use serde::{Deserialize, Serialize};

const SIZE_DP: u32 = 6;
const MARGIN_DP: u32 = 2;

/// Position size in base units and the margin it ties up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionSizing {
    /// Rounded to 6 decimal places.
    pub size: Decimal,
    /// Rounded to 2 decimal places.
    pub margin_required: Decimal,
}

/// Intermediate amounts behind a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingBreakdown {
    pub sizing: PositionSizing,
    pub risk_amount: Decimal,
    /// Notional that risks exactly `risk_amount` at the stop.
    pub notional: Decimal,
    /// Margin before the cap was applied.
    pub requested_margin: Decimal,
    /// Largest margin allowed for this equity.
    pub max_margin: Decimal,
    pub clamped: bool,
}

/// Size a position so that hitting the stop loses `max_risk_per_trade` of
/// equity, capped so margin never exceeds `margin_cap` of equity.
///
/// Non-positive equity or price yields a zero sizing.
pub fn size_position(config: &RiskConfig, equity: Decimal, price: Decimal) -> SizingBreakdown {
    if equity <= Decimal::ZERO || price <= Decimal::ZERO {
        return SizingBreakdown {
            sizing: PositionSizing::default(),
            risk_amount: Decimal::ZERO,
            notional: Decimal::ZERO,
            requested_margin: Decimal::ZERO,
            max_margin: Decimal::ZERO,
            clamped: false,
        };
    }

    let risk_amount = equity.saturating_mul(config.max_risk_per_trade);
    let notional = risk_amount
        .checked_div(config.stop_loss_pct)
        .unwrap_or(Decimal::MAX);
    let requested_margin = notional
        .checked_div(config.leverage)
        .unwrap_or(Decimal::MAX);
    let max_margin = equity.saturating_mul(config.margin_cap);

    // Rounding must not lift the margin over the cap.
    let margin_ceiling = max_margin.round_dp_with_strategy(MARGIN_DP, RoundingStrategy::ToZero);
    let margin = round(requested_margin, MARGIN_DP);

    let (size, margin, clamped) = if requested_margin > max_margin || margin > margin_ceiling {
        let adjusted_notional = margin_ceiling.saturating_mul(config.leverage);
        (adjusted_notional.checked_div(price), margin_ceiling, true)
    } else {
        (notional.checked_div(price), margin, false)
    };

    SizingBreakdown {
        sizing: PositionSizing {
            size: round(size.unwrap_or(Decimal::ZERO), SIZE_DP),
            margin_required: margin,
        },
        risk_amount,
        notional,
        requested_margin,
        max_margin,
        clamped,
    }
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Stop-loss and take-profit prices for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectiveLevels {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl ProtectiveLevels {
    /// Levels for an entry at `price`: stop below and target above for a long,
    /// mirrored for a short.
    pub fn for_entry(config: &RiskConfig, price: Decimal, side: PositionSide) -> Self {
        match side {
            PositionSide::Long => Self {
                stop_loss: price.saturating_mul(Decimal::ONE - config.stop_loss_pct),
                take_profit: price.saturating_mul(Decimal::ONE + config.take_profit_pct),
            },
            PositionSide::Short => Self {
                stop_loss: price.saturating_mul(Decimal::ONE + config.stop_loss_pct),
                take_profit: price.saturating_mul(Decimal::ONE - config.take_profit_pct),
            },
        }
    }
}
