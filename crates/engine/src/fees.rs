//! Fee and total calculator for deposit/withdrawal forms.
//!
//! Pure functions: no I/O, no clock.
//!
//! ```text
//! fee            = max(fixed, amount * percent / 100)   (0 when amount is 0)
//! deposit total  = amount + fee
//! withdraw total = max(amount - fee, 0)
//! ```
//!
//! Inputs are clamped rather than rejected: a negative amount, percent or
//! fixed fee counts as zero, so a quote can always be shown.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// Highest fee percentage a payment method may charge.
pub const MAX_FEE_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Direction of a quoted movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeDirection {
    Deposit,
    Withdrawal,
}

/// Fee parameters of a payment method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Percentage of the amount, e.g. `1.5` for 1.5%.
    pub percent: Decimal,
    /// Minimum fee in minor units.
    pub fixed: Money,
}

impl FeeSchedule {
    pub fn percent(percent: Decimal) -> Self {
        Self {
            percent,
            fixed: Money::ZERO,
        }
    }

    /// Both parts must be non-negative and the percent at most
    /// [`MAX_FEE_PERCENT`].
    pub fn validate(&self) -> ResultEngine<()> {
        if self.percent < Decimal::ZERO || self.fixed.is_negative() {
            return Err(EngineError::InvalidAmount("fees must be >= 0".to_string()));
        }
        if self.percent > MAX_FEE_PERCENT {
            return Err(EngineError::InvalidAmount(format!(
                "fee percent must be <= {MAX_FEE_PERCENT}"
            )));
        }
        Ok(())
    }

    /// Fee charged on `amount` (minor units).
    pub fn fee(&self, amount: Money) -> Money {
        let amount = clamp_non_negative(amount);
        if amount.is_zero() {
            return Money::ZERO;
        }
        let percent = self.percent.max(Decimal::ZERO);
        // Out of range fees saturate.
        let pct_fee = Decimal::from(amount.minor())
            .checked_mul(percent)
            .and_then(|fee| fee.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|fee| {
                fee.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
            })
            .map_or(Money::new(i64::MAX), Money::new);
        pct_fee.max(clamp_non_negative(self.fixed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub amount: Money,
    pub fee: Money,
    /// What the user pays (deposit) or receives (withdrawal).
    pub total: Money,
}

/// Quotes the fee and total for `amount` under `schedule`.
pub fn quote(amount: Money, schedule: &FeeSchedule, direction: FeeDirection) -> FeeQuote {
    let amount = clamp_non_negative(amount);
    let fee = schedule.fee(amount);
    let total = match direction {
        FeeDirection::Deposit => amount.checked_add(fee).unwrap_or(Money::new(i64::MAX)),
        FeeDirection::Withdrawal => clamp_non_negative(amount - fee),
    };
    FeeQuote { amount, fee, total }
}

/// Interprets raw form input as an amount; anything that is not a
/// non-negative number with at most `decimals` fraction digits becomes 0.
pub fn clamp_amount_input(raw: &str, decimals: u8) -> Money {
    Money::parse(raw, decimals)
        .map(clamp_non_negative)
        .unwrap_or(Money::ZERO)
}

fn clamp_non_negative(amount: Money) -> Money {
    amount.max(Money::ZERO)
}
