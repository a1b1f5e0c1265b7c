//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (deposit/withdrawal requests, transfers, admin updates), keeping call sites
//! readable and avoiding long argument lists.

use rust_decimal::Decimal;

use crate::{FeeSchedule, Money};

/// Request a deposit through a payment method.
#[derive(Clone, Debug)]
pub struct DepositCmd {
    pub amount: Money,
    pub currency: String,
    pub method: String,
    pub description: Option<String>,
}

impl DepositCmd {
    #[must_use]
    pub fn new(amount: Money, currency: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            method: method.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request a withdrawal through a payment method.
#[derive(Clone, Debug)]
pub struct WithdrawalCmd {
    pub amount: Money,
    pub currency: String,
    pub method: String,
    /// Where the money goes (account number, wallet handle, ...).
    pub destination: Option<String>,
    pub description: Option<String>,
}

impl WithdrawalCmd {
    #[must_use]
    pub fn new(amount: Money, currency: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            method: method.into(),
            destination: None,
            description: None,
        }
    }

    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Move funds from the caller to another user.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub to: String,
    pub amount: Money,
    pub currency: String,
    pub description: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(to: impl Into<String>, amount: Money, currency: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            amount,
            currency: currency.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a currency. `None` fields are left unchanged.
///
/// A currency's `decimals` never change once it exists.
#[derive(Clone, Debug, Default)]
pub struct CurrencyUpdate {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub enabled: Option<bool>,
}

impl CurrencyUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.symbol.is_none()
            && self.description.is_none()
            && self.exchange_rate.is_none()
            && self.enabled.is_none()
    }
}

/// Partial update of a payment method. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct PaymentMethodUpdate {
    pub name: Option<String>,
    pub fees: Option<FeeSchedule>,
    pub min_amount: Option<Money>,
    pub account_details: Option<String>,
    pub enabled: Option<bool>,
}
