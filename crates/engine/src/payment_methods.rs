//! Deposit/withdrawal rails (InstaPay, Vodafone Cash, PayPal, ...).

use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, FeeSchedule, Money, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub fees: FeeSchedule,
    pub min_amount: Money,
    pub account_details: Option<String>,
    pub enabled: bool,
}

impl PaymentMethod {
    /// Builds a validated payment method. The id is a lower-case slug.
    pub fn new(
        id: &str,
        name: &str,
        fees: FeeSchedule,
        min_amount: Money,
        account_details: Option<String>,
    ) -> ResultEngine<Self> {
        let id = id.trim().to_ascii_lowercase();
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(EngineError::InvalidId(format!(
                "invalid payment method id: {id}"
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidAmount(
                "payment method name must not be empty".to_string(),
            ));
        }
        fees.validate()?;
        if min_amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "minimum amount must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            fees,
            min_amount,
            account_details,
            enabled: true,
        })
    }

    /// Checks an amount against the method's minimum.
    pub fn check_amount(&self, amount: Money) -> ResultEngine<()> {
        if amount < self.min_amount {
            return Err(EngineError::InvalidAmount(format!(
                "minimum amount for {} is {}",
                self.name, self.min_amount
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub fee_percent: String,
    pub fixed_fee_minor: i64,
    pub min_amount_minor: i64,
    pub account_details: Option<String>,
    pub enabled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PaymentMethod> for ActiveModel {
    fn from(value: &PaymentMethod) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            fee_percent: ActiveValue::Set(value.fees.percent.normalize().to_string()),
            fixed_fee_minor: ActiveValue::Set(value.fees.fixed.minor()),
            min_amount_minor: ActiveValue::Set(value.min_amount.minor()),
            account_details: ActiveValue::Set(value.account_details.clone()),
            enabled: ActiveValue::Set(value.enabled),
        }
    }
}

impl TryFrom<Model> for PaymentMethod {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let percent = Decimal::from_str(&model.fee_percent).map_err(|_| {
            EngineError::InvalidAmount(format!("invalid fee percent for {}", model.id))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            fees: FeeSchedule {
                percent,
                fixed: Money::new(model.fixed_fee_minor),
            },
            min_amount: Money::new(model.min_amount_minor),
            account_details: model.account_details,
            enabled: model.enabled,
        })
    }
}

/// Reference rails installed by `Engine::seed_defaults`.
///
/// `(id, name, fee percent, minimum amount in minor units, account details)`
pub(crate) const DEFAULT_PAYMENT_METHODS: &[(&str, &str, &str, i64, &str)] = &[
    ("instapay", "InstaPay", "0.5", 1_000, "yourbank@instapay"),
    ("vodafone", "Vodafone Cash", "1", 2_000, "010xxxxxxxx"),
    ("paypal", "PayPal", "2.5", 500, "youremail@paypal.com"),
];
