//! Per-user, per-currency balances.
//!
//! `version` is an optimistic-concurrency counter: every write must name the
//! version it read, and bumps it by one.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: String,
    pub currency: String,
    pub balance: Money,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Amount that can be debited right now.
    pub fn available(&self) -> Money {
        self.balance
    }

    /// An empty balance for a currency the user never held.
    pub fn empty(user_id: &str, currency: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            currency: currency.to_string(),
            balance: Money::ZERO,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub currency: String,
    pub balance_minor: i64,
    pub version: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Balance {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            currency: model.currency,
            balance: Money::new(model.balance_minor),
            version: model.version,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Balance> for ActiveModel {
    fn from(value: &Balance) -> Self {
        Self {
            user_id: ActiveValue::Set(value.user_id.clone()),
            currency: ActiveValue::Set(value.currency.clone()),
            balance_minor: ActiveValue::Set(value.balance.minor()),
            version: ActiveValue::Set(value.version),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}
