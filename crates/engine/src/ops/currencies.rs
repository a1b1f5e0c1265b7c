use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ConnectionTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use serde::Serialize;

use crate::{
    Currency, CurrencyUpdate, EngineError, FeeSchedule, Money, PaymentMethod, ResultEngine,
    Session, balances, currency,
    currency::{DEFAULT_CURRENCIES, normalize_code, validate_decimals, validate_rate},
    payment_methods::{self, DEFAULT_PAYMENT_METHODS},
    transactions,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

/// What [`Engine::seed_defaults`] inserted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub currencies_added: Vec<String>,
    pub payment_methods_added: Vec<String>,
}

pub(super) async fn find_currency<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> ResultEngine<Option<Currency>> {
    currency::Entity::find_by_id(code.to_string())
        .one(db)
        .await?
        .map(Currency::try_from)
        .transpose()
}

/// Loads a currency that accepts new money movements.
pub(super) async fn require_enabled_currency<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> ResultEngine<Currency> {
    let code = normalize_code(code)?;
    let currency = find_currency(db, &code)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("currency {code} not exists")))?;
    if !currency.enabled {
        return Err(EngineError::CurrencyMismatch(format!(
            "currency {code} is disabled"
        )));
    }
    Ok(currency)
}

impl Engine {
    /// Lists currencies by name. Disabled ones are included only on request.
    pub async fn list_currencies(&self, include_disabled: bool) -> ResultEngine<Vec<Currency>> {
        let mut query = currency::Entity::find().order_by_asc(currency::Column::Name);
        if !include_disabled {
            query = query.filter(currency::Column::Enabled.eq(true));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Currency::try_from)
            .collect()
    }

    pub async fn currency(&self, code: &str) -> ResultEngine<Currency> {
        let code = normalize_code(code)?;
        find_currency(&self.database, &code)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("currency {code} not exists")))
    }

    pub async fn add_currency(&self, session: &Session, currency: Currency) -> ResultEngine<Currency> {
        session.require_admin()?;
        let code = normalize_code(&currency.code)?;
        validate_decimals(currency.decimals)?;
        validate_rate(currency.exchange_rate)?;
        let currency = Currency {
            code,
            description: normalize_optional_text(currency.description.as_deref()),
            updated_at: Utc::now(),
            ..currency
        };

        with_tx!(self, |db_tx| {
            if find_currency(&db_tx, &currency.code).await?.is_some() {
                Err(EngineError::ExistingKey(currency.code.clone()))
            } else {
                currency::ActiveModel::from(&currency).insert(&db_tx).await?;
                tracing::info!(code = %currency.code, actor = %session.user_id, "currency added");
                Ok(currency)
            }
        })
    }

    /// Applies a partial update to a currency.
    pub async fn update_currency(
        &self,
        session: &Session,
        code: &str,
        update: CurrencyUpdate,
    ) -> ResultEngine<Currency> {
        session.require_admin()?;
        let code = normalize_code(code)?;
        if let Some(rate) = update.exchange_rate {
            validate_rate(rate)?;
        }
        with_tx!(self, |db_tx| {
            let updated = apply_currency_update(&db_tx, &code, &update).await?;
            tracing::info!(%code, actor = %session.user_id, "currency updated");
            Ok(updated)
        })
    }

    pub async fn set_currency_enabled(
        &self,
        session: &Session,
        code: &str,
        enabled: bool,
    ) -> ResultEngine<Currency> {
        let update = CurrencyUpdate {
            enabled: Some(enabled),
            ..CurrencyUpdate::default()
        };
        self.update_currency(session, code, update).await
    }

    pub async fn update_exchange_rate(
        &self,
        session: &Session,
        code: &str,
        rate: Decimal,
    ) -> ResultEngine<Currency> {
        let update = CurrencyUpdate {
            exchange_rate: Some(rate),
            ..CurrencyUpdate::default()
        };
        self.update_currency(session, code, update).await
    }

    /// Updates many exchange rates at once. Either every rate is written or
    /// none is.
    pub async fn bulk_update_exchange_rates(
        &self,
        session: &Session,
        rates: &[(String, Decimal)],
    ) -> ResultEngine<Vec<Currency>> {
        session.require_admin()?;
        for (_, rate) in rates {
            validate_rate(*rate)?;
        }
        with_tx!(self, |db_tx| {
            let mut updated = Vec::with_capacity(rates.len());
            for (code, rate) in rates {
                let code = normalize_code(code)?;
                let update = CurrencyUpdate {
                    exchange_rate: Some(*rate),
                    ..CurrencyUpdate::default()
                };
                updated.push(apply_currency_update(&db_tx, &code, &update).await?);
            }
            tracing::info!(count = updated.len(), actor = %session.user_id, "exchange rates updated");
            Ok::<_, EngineError>(updated)
        })
    }

    /// Deletes a currency nobody holds or has ever transacted in.
    pub async fn delete_currency(&self, session: &Session, code: &str) -> ResultEngine<()> {
        session.require_admin()?;
        let code = normalize_code(code)?;
        with_tx!(self, |db_tx| {
            if find_currency(&db_tx, &code).await?.is_none() {
                return Err(EngineError::KeyNotFound(format!("currency {code} not exists")));
            }
            let held = balances::Entity::find()
                .filter(balances::Column::Currency.eq(code.clone()))
                .count(&db_tx)
                .await?;
            let used = transactions::Entity::find()
                .filter(transactions::Column::Currency.eq(code.clone()))
                .count(&db_tx)
                .await?;
            if held > 0 || used > 0 {
                Err(EngineError::ExistingKey(format!("currency {code} is in use")))
            } else {
                currency::Entity::delete_by_id(code.clone()).exec(&db_tx).await?;
                tracing::info!(%code, actor = %session.user_id, "currency deleted");
                Ok(())
            }
        })
    }

    /// Converts `amount` (minor units of `from`) into minor units of `to`.
    pub async fn convert_amount(&self, amount: Money, from: &str, to: &str) -> ResultEngine<Money> {
        let from = require_enabled_currency(&self.database, from).await?;
        let to = require_enabled_currency(&self.database, to).await?;
        crate::convert(amount, &from, &to)
    }

    /// Units of `to` per one unit of `from`.
    pub async fn exchange_rate(&self, from: &str, to: &str) -> ResultEngine<Decimal> {
        let from = require_enabled_currency(&self.database, from).await?;
        let to = require_enabled_currency(&self.database, to).await?;
        crate::exchange_rate(&from, &to)
    }

    /// Installs the reference currencies and payment methods.
    ///
    /// Rows that already exist are left as they are, so running it twice is
    /// harmless.
    pub async fn seed_defaults(&self) -> ResultEngine<SeedReport> {
        with_tx!(self, |db_tx| {
            let mut report = SeedReport::default();

            for (code, name, symbol, decimals, rate, description) in DEFAULT_CURRENCIES {
                if find_currency(&db_tx, code).await?.is_some() {
                    continue;
                }
                let rate = Decimal::from_str(rate).map_err(|_| {
                    EngineError::InvalidAmount(format!("invalid exchange rate for {code}"))
                })?;
                let mut currency = Currency::new(code, name, symbol, *decimals, rate)?;
                currency.description = Some((*description).to_string());
                currency::ActiveModel::from(&currency).insert(&db_tx).await?;
                report.currencies_added.push(currency.code);
            }

            for (id, name, percent, min_amount, details) in DEFAULT_PAYMENT_METHODS {
                let existing = payment_methods::Entity::find_by_id((*id).to_string())
                    .one(&db_tx)
                    .await?;
                if existing.is_some() {
                    continue;
                }
                let percent = Decimal::from_str(percent).map_err(|_| {
                    EngineError::InvalidAmount(format!("invalid fee percent for {id}"))
                })?;
                let method = PaymentMethod::new(
                    id,
                    name,
                    FeeSchedule::percent(percent),
                    Money::new(*min_amount),
                    Some((*details).to_string()),
                )?;
                payment_methods::ActiveModel::from(&method)
                    .insert(&db_tx)
                    .await?;
                report.payment_methods_added.push(method.id);
            }

            tracing::info!(
                currencies = report.currencies_added.len(),
                payment_methods = report.payment_methods_added.len(),
                "reference data seeded"
            );
            Ok::<_, EngineError>(report)
        })
    }
}

async fn apply_currency_update<C: ConnectionTrait>(
    db: &C,
    code: &str,
    update: &CurrencyUpdate,
) -> ResultEngine<Currency> {
    let model = currency::Entity::find_by_id(code.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("currency {code} not exists")))?;
    let mut currency = Currency::try_from(model.clone())?;

    if let Some(name) = update.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(EngineError::InvalidAmount(
                "currency name must not be empty".to_string(),
            ));
        }
        currency.name = name.to_string();
    }
    if let Some(symbol) = &update.symbol {
        currency.symbol = symbol.trim().to_string();
    }
    if let Some(description) = &update.description {
        currency.description = normalize_optional_text(Some(description));
    }
    if let Some(rate) = update.exchange_rate {
        validate_rate(rate)?;
        currency.exchange_rate = rate;
    }
    if let Some(enabled) = update.enabled {
        currency.enabled = enabled;
    }
    currency.updated_at = Utc::now();

    let mut active = model.into_active_model();
    let changes = currency::ActiveModel::from(&currency);
    active.name = changes.name;
    active.symbol = changes.symbol;
    active.description = changes.description;
    active.exchange_rate = changes.exchange_rate;
    active.enabled = changes.enabled;
    active.updated_at = changes.updated_at;
    active.update(db).await?;
    Ok(currency)
}
