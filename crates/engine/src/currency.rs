//! Currency catalog.
//!
//! Currencies are admin-managed rows rather than a closed enum: the catalog can
//! grow (fiat, stablecoins, crypto) without a release.
//!
//! ## Exchange rates
//!
//! Every currency carries an `exchange_rate` expressed as *units of this
//! currency per 1 USD* (USD itself is `1`). Converting between two currencies
//! goes through USD:
//!
//! ```text
//! usd    = amount / from.exchange_rate
//! target = usd * to.exchange_rate
//! ```
//!
//! ## Minor units
//!
//! `decimals` is how many fraction digits the currency uses when converting
//! between major units (human input/output, `10.50 USD`) and minor units
//! (stored integers, `1050`).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// Highest precision accepted for a currency.
pub const MAX_DECIMALS: u8 = 18;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub decimals: u8,
    pub exchange_rate: Decimal,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl Currency {
    /// Builds a validated currency.
    pub fn new(
        code: &str,
        name: &str,
        symbol: &str,
        decimals: u8,
        exchange_rate: Decimal,
    ) -> ResultEngine<Self> {
        let code = normalize_code(code)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidAmount(
                "currency name must not be empty".to_string(),
            ));
        }
        validate_decimals(decimals)?;
        validate_rate(exchange_rate)?;
        Ok(Self {
            code,
            name: name.to_string(),
            symbol: symbol.trim().to_string(),
            description: None,
            decimals,
            exchange_rate,
            enabled: true,
            updated_at: Utc::now(),
        })
    }

    /// Formats a minor-unit amount with this currency's precision and code.
    #[must_use]
    pub fn format(&self, amount: Money) -> String {
        format!("{} {}", amount.format(self.decimals), self.code)
    }
}

/// Canonical form of a currency code: trimmed, upper-case ASCII alphanumerics.
pub fn normalize_code(code: &str) -> ResultEngine<String> {
    let code = code.trim().to_ascii_uppercase();
    if !(2..=10).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::CurrencyMismatch(format!(
            "invalid currency code: {code}"
        )));
    }
    Ok(code)
}

pub(crate) fn validate_decimals(decimals: u8) -> ResultEngine<()> {
    if decimals > MAX_DECIMALS {
        return Err(EngineError::InvalidAmount(format!(
            "decimals must be <= {MAX_DECIMALS}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_rate(rate: Decimal) -> ResultEngine<()> {
    if rate <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "exchange rate must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Rate to multiply an amount in `from` by to obtain an amount in `to`.
pub fn exchange_rate(from: &Currency, to: &Currency) -> ResultEngine<Decimal> {
    if from.code == to.code {
        return Ok(Decimal::ONE);
    }
    validate_rate(from.exchange_rate)?;
    to.exchange_rate
        .checked_div(from.exchange_rate)
        .ok_or_else(|| EngineError::InvalidAmount("exchange rate overflow".to_string()))
}

/// Converts a minor-unit amount between two currencies through USD, rounding
/// to the target precision.
pub fn convert(amount: Money, from: &Currency, to: &Currency) -> ResultEngine<Money> {
    if from.code == to.code {
        return Ok(amount);
    }
    validate_rate(from.exchange_rate)?;
    let overflow = || EngineError::InvalidAmount("conversion overflow".to_string());
    let usd = amount
        .to_decimal(from.decimals)
        .checked_div(from.exchange_rate)
        .ok_or_else(overflow)?;
    let target = usd.checked_mul(to.exchange_rate).ok_or_else(overflow)?;
    Money::from_decimal(target, to.decimals)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub decimals: i32,
    pub exchange_rate: String,
    pub enabled: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Currency> for ActiveModel {
    fn from(value: &Currency) -> Self {
        Self {
            code: ActiveValue::Set(value.code.clone()),
            name: ActiveValue::Set(value.name.clone()),
            symbol: ActiveValue::Set(value.symbol.clone()),
            description: ActiveValue::Set(value.description.clone()),
            decimals: ActiveValue::Set(i32::from(value.decimals)),
            exchange_rate: ActiveValue::Set(value.exchange_rate.normalize().to_string()),
            enabled: ActiveValue::Set(value.enabled),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Currency {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let decimals = u8::try_from(model.decimals)
            .map_err(|_| EngineError::InvalidAmount(format!("invalid decimals for {}", model.code)))?;
        let exchange_rate = Decimal::from_str(&model.exchange_rate).map_err(|_| {
            EngineError::InvalidAmount(format!("invalid exchange rate for {}", model.code))
        })?;
        Ok(Self {
            code: model.code,
            name: model.name,
            symbol: model.symbol,
            description: model.description,
            decimals,
            exchange_rate,
            enabled: model.enabled,
            updated_at: model.updated_at,
        })
    }
}

/// Reference catalog installed by `Engine::seed_defaults`.
///
/// `(code, name, symbol, decimals, units per USD, description)`
pub(crate) const DEFAULT_CURRENCIES: &[(&str, &str, &str, u8, &str, &str)] = &[
    ("USD", "US Dollar", "$", 2, "1", "United States Dollar - Base currency"),
    ("EUR", "Euro", "€", 2, "0.85", "European Union Euro"),
    ("GBP", "British Pound", "£", 2, "0.73", "British Pound Sterling"),
    ("EGP", "Egyptian Pound", "ج.م", 2, "30.85", "Egyptian Pound"),
    ("SAR", "Saudi Riyal", "ر.س", 2, "3.75", "Saudi Arabian Riyal"),
    ("AED", "UAE Dirham", "د.إ", 2, "3.67", "United Arab Emirates Dirham"),
    ("BTC", "Bitcoin", "₿", 8, "0.000023", "Bitcoin - Digital Currency"),
    ("ETH", "Ethereum", "Ξ", 6, "0.00041", "Ethereum - Digital Currency"),
    ("USDT", "Tether", "₮", 2, "1", "Tether - Stablecoin"),
    ("BNB", "Binance Coin", "BNB", 4, "0.0017", "Binance Coin - Exchange Token"),
];

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn currency(code: &str, decimals: u8, rate: Decimal) -> Currency {
        Currency::new(code, code, code, decimals, rate).unwrap()
    }

    #[test]
    fn code_is_normalized() {
        assert_eq!(normalize_code(" usdt ").unwrap(), "USDT");
        assert!(normalize_code("U").is_err());
        assert!(normalize_code("US D").is_err());
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(Currency::new("XXX", "Nothing", "x", 2, Decimal::ZERO).is_err());
        assert!(Currency::new("XXX", "Nothing", "x", 2, dec!(-1)).is_err());
    }

    #[test]
    fn converts_through_usd() {
        let usd = currency("USD", 2, dec!(1));
        let egp = currency("EGP", 2, dec!(30.85));
        let eur = currency("EUR", 2, dec!(0.85));

        assert_eq!(convert(Money::new(10_000), &usd, &egp).unwrap(), Money::new(308_500));
        // 100 EUR -> 117.647... USD
        assert_eq!(convert(Money::new(10_000), &eur, &usd).unwrap(), Money::new(11_765));
        assert_eq!(convert(Money::new(123), &eur, &eur).unwrap(), Money::new(123));
    }

    #[test]
    fn converts_between_precisions() {
        let usd = currency("USD", 2, dec!(1));
        let btc = currency("BTC", 8, dec!(0.000023));

        // 1000 USD -> 0.023 BTC
        assert_eq!(convert(Money::new(100_000), &usd, &btc).unwrap(), Money::new(2_300_000));
    }

    #[test]
    fn rate_between_two_currencies() {
        let eur = currency("EUR", 2, dec!(0.85));
        let gbp = currency("GBP", 2, dec!(0.73));
        let rate = exchange_rate(&eur, &gbp).unwrap();
        assert_eq!(rate.round_dp(4), dec!(0.8588));
        assert_eq!(exchange_rate(&eur, &eur).unwrap(), Decimal::ONE);
    }
}
