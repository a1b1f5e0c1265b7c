//! Currency catalogue and conversion endpoints.

use api_types::currency::{
    ConvertQuery, ConvertResponse, CurrencyList, CurrencyNew, CurrencyUpdate, CurrencyView,
    RatesUpdate,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Money, Session};

use crate::{ServerError, server::ServerState};

fn map_currency(currency: engine::Currency) -> CurrencyView {
    CurrencyView {
        code: currency.code,
        name: currency.name,
        symbol: currency.symbol,
        description: currency.description,
        decimals: currency.decimals,
        exchange_rate: currency.exchange_rate,
        enabled: currency.enabled,
        updated_at: currency.updated_at,
    }
}

/// Enabled currencies; admins may ask for disabled ones too.
pub async fn list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Query(query): Query<CurrencyList>,
) -> Result<Json<Vec<CurrencyView>>, ServerError> {
    let include_disabled = query.include_disabled.unwrap_or(false) && session.is_admin();
    let currencies = state
        .engine
        .list_currencies(include_disabled)
        .await?
        .into_iter()
        .map(map_currency)
        .collect();
    Ok(Json(currencies))
}

pub async fn convert(
    State(state): State<ServerState>,
    Query(query): Query<ConvertQuery>,
) -> Result<Json<ConvertResponse>, ServerError> {
    let converted = state
        .engine
        .convert_amount(Money::new(query.amount_minor), &query.from, &query.to)
        .await?;
    let rate = state.engine.exchange_rate(&query.from, &query.to).await?;
    Ok(Json(ConvertResponse {
        from: query.from.trim().to_ascii_uppercase(),
        to: query.to.trim().to_ascii_uppercase(),
        amount_minor: query.amount_minor,
        converted_minor: converted.minor(),
        rate,
    }))
}

pub async fn add(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<CurrencyNew>,
) -> Result<(StatusCode, Json<CurrencyView>), ServerError> {
    let mut currency = engine::Currency::new(
        &payload.code,
        &payload.name,
        &payload.symbol,
        payload.decimals,
        payload.exchange_rate,
    )?;
    currency.description = payload.description;
    currency.enabled = payload.enabled.unwrap_or(true);

    let currency = state.engine.add_currency(&session, currency).await?;
    Ok((StatusCode::CREATED, Json(map_currency(currency))))
}

pub async fn update(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
    Json(payload): Json<CurrencyUpdate>,
) -> Result<Json<CurrencyView>, ServerError> {
    let update = engine::CurrencyUpdate {
        name: payload.name,
        symbol: payload.symbol,
        description: payload.description,
        exchange_rate: payload.exchange_rate,
        enabled: payload.enabled,
    };
    if update.is_empty() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }
    let currency = state.engine.update_currency(&session, &code, update).await?;
    Ok(Json(map_currency(currency)))
}

pub async fn delete(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_currency(&session, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Updates several exchange rates in one all-or-nothing batch.
pub async fn update_rates(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<RatesUpdate>,
) -> Result<Json<Vec<CurrencyView>>, ServerError> {
    let rates: Vec<_> = payload
        .rates
        .into_iter()
        .map(|rate| (rate.code, rate.exchange_rate))
        .collect();
    let currencies = state
        .engine
        .bulk_update_exchange_rates(&session, &rates)
        .await?
        .into_iter()
        .map(map_currency)
        .collect();
    Ok(Json(currencies))
}
