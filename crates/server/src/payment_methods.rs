//! Payment method endpoints and the fee preview.

use api_types::payment_method::{
    FeeDirection, FeeQuoteRequest, FeeQuoteResponse, PaymentMethodNew, PaymentMethodUpdate,
    PaymentMethodView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{FeeSchedule, Money, Session};

use crate::{ServerError, server::ServerState};

fn map_method(method: engine::PaymentMethod) -> PaymentMethodView {
    PaymentMethodView {
        id: method.id,
        name: method.name,
        fee_percent: method.fees.percent,
        fixed_fee_minor: method.fees.fixed.minor(),
        min_amount_minor: method.min_amount.minor(),
        account_details: method.account_details,
        enabled: method.enabled,
    }
}

pub async fn list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PaymentMethodView>>, ServerError> {
    let methods = state
        .engine
        .list_payment_methods(session.is_admin())
        .await?
        .into_iter()
        .map(map_method)
        .collect();
    Ok(Json(methods))
}

pub async fn quote(
    State(state): State<ServerState>,
    Json(payload): Json<FeeQuoteRequest>,
) -> Result<Json<FeeQuoteResponse>, ServerError> {
    let direction = match payload.direction {
        FeeDirection::Deposit => engine::FeeDirection::Deposit,
        FeeDirection::Withdrawal => engine::FeeDirection::Withdrawal,
    };
    let quote = state
        .engine
        .quote_fee(&payload.method, &payload.amount, direction)
        .await?;
    Ok(Json(FeeQuoteResponse {
        amount_minor: quote.amount.minor(),
        fee_minor: quote.fee.minor(),
        total_minor: quote.total.minor(),
    }))
}

pub async fn add(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentMethodNew>,
) -> Result<(StatusCode, Json<PaymentMethodView>), ServerError> {
    let mut method = engine::PaymentMethod::new(
        &payload.id,
        &payload.name,
        FeeSchedule {
            percent: payload.fee_percent,
            fixed: Money::new(payload.fixed_fee_minor.unwrap_or(0)),
        },
        Money::new(payload.min_amount_minor),
        payload.account_details,
    )?;
    method.enabled = payload.enabled.unwrap_or(true);

    let method = state.engine.add_payment_method(&session, method).await?;
    Ok((StatusCode::CREATED, Json(map_method(method))))
}

pub async fn update(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PaymentMethodUpdate>,
) -> Result<Json<PaymentMethodView>, ServerError> {
    let fees = if payload.fee_percent.is_some() || payload.fixed_fee_minor.is_some() {
        let current = state.engine.payment_method(&id).await?;
        Some(FeeSchedule {
            percent: payload.fee_percent.unwrap_or(current.fees.percent),
            fixed: payload
                .fixed_fee_minor
                .map(Money::new)
                .unwrap_or(current.fees.fixed),
        })
    } else {
        None
    };
    let update = engine::PaymentMethodUpdate {
        name: payload.name,
        fees,
        min_amount: payload.min_amount_minor.map(Money::new),
        account_details: payload.account_details,
        enabled: payload.enabled,
    };
    let method = state
        .engine
        .update_payment_method(&session, &id, update)
        .await?;
    Ok(Json(map_method(method)))
}
