//! Balance and reconciliation endpoints.

use api_types::balance::{BalanceView, ReconcileEntry, ReconcileReport};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Session;

use crate::{ServerError, server::ServerState};

pub(crate) fn map_balance(balance: engine::Balance) -> BalanceView {
    BalanceView {
        currency: balance.currency,
        balance_minor: balance.balance.minor(),
        version: balance.version,
        updated_at: balance.updated_at,
    }
}

fn map_report(report: engine::ReconcileReport) -> ReconcileReport {
    ReconcileReport {
        consistent: report.is_consistent(),
        user_id: report.user_id,
        entries: report
            .entries
            .into_iter()
            .map(|entry| ReconcileEntry {
                consistent: entry.is_consistent(),
                currency: entry.currency,
                ledger_minor: entry.ledger.minor(),
                stored_minor: entry.stored.minor(),
            })
            .collect(),
    }
}

pub async fn list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BalanceView>>, ServerError> {
    let balances = state
        .engine
        .balances(&session)
        .await?
        .into_iter()
        .map(map_balance)
        .collect();
    Ok(Json(balances))
}

pub async fn reconcile(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<ReconcileReport>, ServerError> {
    let report = state.engine.reconcile_user(&session, &username).await?;
    Ok(Json(map_report(report)))
}

/// Rewrites stored balances from the approved ledger.
pub async fn repair(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<ReconcileReport>, ServerError> {
    let report = state.engine.recompute_balances(&session, &username).await?;
    Ok(Json(map_report(report)))
}
