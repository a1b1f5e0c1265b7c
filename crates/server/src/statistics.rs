use api_types::stats::{CurrencyVolume, LedgerStats};
use axum::{Extension, Json, extract::State};
use engine::Session;

use crate::{ServerError, server::ServerState};

pub async fn get_stats(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerStats>, ServerError> {
    let stats = state.engine.ledger_stats(&session).await?;
    Ok(Json(LedgerStats {
        users: stats.users,
        pending_transactions: stats.pending_transactions,
        volumes: stats
            .volumes
            .into_iter()
            .map(|volume| CurrencyVolume {
                currency: volume.currency,
                deposits_minor: volume.deposits.minor(),
                withdrawals_minor: volume.withdrawals.minor(),
            })
            .collect(),
    }))
}
