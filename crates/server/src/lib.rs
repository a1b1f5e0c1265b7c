use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, app, run, run_with_listener, spawn_with_listener};

mod balances;
mod currencies;
mod payment_methods;
mod server;
mod statistics;
mod transactions;
mod user;

pub mod types {
    pub mod user {
        pub use api_types::user::{
            AccountStatus, KycReview, KycStatus, Role, UserSummary, UserUpdate, UserView,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceView, ReconcileEntry, ReconcileReport};
    }

    pub mod currency {
        pub use api_types::currency::{
            ConvertQuery, ConvertResponse, CurrencyList, CurrencyNew, CurrencyUpdate,
            CurrencyView, RateUpdate, RatesUpdate,
        };
    }

    pub mod payment_method {
        pub use api_types::payment_method::{
            FeeDirection, FeeQuoteRequest, FeeQuoteResponse, PaymentMethodNew,
            PaymentMethodUpdate, PaymentMethodView,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            Decision, DecisionRequest, DecisionResponse, DepositNew, TransactionKind,
            TransactionList, TransactionListResponse, TransactionStatus, TransactionView,
            TransferCreated, TransferNew, WithdrawalNew,
        };
    }

    pub mod stats {
        pub use api_types::stats::{CurrencyVolume, LedgerStats};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::InvalidStateTransition(_)
        | EngineError::ConcurrentModification(_) => StatusCode::CONFLICT,
        EngineError::InvalidCursor(_) | EngineError::InvalidId(_) => StatusCode::BAD_REQUEST,
        EngineError::Database(_) | EngineError::PasswordHash(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InsufficientBalance(_)
        | EngineError::InvalidAmount(_)
        | EngineError::CurrencyMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::PasswordHash(reason) => {
            tracing::error!("password hashing error: {reason}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_forbidden_maps_to_403() {
        assert_eq!(
            status_of(EngineError::Forbidden("forbidden".to_string())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn engine_unauthorized_maps_to_401() {
        assert_eq!(
            status_of(EngineError::Unauthorized("nope".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::KeyNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn engine_conflicts_map_to_409() {
        for err in [
            EngineError::ExistingKey("x".to_string()),
            EngineError::InvalidStateTransition("x".to_string()),
            EngineError::ConcurrentModification("x".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn engine_validation_maps_to_422() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InsufficientBalance("x".to_string()),
            EngineError::CurrencyMismatch("x".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn bad_cursor_maps_to_400() {
        assert_eq!(
            status_of(EngineError::InvalidCursor("x".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let res = ServerError::from(EngineError::PasswordHash("bcrypt exploded".to_string()))
            .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
