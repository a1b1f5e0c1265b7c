use axum::{
    Extension, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{
    ServerError, balances, currencies, payment_methods, statistics, transactions, user,
};
use engine::{Engine, EngineError, Session};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves HTTP Basic credentials into a [`Session`] request extension.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(credentials)) = auth_header else {
        return Err(EngineError::Unauthorized("missing credentials".to_string()).into());
    };
    if credentials.username().is_empty() || credentials.password().is_empty() {
        return Err(EngineError::Unauthorized("missing credentials".to_string()).into());
    }

    let session = state
        .engine
        .authenticate(credentials.username(), credentials.password())
        .await?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

async fn admin_only(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if !session.is_admin() {
        return Err(EngineError::Forbidden("admin role required".to_string()).into());
    }
    Ok(next.run(request).await)
}

fn admin_router() -> Router<ServerState> {
    Router::new()
        .route("/transactions", get(transactions::admin_list))
        .route("/transactions/{id}/decision", post(transactions::decide))
        .route("/users", get(user::list))
        .route("/users/{username}", patch(user::update))
        .route("/users/{username}/kyc", post(user::review_kyc))
        .route(
            "/users/{username}/reconcile",
            get(balances::reconcile).post(balances::repair),
        )
        .route("/currencies", post(currencies::add))
        .route(
            "/currencies/{code}",
            patch(currencies::update).delete(currencies::delete),
        )
        .route("/currencies/rates", post(currencies::update_rates))
        .route("/payment-methods", post(payment_methods::add))
        .route("/payment-methods/{id}", patch(payment_methods::update))
        .route("/stats", get(statistics::get_stats))
        .route_layer(middleware::from_fn(admin_only))
}

/// Builds the full API router around `engine`.
pub fn app(engine: Engine) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
    };
    router(state)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/me", get(user::me))
        .route("/kyc/submit", post(user::submit_kyc))
        .route("/balances", get(balances::list))
        .route("/currencies", get(currencies::list))
        .route("/currencies/convert", get(currencies::convert))
        .route("/payment-methods", get(payment_methods::list))
        .route("/fees/quote", post(payment_methods::quote))
        .route("/deposits", post(transactions::deposit_new))
        .route("/withdrawals", post(transactions::withdrawal_new))
        .route("/transfers", post(transactions::transfer_new))
        .route("/transactions", get(transactions::list))
        .route("/transactions/{id}", get(transactions::get))
        .nest("/admin", admin_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, address: &str) {
    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {address}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
