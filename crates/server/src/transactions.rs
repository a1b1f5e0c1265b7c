//! Transactions API endpoints

use api_types::transaction::{
    Decision, DecisionRequest, DecisionResponse, DepositNew, TransactionKind as ApiKind,
    TransactionList, TransactionListResponse, TransactionStatus as ApiStatus, TransactionView,
    TransferCreated, TransferNew, WithdrawalNew,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{DepositCmd, Money, Session, TransactionFilter, TransferCmd, WithdrawalCmd};
use uuid::Uuid;

use crate::{ServerError, balances::map_balance, server::ServerState};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Deposit => ApiKind::Deposit,
        engine::TransactionKind::Withdrawal => ApiKind::Withdrawal,
        engine::TransactionKind::TransferIn => ApiKind::TransferIn,
        engine::TransactionKind::TransferOut => ApiKind::TransferOut,
    }
}

fn map_status(status: engine::TransactionStatus) -> ApiStatus {
    match status {
        engine::TransactionStatus::Pending => ApiStatus::Pending,
        engine::TransactionStatus::Approved => ApiStatus::Approved,
        engine::TransactionStatus::Rejected => ApiStatus::Rejected,
    }
}

fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        user_id: tx.user_id,
        kind: map_kind(tx.kind),
        status: map_status(tx.status),
        amount_minor: tx.amount.minor(),
        fee_minor: tx.fee.minor(),
        currency: tx.currency,
        method: tx.method,
        destination: tx.destination,
        counterparty: tx.counterparty,
        reference: tx.reference,
        description: tx.description,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
        decided_at: tx.decided_at,
        decided_by: tx.decided_by,
    }
}

fn filter_from_query(query: &TransactionList) -> TransactionFilter {
    TransactionFilter {
        user_id: query.user.clone(),
        status: query.status.map(|status| match status {
            ApiStatus::Pending => engine::TransactionStatus::Pending,
            ApiStatus::Approved => engine::TransactionStatus::Approved,
            ApiStatus::Rejected => engine::TransactionStatus::Rejected,
        }),
        kind: query.kind.map(|kind| match kind {
            ApiKind::Deposit => engine::TransactionKind::Deposit,
            ApiKind::Withdrawal => engine::TransactionKind::Withdrawal,
            ApiKind::TransferIn => engine::TransactionKind::TransferIn,
            ApiKind::TransferOut => engine::TransactionKind::TransferOut,
        }),
    }
}

fn map_page(page: engine::TransactionsPage) -> TransactionListResponse {
    TransactionListResponse {
        transactions: page.transactions.into_iter().map(map_transaction).collect(),
        next_cursor: page.next_cursor,
    }
}

pub async fn deposit_new(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<DepositNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let mut cmd = DepositCmd::new(
        Money::new(payload.amount_minor),
        payload.currency,
        payload.method,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    let tx = state.engine.request_deposit(&session, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn withdrawal_new(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<WithdrawalNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let mut cmd = WithdrawalCmd::new(
        Money::new(payload.amount_minor),
        payload.currency,
        payload.method,
    );
    if let Some(destination) = payload.destination {
        cmd = cmd.destination(destination);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    let tx = state.engine.request_withdrawal(&session, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn transfer_new(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransferCreated>), ServerError> {
    let mut cmd = TransferCmd::new(
        payload.to,
        Money::new(payload.amount_minor),
        payload.currency,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    let (outgoing, incoming) = state.engine.transfer_funds(&session, cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransferCreated {
            outgoing: map_transaction(outgoing),
            incoming: map_transaction(incoming),
        }),
    ))
}

pub async fn list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = filter_from_query(&query);
    let page = state
        .engine
        .list_transactions_page(
            &session,
            &filter,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(map_page(page)))
}

pub async fn get(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(&session, id).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn admin_list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = filter_from_query(&query);
    let page = state
        .engine
        .admin_list_transactions_page(
            &session,
            &filter,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(map_page(page)))
}

/// Approves or rejects a pending transaction.
pub async fn decide(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ServerError> {
    let decision = match payload.decision {
        Decision::Approve => engine::Decision::Approve,
        Decision::Reject => engine::Decision::Reject,
    };
    let outcome = state
        .engine
        .decide_transaction(&session, id, decision)
        .await?;
    Ok(Json(DecisionResponse {
        transaction: map_transaction(outcome.transaction),
        balance: outcome.balance.map(map_balance),
        applied: outcome.applied,
    }))
}
