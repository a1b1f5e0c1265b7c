//! Approval and rejection of pending transactions.
//!
//! A decision reads the transaction and its owner, adjusts the owner's balance
//! on approval and flips the status, all in one database transaction. The
//! balance write is guarded by the balance version and the status write by
//! the pending status; if either guard fails the decision is retried once.

use std::future::Future;

use chrono::Utc;
use sea_orm::TransactionTrait;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Balance, Decision, EngineError, ResultEngine, Session, Transaction, TransactionStatus, repo,
};

use super::{Engine, access::require_user, with_tx};

/// Result of [`Engine::decide_transaction`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecisionOutcome {
    pub transaction: Transaction,
    /// The owner's balance after an approval; `None` when nothing moved.
    pub balance: Option<Balance>,
    /// `false` when the transaction already had the requested status.
    pub applied: bool,
}

impl Engine {
    /// Approves or rejects a transaction.
    ///
    /// - missing transaction or owner: [`EngineError::KeyNotFound`]
    /// - already in the requested status: no-op, `applied == false`
    /// - already decided the other way: [`EngineError::InvalidStateTransition`]
    /// - approving a debit the balance cannot cover:
    ///   [`EngineError::InsufficientBalance`], nothing is written
    ///
    /// Rejection never touches a balance.
    pub async fn decide_transaction(
        &self,
        session: &Session,
        transaction_id: Uuid,
        decision: Decision,
    ) -> ResultEngine<DecisionOutcome> {
        session.require_admin()?;
        retry_on_conflict(transaction_id, move || {
            self.decide_once(session, transaction_id, decision)
        })
        .await
    }

    async fn decide_once(
        &self,
        session: &Session,
        transaction_id: Uuid,
        decision: Decision,
    ) -> ResultEngine<DecisionOutcome> {
        let target = decision.target_status();
        let decided_at = Utc::now();

        let outcome = with_tx!(self, |db_tx| {
            let tx = repo::get_transaction(&db_tx, transaction_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            require_user(&db_tx, &tx.user_id).await?;

            if tx.status == target {
                Ok(DecisionOutcome {
                    transaction: tx,
                    balance: None,
                    applied: false,
                })
            } else if tx.status.is_terminal() {
                Err(EngineError::InvalidStateTransition(format!(
                    "transaction {transaction_id} is already {}",
                    tx.status.as_str()
                )))
            } else {
                let balance = match decision {
                    Decision::Approve => Some(
                        repo::apply_balance_delta(
                            &db_tx,
                            &tx.user_id,
                            &tx.currency,
                            tx.signed_amount(),
                            decided_at,
                        )
                        .await?,
                    ),
                    Decision::Reject => None,
                };
                repo::transition_status(
                    &db_tx,
                    transaction_id,
                    TransactionStatus::Pending,
                    target,
                    &session.user_id,
                    decided_at,
                )
                .await?;

                Ok(DecisionOutcome {
                    transaction: Transaction {
                        status: target,
                        updated_at: decided_at,
                        decided_at: Some(decided_at),
                        decided_by: Some(session.user_id.clone()),
                        ..tx
                    },
                    balance,
                    applied: true,
                })
            }
        })?;

        if outcome.applied {
            tracing::info!(
                id = %transaction_id,
                user = %outcome.transaction.user_id,
                status = target.as_str(),
                actor = %session.user_id,
                "transaction decided"
            );
        }
        Ok(outcome)
    }
}

/// Runs `attempt`, and once more if it lost a write guard.
///
/// Only [`EngineError::ConcurrentModification`] is retried; a second conflict
/// is returned to the caller.
async fn retry_on_conflict<T, F, Fut>(transaction_id: Uuid, attempt: F) -> ResultEngine<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ResultEngine<T>>,
{
    match attempt().await {
        Err(EngineError::ConcurrentModification(reason)) => {
            tracing::warn!(id = %transaction_id, %reason, "concurrent modification, retrying decision");
            attempt().await
        }
        other => other,
    }
}
