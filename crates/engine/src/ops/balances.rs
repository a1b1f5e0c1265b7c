use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use serde::Serialize;

use crate::{
    Balance, EngineError, Money, ResultEngine, Session, Transaction, TransactionStatus, balances,
    repo, transactions,
};

use super::{Engine, access::require_user, with_tx};

/// Ledger total versus stored balance for one currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileEntry {
    pub currency: String,
    /// Sum of the signed amounts of approved transactions.
    pub ledger: Money,
    pub stored: Money,
}

impl ReconcileEntry {
    pub fn is_consistent(&self) -> bool {
        self.ledger == self.stored
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub user_id: String,
    pub entries: Vec<ReconcileEntry>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.entries.iter().all(ReconcileEntry::is_consistent)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &ReconcileEntry> {
        self.entries.iter().filter(|entry| !entry.is_consistent())
    }
}

/// Sums approved signed amounts per currency.
async fn ledger_totals<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<BTreeMap<String, Money>> {
    let models = transactions::Entity::find()
        .filter(transactions::Column::UserId.eq(user_id.to_string()))
        .filter(transactions::Column::Status.eq(TransactionStatus::Approved.as_str()))
        .all(db)
        .await?;

    let mut totals: BTreeMap<String, Money> = BTreeMap::new();
    for model in models {
        let tx = Transaction::try_from(model)?;
        let total = totals.entry(tx.currency.clone()).or_default();
        *total = total
            .checked_add(tx.signed_amount())
            .ok_or_else(|| EngineError::InvalidAmount("ledger total overflow".to_string()))?;
    }
    Ok(totals)
}

async fn build_report<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<ReconcileReport> {
    let mut entries: BTreeMap<String, ReconcileEntry> = ledger_totals(db, user_id)
        .await?
        .into_iter()
        .map(|(currency, ledger)| {
            let entry = ReconcileEntry {
                currency: currency.clone(),
                ledger,
                stored: Money::ZERO,
            };
            (currency, entry)
        })
        .collect();

    for balance in repo::list_balances(db, user_id).await? {
        entries
            .entry(balance.currency.clone())
            .or_insert_with(|| ReconcileEntry {
                currency: balance.currency.clone(),
                ledger: Money::ZERO,
                stored: Money::ZERO,
            })
            .stored = balance.balance;
    }

    Ok(ReconcileReport {
        user_id: user_id.to_string(),
        entries: entries.into_values().collect(),
    })
}

impl Engine {
    /// The caller's balances, one per currency they ever held.
    pub async fn balances(&self, session: &Session) -> ResultEngine<Vec<Balance>> {
        repo::list_balances(&self.database, &session.user_id).await
    }

    /// Compares each stored balance of `username` with the approved ledger.
    pub async fn reconcile_user(
        &self,
        session: &Session,
        username: &str,
    ) -> ResultEngine<ReconcileReport> {
        if !session.can_read(username) {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        require_user(&self.database, username).await?;
        build_report(&self.database, username).await
    }

    /// Rewrites the stored balances of `username` from the approved ledger.
    ///
    /// Returns the report after the repair, which is always consistent.
    pub async fn recompute_balances(
        &self,
        session: &Session,
        username: &str,
    ) -> ResultEngine<ReconcileReport> {
        session.require_admin()?;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            require_user(&db_tx, username).await?;
            let before = build_report(&db_tx, username).await?;

            for entry in before.mismatches() {
                if entry.ledger.is_negative() {
                    tracing::warn!(
                        user = %username,
                        currency = %entry.currency,
                        ledger = %entry.ledger,
                        "approved ledger sums to a negative balance"
                    );
                }
                match repo::get_balance(&db_tx, username, &entry.currency).await? {
                    Some(current) => {
                        repo::write_balance(&db_tx, &current, entry.ledger, now).await?;
                    }
                    None => {
                        let created = Balance {
                            version: 1,
                            balance: entry.ledger,
                            updated_at: now,
                            ..Balance::empty(username, &entry.currency)
                        };
                        balances::ActiveModel::from(&created).insert(&db_tx).await?;
                    }
                }
                tracing::info!(
                    user = %username,
                    currency = %entry.currency,
                    from = %entry.stored,
                    to = %entry.ledger,
                    actor = %session.user_id,
                    "balance repaired"
                );
            }

            build_report(&db_tx, username).await
        })
    }
}
