use std::collections::BTreeMap;

use sea_orm::{PaginatorTrait, QueryFilter, prelude::*};
use serde::Serialize;

use crate::{
    EngineError, Money, ResultEngine, Session, Transaction, TransactionKind, TransactionStatus,
    transactions, users,
};

use super::Engine;

/// Approved deposit and withdrawal volume in one currency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CurrencyVolume {
    pub currency: String,
    pub deposits: Money,
    pub withdrawals: Money,
}

/// Headline numbers for the admin dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub users: u64,
    pub pending_transactions: u64,
    pub volumes: Vec<CurrencyVolume>,
}

impl Engine {
    pub async fn ledger_stats(&self, session: &Session) -> ResultEngine<LedgerStats> {
        session.require_admin()?;

        let users = users::Entity::find().count(&self.database).await?;
        let pending_transactions = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .count(&self.database)
            .await?;

        let approved = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Approved.as_str()))
            .filter(transactions::Column::Kind.is_in([
                TransactionKind::Deposit.as_str(),
                TransactionKind::Withdrawal.as_str(),
            ]))
            .all(&self.database)
            .await?;

        let mut volumes: BTreeMap<String, CurrencyVolume> = BTreeMap::new();
        for model in approved {
            let tx = Transaction::try_from(model)?;
            let volume = volumes
                .entry(tx.currency.clone())
                .or_insert_with(|| CurrencyVolume {
                    currency: tx.currency.clone(),
                    ..CurrencyVolume::default()
                });
            let bucket = match tx.kind {
                TransactionKind::Deposit => &mut volume.deposits,
                _ => &mut volume.withdrawals,
            };
            *bucket = bucket
                .checked_add(tx.amount)
                .ok_or_else(|| EngineError::InvalidAmount("volume overflow".to_string()))?;
        }

        Ok(LedgerStats {
            users,
            pending_transactions,
            volumes: volumes.into_values().collect(),
        })
    }
}
