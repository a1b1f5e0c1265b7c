use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Session, Transaction, TransactionFilter, repo};

use super::Engine;

/// One page of transactions, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    /// Pass back to fetch the next page; `None` on the last one.
    pub next_cursor: Option<String>,
}

impl Engine {
    /// Returns a transaction visible to the caller.
    ///
    /// Other users' transactions are reported as missing, not forbidden.
    pub async fn transaction(&self, session: &Session, id: Uuid) -> ResultEngine<Transaction> {
        let not_found = || EngineError::KeyNotFound("transaction not exists".to_string());
        let tx = repo::get_transaction(&self.database, id)
            .await?
            .ok_or_else(not_found)?;
        if !session.can_read(&tx.user_id) {
            return Err(not_found());
        }
        Ok(tx)
    }

    /// Lists the caller's own transactions. `filter.user_id` is ignored.
    pub async fn list_transactions_page(
        &self,
        session: &Session,
        filter: &TransactionFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<TransactionsPage> {
        let (transactions, next_cursor) =
            repo::list_by_user(&self.database, &session.user_id, filter, limit, cursor).await?;
        Ok(TransactionsPage {
            transactions,
            next_cursor,
        })
    }

    /// Lists transactions across all users.
    pub async fn admin_list_transactions_page(
        &self,
        session: &Session,
        filter: &TransactionFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<TransactionsPage> {
        session.require_admin()?;
        let (transactions, next_cursor) =
            repo::list_transactions(&self.database, filter, limit, cursor).await?;
        Ok(TransactionsPage {
            transactions,
            next_cursor,
        })
    }
}
