//! Repository interface over the ledger tables.
//!
//! Every function is generic over sea-orm's [`ConnectionTrait`], so it runs
//! against the pool or inside a `DatabaseTransaction`; which backend sits
//! behind it is decided by the database URL.
//!
//! Writes that can race are guarded:
//! - balances by their `version` column,
//! - transaction status by the expected current status.
//!
//! A failed guard surfaces as [`EngineError::ConcurrentModification`].

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Balance, EngineError, Money, ResultEngine, Transaction, TransactionKind, TransactionStatus,
    balances, transactions,
};

/// Largest page returned by the list functions.
pub const MAX_PAGE_SIZE: u64 = 200;

/// Filters for listing transactions. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub kind: Option<TransactionKind>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    created_at: DateTime<Utc>,
    transaction_id: String,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

pub async fn get_transaction<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> ResultEngine<Option<Transaction>> {
    transactions::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .map(Transaction::try_from)
        .transpose()
}

pub async fn insert_transaction<C: ConnectionTrait>(db: &C, tx: &Transaction) -> ResultEngine<()> {
    transactions::ActiveModel::from(tx).insert(db).await?;
    Ok(())
}

/// Lists transactions newest first, with cursor-based pagination.
///
/// Ordering is `(created_at DESC, id DESC)`; the returned cursor is `None` on
/// the last page.
pub async fn list_transactions<C: ConnectionTrait>(
    db: &C,
    filter: &TransactionFilter,
    limit: u64,
    cursor: Option<&str>,
) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let mut query = transactions::Entity::find()
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .limit(limit + 1);

    if let Some(user_id) = &filter.user_id {
        query = query.filter(transactions::Column::UserId.eq(user_id.clone()));
    }
    if let Some(status) = filter.status {
        query = query.filter(transactions::Column::Status.eq(status.as_str()));
    }
    if let Some(kind) = filter.kind {
        query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
    }
    if let Some(cursor) = cursor {
        let cursor = TransactionsCursor::decode(cursor)?;
        query = query.filter(
            Condition::any()
                .add(transactions::Column::CreatedAt.lt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(transactions::Column::CreatedAt.eq(cursor.created_at))
                        .add(transactions::Column::Id.lt(cursor.transaction_id)),
                ),
        );
    }

    let rows: Vec<transactions::Model> = query.all(db).await?;
    let has_more = rows.len() as u64 > limit;

    let mut out = Vec::with_capacity(rows.len().min(limit as usize));
    for model in rows.into_iter().take(limit as usize) {
        out.push(Transaction::try_from(model)?);
    }

    let next_cursor = match out.last() {
        Some(last) if has_more => Some(
            TransactionsCursor {
                created_at: last.created_at,
                transaction_id: last.id.to_string(),
            }
            .encode()?,
        ),
        _ => None,
    };

    Ok((out, next_cursor))
}

/// Lists one user's transactions newest first.
pub async fn list_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    filter: &TransactionFilter,
    limit: u64,
    cursor: Option<&str>,
) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
    let filter = TransactionFilter {
        user_id: Some(user_id.to_string()),
        ..filter.clone()
    };
    list_transactions(db, &filter, limit, cursor).await
}

/// Moves a transaction from `from` to `to`, only if it is still in `from`.
pub async fn transition_status<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    from: TransactionStatus,
    to: TransactionStatus,
    actor: &str,
    at: DateTime<Utc>,
) -> ResultEngine<()> {
    let result = transactions::Entity::update_many()
        .col_expr(transactions::Column::Status, Expr::value(to.as_str()))
        .col_expr(transactions::Column::UpdatedAt, Expr::value(at))
        .col_expr(transactions::Column::DecidedAt, Expr::value(at))
        .col_expr(transactions::Column::DecidedBy, Expr::value(actor))
        .filter(transactions::Column::Id.eq(id.to_string()))
        .filter(transactions::Column::Status.eq(from.as_str()))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::ConcurrentModification(format!(
            "transaction {id} is no longer {}",
            from.as_str()
        )));
    }
    Ok(())
}

pub async fn get_balance<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    currency: &str,
) -> ResultEngine<Option<Balance>> {
    Ok(
        balances::Entity::find_by_id((user_id.to_string(), currency.to_string()))
            .one(db)
            .await?
            .map(Balance::from),
    )
}

pub async fn list_balances<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<Vec<Balance>> {
    Ok(balances::Entity::find()
        .filter(balances::Column::UserId.eq(user_id.to_string()))
        .order_by_asc(balances::Column::Currency)
        .all(db)
        .await?
        .into_iter()
        .map(Balance::from)
        .collect())
}

/// Adds `delta` to a user's balance in `currency`.
///
/// - creates the balance row on the first credit
/// - refuses any change that would leave the balance negative
///   ([`EngineError::InsufficientBalance`])
/// - the write only lands if the row still has the version that was read
pub async fn apply_balance_delta<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    currency: &str,
    delta: Money,
    at: DateTime<Utc>,
) -> ResultEngine<Balance> {
    let Some(current) = get_balance(db, user_id, currency).await? else {
        if delta.is_negative() {
            return Err(EngineError::InsufficientBalance(format!(
                "available 0 {currency}, requested {}",
                -delta
            )));
        }
        let created = Balance {
            user_id: user_id.to_string(),
            currency: currency.to_string(),
            balance: delta,
            version: 1,
            updated_at: at,
        };
        balances::ActiveModel::from(&created)
            .insert(db)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => EngineError::ConcurrentModification(
                    format!("balance {user_id}/{currency} created concurrently"),
                ),
                _ => EngineError::Database(err),
            })?;
        return Ok(created);
    };

    let next = current
        .balance
        .checked_add(delta)
        .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
    if next.is_negative() {
        return Err(EngineError::InsufficientBalance(format!(
            "available {} {currency}, requested {}",
            current.available(),
            -delta
        )));
    }

    write_balance(db, &current, next, at).await
}

/// Overwrites a balance with `value`, guarded by the version in `current`.
pub(crate) async fn write_balance<C: ConnectionTrait>(
    db: &C,
    current: &Balance,
    value: Money,
    at: DateTime<Utc>,
) -> ResultEngine<Balance> {
    let version = current.version + 1;
    let result = balances::Entity::update_many()
        .col_expr(balances::Column::BalanceMinor, Expr::value(value.minor()))
        .col_expr(balances::Column::Version, Expr::value(version))
        .col_expr(balances::Column::UpdatedAt, Expr::value(at))
        .filter(balances::Column::UserId.eq(current.user_id.clone()))
        .filter(balances::Column::Currency.eq(current.currency.clone()))
        .filter(balances::Column::Version.eq(current.version))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::ConcurrentModification(format!(
            "balance {}/{} changed while updating",
            current.user_id, current.currency
        )));
    }

    Ok(Balance {
        balance: value,
        version,
        updated_at: at,
        ..current.clone()
    })
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{Database, DatabaseConnection};

    use super::*;
    use crate::{Engine, NewUser};

    async fn db_with_user(username: &str) -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db.clone())
            .password_cost(4)
            .build()
            .await
            .unwrap();
        engine.seed_defaults().await.unwrap();
        engine
            .create_user(NewUser {
                username: username.to_string(),
                password: "secret".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn stale_balance_snapshot_cannot_overwrite() {
        let db = db_with_user("alice").await;
        let now = Utc::now();

        let stale = apply_balance_delta(&db, "alice", "USD", Money::new(1_000), now)
            .await
            .unwrap();
        assert_eq!(stale.version, 1);
        let fresh = apply_balance_delta(&db, "alice", "USD", Money::new(500), now)
            .await
            .unwrap();
        assert_eq!(fresh.version, 2);

        let err = write_balance(&db, &stale, Money::new(9_999), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification(_)));

        let stored = get_balance(&db, "alice", "USD").await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::new(1_500));
        assert_eq!(stored.version, 2);

        let written = write_balance(&db, &stored, Money::new(2_000), now)
            .await
            .unwrap();
        assert_eq!(written.version, 3);
    }

    #[tokio::test]
    async fn status_write_from_stale_status_is_refused() {
        let db = db_with_user("alice").await;
        let now = Utc::now();
        let tx = Transaction::new("alice", TransactionKind::Deposit, Money::new(1_000), "USD", now)
            .unwrap();
        insert_transaction(&db, &tx).await.unwrap();

        transition_status(
            &db,
            tx.id,
            TransactionStatus::Pending,
            TransactionStatus::Rejected,
            "admin",
            now,
        )
        .await
        .unwrap();
        let err = transition_status(
            &db,
            tx.id,
            TransactionStatus::Pending,
            TransactionStatus::Approved,
            "admin",
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification(_)));

        let stored = get_transaction(&db, tx.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Rejected);
    }

    #[test]
    fn cursor_round_trips() {
        let cursor = TransactionsCursor {
            created_at: Utc::now(),
            transaction_id: Uuid::new_v4().to_string(),
        };
        let encoded = cursor.encode().unwrap();
        let decoded = TransactionsCursor::decode(&encoded).unwrap();
        assert_eq!(decoded.created_at, cursor.created_at);
        assert_eq!(decoded.transaction_id, cursor.transaction_id);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            TransactionsCursor::decode("not a cursor!"),
            Err(EngineError::InvalidCursor(_))
        ));
    }
}
