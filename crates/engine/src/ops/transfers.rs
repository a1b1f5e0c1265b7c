use chrono::Utc;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Session, Transaction, TransactionKind, TransactionStatus,
    TransferCmd, repo,
    util::{normalize_optional_text, normalize_required},
};

use super::{
    Engine, access::require_active_user, currencies::require_enabled_currency, with_tx,
};

impl Engine {
    /// Moves money from the caller to another user.
    ///
    /// Both legs are written as approved transactions sharing one `reference`
    /// and both balances move in the same database transaction. Returns
    /// `(outgoing, incoming)`.
    pub async fn transfer_funds(
        &self,
        session: &Session,
        cmd: TransferCmd,
    ) -> ResultEngine<(Transaction, Transaction)> {
        let TransferCmd {
            to,
            amount,
            currency,
            description,
        } = cmd;
        let to = normalize_required(&to, "recipient")?;
        if to == session.user_id {
            return Err(EngineError::InvalidAmount(
                "cannot transfer to yourself".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        let description = normalize_optional_text(description.as_deref());
        let now = Utc::now();
        let reference = Uuid::new_v4().to_string();

        let legs = with_tx!(self, |db_tx| {
            require_active_user(&db_tx, &session.user_id).await?;
            require_active_user(&db_tx, &to).await?;
            let currency = require_enabled_currency(&db_tx, &currency).await?;

            let leg = |user: &str, counterparty: &str, kind: TransactionKind| -> ResultEngine<Transaction> {
                let mut tx = Transaction::new(user, kind, amount, &currency.code, now)?;
                tx.status = TransactionStatus::Approved;
                tx.counterparty = Some(counterparty.to_string());
                tx.reference = Some(reference.clone());
                tx.description = description.clone();
                tx.decided_at = Some(now);
                tx.decided_by = Some(session.user_id.clone());
                Ok(tx)
            };
            let outgoing = leg(&session.user_id, &to, TransactionKind::TransferOut)?;
            let incoming = leg(&to, &session.user_id, TransactionKind::TransferIn)?;

            repo::apply_balance_delta(
                &db_tx,
                &outgoing.user_id,
                &currency.code,
                outgoing.signed_amount(),
                now,
            )
            .await?;
            repo::apply_balance_delta(
                &db_tx,
                &incoming.user_id,
                &currency.code,
                incoming.signed_amount(),
                now,
            )
            .await?;
            repo::insert_transaction(&db_tx, &outgoing).await?;
            repo::insert_transaction(&db_tx, &incoming).await?;

            tracing::info!(
                %reference,
                from = %session.user_id,
                %to,
                amount = %currency.format(amount),
                "transfer completed"
            );
            Ok::<_, EngineError>((outgoing, incoming))
        })?;

        Ok(legs)
    }
}
