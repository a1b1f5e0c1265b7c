use chrono::Utc;
use sea_orm::TransactionTrait;

use crate::{
    DepositCmd, EngineError, ResultEngine, Session, Transaction, TransactionKind, WithdrawalCmd,
    repo,
    util::normalize_optional_text,
};

use super::{
    Engine,
    access::require_active_user,
    currencies::require_enabled_currency,
    payment_methods::require_enabled_method,
    with_tx,
};

impl Engine {
    /// Files a pending deposit for the caller.
    ///
    /// The fee comes from the payment method's schedule; the balance only
    /// moves once an admin approves the request.
    pub async fn request_deposit(
        &self,
        session: &Session,
        cmd: DepositCmd,
    ) -> ResultEngine<Transaction> {
        let DepositCmd {
            amount,
            currency,
            method,
            description,
        } = cmd;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            require_active_user(&db_tx, &session.user_id).await?;
            let currency = require_enabled_currency(&db_tx, &currency).await?;
            let method = require_enabled_method(&db_tx, &method).await?;

            let mut tx = Transaction::new(
                &session.user_id,
                TransactionKind::Deposit,
                amount,
                &currency.code,
                now,
            )?;
            method.check_amount(amount)?;
            tx.fee = method.fees.fee(amount);
            tx.method = Some(method.id);
            tx.description = normalize_optional_text(description.as_deref());

            repo::insert_transaction(&db_tx, &tx).await?;
            tracing::info!(id = %tx.id, user = %tx.user_id, amount = %currency.format(tx.amount), "deposit requested");
            Ok::<_, EngineError>(tx)
        })
    }

    /// Files a pending withdrawal for the caller.
    ///
    /// The balance must cover the amount now and again when the request is
    /// approved. Only `amount` is debited: the fee is taken out of the payout
    /// (`total = amount - fee`), never charged on top of it.
    pub async fn request_withdrawal(
        &self,
        session: &Session,
        cmd: WithdrawalCmd,
    ) -> ResultEngine<Transaction> {
        let WithdrawalCmd {
            amount,
            currency,
            method,
            destination,
            description,
        } = cmd;
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            require_active_user(&db_tx, &session.user_id).await?;
            let currency = require_enabled_currency(&db_tx, &currency).await?;
            let method = require_enabled_method(&db_tx, &method).await?;

            let mut tx = Transaction::new(
                &session.user_id,
                TransactionKind::Withdrawal,
                amount,
                &currency.code,
                now,
            )?;
            method.check_amount(amount)?;

            let available = repo::get_balance(&db_tx, &session.user_id, &currency.code)
                .await?
                .map(|balance| balance.available())
                .unwrap_or_default();
            if available < amount {
                return Err(EngineError::InsufficientBalance(format!(
                    "available {}, requested {}",
                    currency.format(available),
                    currency.format(amount)
                )));
            }

            tx.fee = method.fees.fee(amount);
            tx.method = Some(method.id);
            tx.destination = normalize_optional_text(destination.as_deref());
            tx.description = normalize_optional_text(description.as_deref());

            repo::insert_transaction(&db_tx, &tx).await?;
            tracing::info!(id = %tx.id, user = %tx.user_id, amount = %currency.format(tx.amount), "withdrawal requested");
            Ok(tx)
        })
    }
}
