use sea_orm::{ConnectionTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, FeeDirection, FeeQuote, PaymentMethod, PaymentMethodUpdate, ResultEngine, Session,
    clamp_amount_input, payment_methods, quote,
    util::{normalize_optional_text, normalize_required},
};

use super::{Engine, with_tx};

pub(super) async fn find_payment_method<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> ResultEngine<Option<PaymentMethod>> {
    payment_methods::Entity::find_by_id(id.trim().to_ascii_lowercase())
        .one(db)
        .await?
        .map(PaymentMethod::try_from)
        .transpose()
}

pub(super) async fn require_enabled_method<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> ResultEngine<PaymentMethod> {
    let method = find_payment_method(db, id)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("payment method {id} not exists")))?;
    if !method.enabled {
        return Err(EngineError::InvalidAmount(format!(
            "payment method {} is disabled",
            method.name
        )));
    }
    Ok(method)
}

impl Engine {
    pub async fn list_payment_methods(
        &self,
        include_disabled: bool,
    ) -> ResultEngine<Vec<PaymentMethod>> {
        let mut query = payment_methods::Entity::find().order_by_asc(payment_methods::Column::Name);
        if !include_disabled {
            query = query.filter(payment_methods::Column::Enabled.eq(true));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(PaymentMethod::try_from)
            .collect()
    }

    pub async fn payment_method(&self, id: &str) -> ResultEngine<PaymentMethod> {
        find_payment_method(&self.database, id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("payment method {id} not exists")))
    }

    pub async fn add_payment_method(
        &self,
        session: &Session,
        method: PaymentMethod,
    ) -> ResultEngine<PaymentMethod> {
        session.require_admin()?;
        let method = PaymentMethod {
            enabled: method.enabled,
            ..PaymentMethod::new(
                &method.id,
                &method.name,
                method.fees,
                method.min_amount,
                normalize_optional_text(method.account_details.as_deref()),
            )?
        };
        with_tx!(self, |db_tx| {
            if find_payment_method(&db_tx, &method.id).await?.is_some() {
                Err(EngineError::ExistingKey(method.id.clone()))
            } else {
                payment_methods::ActiveModel::from(&method)
                    .insert(&db_tx)
                    .await?;
                tracing::info!(id = %method.id, actor = %session.user_id, "payment method added");
                Ok(method)
            }
        })
    }

    /// Applies a partial update to a payment method.
    pub async fn update_payment_method(
        &self,
        session: &Session,
        id: &str,
        update: PaymentMethodUpdate,
    ) -> ResultEngine<PaymentMethod> {
        session.require_admin()?;
        with_tx!(self, |db_tx| {
            let model = payment_methods::Entity::find_by_id(id.trim().to_ascii_lowercase())
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("payment method {id} not exists"))
                })?;
            let mut method = PaymentMethod::try_from(model.clone())?;

            if let Some(name) = &update.name {
                method.name = normalize_required(name, "payment method name")?;
            }
            if let Some(fees) = update.fees {
                fees.validate()?;
                method.fees = fees;
            }
            if let Some(min_amount) = update.min_amount {
                if min_amount.is_negative() {
                    return Err(EngineError::InvalidAmount(
                        "minimum amount must be >= 0".to_string(),
                    ));
                }
                method.min_amount = min_amount;
            }
            if let Some(details) = &update.account_details {
                method.account_details = normalize_optional_text(Some(details));
            }
            if let Some(enabled) = update.enabled {
                method.enabled = enabled;
            }

            let mut active = model.into_active_model();
            let changes = payment_methods::ActiveModel::from(&method);
            active.name = changes.name;
            active.fee_percent = changes.fee_percent;
            active.fixed_fee_minor = changes.fixed_fee_minor;
            active.min_amount_minor = changes.min_amount_minor;
            active.account_details = changes.account_details;
            active.enabled = changes.enabled;
            active.update(&db_tx).await?;
            tracing::info!(id = %method.id, actor = %session.user_id, "payment method updated");
            Ok(method)
        })
    }

    pub async fn set_payment_method_enabled(
        &self,
        session: &Session,
        id: &str,
        enabled: bool,
    ) -> ResultEngine<PaymentMethod> {
        let update = PaymentMethodUpdate {
            enabled: Some(enabled),
            ..PaymentMethodUpdate::default()
        };
        self.update_payment_method(session, id, update).await
    }

    /// Quotes fee and total for raw form input on a payment method.
    ///
    /// The amount is parsed with two fraction digits; unparsable input quotes
    /// as zero.
    pub async fn quote_fee(
        &self,
        method_id: &str,
        raw_amount: &str,
        direction: FeeDirection,
    ) -> ResultEngine<FeeQuote> {
        let method = self.payment_method(method_id).await?;
        let amount = clamp_amount_input(raw_amount, 2);
        Ok(quote(amount, &method.fees, direction))
    }
}
