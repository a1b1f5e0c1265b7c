use std::collections::HashMap;

use sea_orm::{
    ActiveValue, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::Serialize;

use crate::{
    AccountStatus, Balance, EngineError, KycStatus, NewUser, ResultEngine, Role, Session, User,
    balances, users,
    util::{normalize_optional_text, normalize_required},
};

use super::{Engine, access::require_user, with_tx};

/// A user together with all of their balances, as shown in the admin console.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub user: User,
    pub balances: Vec<Balance>,
}

impl Engine {
    /// Registers a new account. The password is stored as a bcrypt hash.
    pub async fn create_user(&self, new_user: NewUser) -> ResultEngine<User> {
        let username = normalize_required(&new_user.username, "username")?;
        if username.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidId(format!(
                "username must not contain spaces: {username}"
            )));
        }
        if new_user.password.is_empty() {
            return Err(EngineError::InvalidAmount(
                "password must not be empty".to_string(),
            ));
        }
        let password_hash = bcrypt::hash(&new_user.password, self.password_cost)?;
        let new_user = NewUser {
            email: normalize_optional_text(new_user.email.as_deref()),
            display_name: normalize_optional_text(new_user.display_name.as_deref()),
            ..new_user
        };

        with_tx!(self, |db_tx| {
            let existing = users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                Err(EngineError::ExistingKey(username.clone()))
            } else {
                let model = users::ActiveModel::from_new(&new_user, username.clone(), password_hash)
                    .insert(&db_tx)
                    .await?;
                tracing::info!(%username, role = new_user.role.as_str(), "user created");
                User::try_from(model)
            }
        })
    }

    /// Returns a user's profile. Users only see themselves; admins see anyone.
    pub async fn user(&self, session: &Session, username: &str) -> ResultEngine<User> {
        if !session.can_read(username) {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        require_user(&self.database, username).await
    }

    /// Lists every user with their balances, ordered by username.
    pub async fn list_users(&self, session: &Session) -> ResultEngine<Vec<UserSummary>> {
        session.require_admin()?;

        let user_models = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.database)
            .await?;
        let balance_models = balances::Entity::find()
            .order_by_asc(balances::Column::Currency)
            .all(&self.database)
            .await?;

        let mut balances_by_user: HashMap<String, Vec<Balance>> = HashMap::new();
        for model in balance_models {
            let balance = Balance::from(model);
            balances_by_user
                .entry(balance.user_id.clone())
                .or_default()
                .push(balance);
        }

        user_models
            .into_iter()
            .map(|model| {
                let user = User::try_from(model)?;
                let balances = balances_by_user.remove(&user.username).unwrap_or_default();
                Ok(UserSummary { user, balances })
            })
            .collect()
    }

    /// Changes a user's role. Admins cannot change their own role.
    pub async fn set_user_role(
        &self,
        session: &Session,
        username: &str,
        role: Role,
    ) -> ResultEngine<User> {
        session.require_admin()?;
        if session.user_id == username {
            return Err(EngineError::Forbidden(
                "cannot change your own role".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            let mut active = model.into_active_model();
            active.role = ActiveValue::Set(role.as_str().to_string());
            let model = active.update(&db_tx).await?;
            tracing::info!(%username, role = role.as_str(), actor = %session.user_id, "role changed");
            User::try_from(model)
        })
    }

    /// Activates or suspends an account. Admins cannot suspend themselves.
    pub async fn set_user_status(
        &self,
        session: &Session,
        username: &str,
        status: AccountStatus,
    ) -> ResultEngine<User> {
        session.require_admin()?;
        if session.user_id == username {
            return Err(EngineError::Forbidden(
                "cannot change your own account status".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            let mut active = model.into_active_model();
            active.status = ActiveValue::Set(status.as_str().to_string());
            let model = active.update(&db_tx).await?;
            tracing::info!(%username, status = status.as_str(), actor = %session.user_id, "account status changed");
            User::try_from(model)
        })
    }

    /// Submits the caller's KYC documents for review.
    pub async fn submit_kyc(&self, session: &Session) -> ResultEngine<User> {
        let user = require_user(&self.database, &session.user_id).await?;
        let next = user.kyc_status.submit()?;
        self.write_kyc(&user, next).await
    }

    /// Approves or rejects a pending KYC submission.
    pub async fn review_kyc(
        &self,
        session: &Session,
        username: &str,
        approve: bool,
    ) -> ResultEngine<User> {
        session.require_admin()?;
        let user = require_user(&self.database, username).await?;
        let next = user.kyc_status.review(approve)?;
        let user = self.write_kyc(&user, next).await?;
        tracing::info!(%username, kyc = next.as_str(), actor = %session.user_id, "kyc reviewed");
        Ok(user)
    }

    /// Stores a KYC transition, guarded by the status it was computed from.
    async fn write_kyc(&self, user: &User, next: KycStatus) -> ResultEngine<User> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::KycStatus, Expr::value(next.as_str()))
            .filter(users::Column::Username.eq(user.username.clone()))
            .filter(users::Column::KycStatus.eq(user.kyc_status.as_str()))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::ConcurrentModification(format!(
                "kyc status of {} changed concurrently",
                user.username
            )));
        }
        Ok(User {
            kyc_status: next,
            ..user.clone()
        })
    }
}
