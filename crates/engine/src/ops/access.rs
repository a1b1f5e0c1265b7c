use sea_orm::{ConnectionTrait, prelude::*};

use crate::{AccountStatus, EngineError, ResultEngine, Session, User, users};

use super::Engine;

impl Engine {
    /// Checks a username/password pair and returns the caller's [`Session`].
    ///
    /// Unknown users, wrong passwords and suspended accounts all yield
    /// [`EngineError::Unauthorized`].
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Session> {
        let invalid = || EngineError::Unauthorized("invalid credentials".to_string());

        let model = users::Entity::find_by_id(username.trim().to_string())
            .one(&self.database)
            .await?
            .ok_or_else(invalid)?;
        if !bcrypt::verify(password, &model.password_hash)? {
            return Err(invalid());
        }

        let user = User::try_from(model)?;
        if user.status == AccountStatus::Suspended {
            return Err(EngineError::Unauthorized("account suspended".to_string()));
        }
        Ok(Session::new(user.username, user.role))
    }
}

pub(super) async fn require_user<C: ConnectionTrait>(db: &C, username: &str) -> ResultEngine<User> {
    users::Entity::find_by_id(username.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
        .and_then(User::try_from)
}

/// Like [`require_user`], but suspended accounts cannot move money.
pub(super) async fn require_active_user<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> ResultEngine<User> {
    let user = require_user(db, username).await?;
    if user.status == AccountStatus::Suspended {
        return Err(EngineError::Forbidden(format!(
            "account {username} is suspended"
        )));
    }
    Ok(user)
}
