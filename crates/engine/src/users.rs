//! Users, roles and KYC state.
//!
//! The engine keys everything by `username`. Identity proofing itself lives
//! outside the engine; only the review status is tracked here.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(EngineError::InvalidId(format!("invalid role: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

impl TryFrom<&str> for AccountStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            other => Err(EngineError::InvalidId(format!(
                "invalid account status: {other}"
            ))),
        }
    }
}

/// Review state of a user's identity verification.
///
/// ```text
/// not_started ──submit──▶ pending ──approve──▶ approved
///      rejected ──submit──▶ │
///                          └──reject───▶ rejected
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Next state after the user submits (or resubmits) their documents.
    pub fn submit(self) -> ResultEngine<Self> {
        match self {
            Self::NotStarted | Self::Rejected => Ok(Self::Pending),
            other => Err(EngineError::InvalidStateTransition(format!(
                "cannot submit KYC while {}",
                other.as_str()
            ))),
        }
    }

    /// Next state after an admin review.
    pub fn review(self, approve: bool) -> ResultEngine<Self> {
        match (self, approve) {
            (Self::Pending, true) => Ok(Self::Approved),
            (Self::Pending, false) => Ok(Self::Rejected),
            (other, _) => Err(EngineError::InvalidStateTransition(format!(
                "cannot review KYC while {}",
                other.as_str()
            ))),
        }
    }
}

impl TryFrom<&str> for KycStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "not_started" => Ok(Self::NotStarted),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidId(format!("invalid kyc status: {other}"))),
        }
    }
}

/// A user account, without its credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub kyc_status: KycStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for `Engine::create_user`.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: String,
    pub status: String,
    pub kyc_status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            role: Role::try_from(model.role.as_str())?,
            status: AccountStatus::try_from(model.status.as_str())?,
            kyc_status: KycStatus::try_from(model.kyc_status.as_str())?,
            username: model.username,
            email: model.email,
            display_name: model.display_name,
            created_at: model.created_at,
        })
    }
}

impl ActiveModel {
    pub(crate) fn from_new(user: &NewUser, username: String, password_hash: String) -> Self {
        Self {
            username: ActiveValue::Set(username),
            password_hash: ActiveValue::Set(password_hash),
            email: ActiveValue::Set(user.email.clone()),
            display_name: ActiveValue::Set(user.display_name.clone()),
            role: ActiveValue::Set(user.role.as_str().to_string()),
            status: ActiveValue::Set(AccountStatus::Active.as_str().to_string()),
            kyc_status: ActiveValue::Set(KycStatus::NotStarted.as_str().to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kyc_submit_from_fresh_or_rejected() {
        assert_eq!(KycStatus::NotStarted.submit().unwrap(), KycStatus::Pending);
        assert_eq!(KycStatus::Rejected.submit().unwrap(), KycStatus::Pending);
        assert!(KycStatus::Pending.submit().is_err());
        assert!(KycStatus::Approved.submit().is_err());
    }

    #[test]
    fn kyc_review_only_when_pending() {
        assert_eq!(KycStatus::Pending.review(true).unwrap(), KycStatus::Approved);
        assert_eq!(KycStatus::Pending.review(false).unwrap(), KycStatus::Rejected);
        assert!(matches!(
            KycStatus::Approved.review(false),
            Err(EngineError::InvalidStateTransition(_))
        ));
        assert!(KycStatus::NotStarted.review(true).is_err());
    }

    #[test]
    fn role_round_trips_through_storage_string() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::try_from(role.as_str()).unwrap(), role);
        }
        assert!(Role::try_from("root").is_err());
    }
}
