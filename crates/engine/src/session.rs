//! Authenticated caller passed explicitly into every engine operation.

use crate::{EngineError, ResultEngine, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub(crate) fn require_admin(&self) -> ResultEngine<()> {
        if !self.is_admin() {
            return Err(EngineError::Forbidden("admin role required".to_string()));
        }
        Ok(())
    }

    /// Whether the caller may read data owned by `owner`.
    pub(crate) fn can_read(&self, owner: &str) -> bool {
        self.is_admin() || self.user_id == owner
    }
}
