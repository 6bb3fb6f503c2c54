use serde::{Deserialize, Serialize};

use accessdesk_core::UserId;

use crate::Role;

/// An authenticated user plus its role, as handed over by the auth
/// collaborator for the duration of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.user_id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// A user as known to the directory (created at signup, owned elsewhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}
