//! Request identity
//!
//! Authentication happens outside this crate. Every operation that depends
//! on who is asking takes a [`Caller`], which is trusted as given.

use crate::Result;
use crate::commands::employee::{Role, User, UserRepository};
use crate::storage::Database;
use serde::{Deserialize, Serialize};

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub organization_id: String,
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(organization_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            organization_id: organization_id.into(),
            user_id: user_id.into(),
            role,
        }
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Caller::new(&user.organization_id, &user.id, user.role)
    }
}

/// Build a caller from a stored user id
///
/// Used by front-ends that identify the acting user by id only.
pub async fn resolve_caller(db: &Database, user_id: &str) -> Result<Caller> {
    UserRepository::new(db)
        .get(user_id)
        .await?
        .map(|user| Caller::from(&user))
        .ok_or_else(|| crate::Error::UserNotFound(user_id.to_string()))
}
