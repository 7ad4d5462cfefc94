//! Employee management
//!
//! Users belong to exactly one organization. Only DEVELOPER users take part
//! in automatic ticket assignment; their skills are read by the ranking
//! engine and written only through `set_skills`.

use crate::Result;
use crate::commands::{normalize_set, title_case};
use crate::storage::{Database, decode_enum, decode_list, encode_list};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, organization_id, name, email, role, skills, created_at, updated_at";

/// Employee role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Developer,
    Moderator,
}

impl Role {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Developer => "DEVELOPER",
            Role::Moderator => "MODERATOR",
        }
    }

    /// Parse a role name, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "MANAGER" => Some(Role::Manager),
            "DEVELOPER" => Some(Role::Developer),
            "MODERATOR" => Some(Role::Moderator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::parse(s).ok_or_else(|| {
            crate::Error::InvalidInput(format!(
                "Unknown role '{}'. Valid roles: ADMIN, MANAGER, DEVELOPER, MODERATOR",
                s
            ))
        })
    }
}

/// An employee of an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Lower-cased, unique across all organizations
    pub email: String,
    pub role: Role,
    /// Free-form skill tags, e.g. "React" or "Go"
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.into(),
            name: name.into(),
            email: email.into(),
            role,
            skills: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = normalize_set(skills);
        self
    }
}

/// User repository for database operations
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, user: &User) -> Result<()> {
        insert(self.db.pool(), user).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(row_to_user).transpose()
    }

    /// List users of an organization, optionally restricted to one role
    pub async fn list_by_organization(
        &self,
        organization_id: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>> {
        let rows = if let Some(role) = role {
            sqlx::query(&format!(
                "SELECT {} FROM users WHERE organization_id = ? AND role = ? ORDER BY created_at, id",
                USER_COLUMNS
            ))
            .bind(organization_id)
            .bind(role.as_str())
            .fetch_all(self.db.pool())
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {} FROM users WHERE organization_id = ? ORDER BY created_at, id",
                USER_COLUMNS
            ))
            .bind(organization_id)
            .fetch_all(self.db.pool())
            .await?
        };

        rows.into_iter().map(row_to_user).collect()
    }

    /// Developers of an organization, oldest first then by id
    ///
    /// This order is the ranking engine's tie-break.
    pub async fn list_developers(&self, organization_id: &str) -> Result<Vec<User>> {
        self.list_by_organization(organization_id, Some(Role::Developer))
            .await
    }

    /// Replace a user's skill set
    pub async fn set_skills(&self, id: &str, skills: &[String]) -> Result<bool> {
        let skills = normalize_set(skills.iter().cloned());
        let result = sqlx::query("UPDATE users SET skills = ?, updated_at = ? WHERE id = ?")
            .bind(encode_list(&skills))
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) async fn insert<'e>(executor: impl SqliteExecutor<'e>, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, organization_id, name, email, role, skills, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.organization_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(encode_list(&user.skills))
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        email: row.get("email"),
        role: decode_enum(&row, "role", Role::parse)?,
        skills: decode_list(row.get("skills")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// Public API functions
// ============================================================================

/// Create an employee in an organization
pub async fn create_with_db(
    db: &Database,
    organization_id: &str,
    name: &str,
    email: &str,
    role: Role,
    skills: Vec<String>,
) -> Result<User> {
    if name.trim().is_empty() {
        return Err(crate::Error::InvalidInput("Employee name is required".to_string()));
    }
    if crate::commands::organization::email_extension(email).is_none() {
        return Err(crate::Error::InvalidInput(format!("Invalid email address: {}", email)));
    }

    let organizations = crate::commands::organization::OrganizationRepository::new(db);
    if organizations.get(organization_id).await?.is_none() {
        return Err(crate::Error::OrganizationNotFound(organization_id.to_string()));
    }

    let repo = UserRepository::new(db);
    let email = email.trim().to_lowercase();
    if repo.get_by_email(&email).await?.is_some() {
        return Err(crate::Error::EmailTaken(email));
    }

    let user = User::new(organization_id, title_case(name.trim()), email, role).with_skills(skills);
    repo.create(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Employee created");
    Ok(user)
}

/// List employees, optionally by role
pub async fn list_with_db(
    db: &Database,
    organization_id: &str,
    role: Option<Role>,
) -> Result<Vec<User>> {
    UserRepository::new(db)
        .list_by_organization(organization_id, role)
        .await
}

/// Replace a user's skills and return the updated user
pub async fn set_skills_with_db(db: &Database, user_id: &str, skills: &[String]) -> Result<User> {
    let repo = UserRepository::new(db);
    if !repo.set_skills(user_id, skills).await? {
        return Err(crate::Error::UserNotFound(user_id.to_string()));
    }
    repo.get(user_id)
        .await?
        .ok_or_else(|| crate::Error::UserNotFound(user_id.to_string()))
}
