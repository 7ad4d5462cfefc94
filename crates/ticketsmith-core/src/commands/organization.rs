//! Organization registration
//!
//! An organization is the tenant boundary. It is registered together with
//! its first ADMIN user and is not modified afterwards.

use crate::Result;
use crate::commands::employee::{self, Role, User};
use crate::commands::title_case;
use crate::storage::{Database, decode_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteExecutor;
use tracing::info;
use uuid::Uuid;

/// Email domains shared by unrelated people; several organizations may use them
const PUBLIC_EMAIL_DOMAINS: &[&str] = &["gmail.com"];

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    #[default]
    Hobby,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Hobby => "HOBBY",
            Plan::Pro => "PRO",
            Plan::Enterprise => "ENTERPRISE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HOBBY" => Some(Plan::Hobby),
            "PRO" => Some(Plan::Pro),
            "ENTERPRISE" => Some(Plan::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Email domain the organization registered from
    pub extension: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            extension: extension.into(),
            plan: Plan::Hobby,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub organization: Organization,
    pub admin: User,
}

/// Organization repository for database operations
pub struct OrganizationRepository<'a> {
    db: &'a Database,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, organization: &Organization) -> Result<()> {
        insert(self.db.pool(), organization).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Organization>> {
        let row = sqlx::query(
            "SELECT id, name, extension, plan, created_at, updated_at FROM organizations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(row_to_organization).transpose()
    }

    pub async fn find_by_extension(&self, extension: &str) -> Result<Option<Organization>> {
        let row = sqlx::query(
            "SELECT id, name, extension, plan, created_at, updated_at FROM organizations WHERE extension = ? ORDER BY created_at LIMIT 1",
        )
        .bind(extension)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(row_to_organization).transpose()
    }

    pub async fn exists_with_name(&self, name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM organizations WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }
}

async fn insert<'e>(executor: impl SqliteExecutor<'e>, organization: &Organization) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO organizations (id, name, extension, plan, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&organization.id)
    .bind(&organization.name)
    .bind(&organization.extension)
    .bind(organization.plan.as_str())
    .bind(organization.created_at)
    .bind(organization.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

fn row_to_organization(row: sqlx::sqlite::SqliteRow) -> Result<Organization> {
    Ok(Organization {
        id: row.get("id"),
        name: row.get("name"),
        extension: row.get("extension"),
        plan: decode_enum(&row, "plan", Plan::parse)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Domain part of an email address, lower-cased
pub fn email_extension(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    Some(domain.to_lowercase())
}

/// Register a new organization together with its ADMIN user
///
/// A second organization from the same email domain is refused, except for
/// public mail domains.
pub async fn register_with_db(
    db: &Database,
    org_name: &str,
    admin_name: &str,
    admin_email: &str,
) -> Result<Registration> {
    let org_name = org_name.trim();
    if org_name.is_empty() {
        return Err(crate::Error::InvalidInput("Organization name is required".to_string()));
    }
    if admin_name.trim().is_empty() {
        return Err(crate::Error::InvalidInput("Admin name is required".to_string()));
    }
    let extension = email_extension(admin_email).ok_or_else(|| {
        crate::Error::InvalidInput(format!("Invalid email address: {}", admin_email))
    })?;

    let repo = OrganizationRepository::new(db);
    if !PUBLIC_EMAIL_DOMAINS.contains(&extension.as_str())
        && repo.find_by_extension(&extension).await?.is_some()
    {
        return Err(crate::Error::OrganizationExists(extension));
    }
    if repo.exists_with_name(org_name).await? {
        return Err(crate::Error::OrganizationExists(org_name.to_string()));
    }

    let email = admin_email.trim().to_lowercase();
    if employee::UserRepository::new(db).get_by_email(&email).await?.is_some() {
        return Err(crate::Error::EmailTaken(email));
    }

    let organization = Organization::new(org_name, &extension);
    let admin = User::new(&organization.id, title_case(admin_name.trim()), email, Role::Admin);

    let mut tx = db.pool().begin().await?;
    insert(&mut *tx, &organization).await?;
    employee::insert(&mut *tx, &admin).await?;
    tx.commit().await?;

    info!(
        organization_id = %organization.id,
        extension = %organization.extension,
        "Organization registered"
    );

    Ok(Registration {
        organization,
        admin,
    })
}
