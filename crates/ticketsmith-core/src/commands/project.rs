//! Project management commands
//!
//! Provides creation, lookup and role-scoped listing of projects.

use crate::Result;
use crate::commands::employee::{Role, UserRepository};
use crate::commands::{normalize_set, title_case};
use crate::identity::Caller;
use crate::storage::{Database, decode_enum, decode_list, encode_list};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

const TITLE_LEN: std::ops::RangeInclusive<usize> = 3..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 10..=1000;

const PROJECT_COLUMNS: &str = "id, organization_id, title, description, manager_id, techlead_id, techstack, status, is_active, start_date, created_at, updated_at";

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Completed,
    OnHold,
}

impl ProjectStatus {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::InProgress => "INPROGRESS",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::OnHold => "ONHOLD",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLANNING" => Some(ProjectStatus::Planning),
            "INPROGRESS" => Some(ProjectStatus::InProgress),
            "COMPLETED" => Some(ProjectStatus::Completed),
            "ONHOLD" => Some(ProjectStatus::OnHold),
            _ => None,
        }
    }
}

/// A project owned by an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub organization_id: String,
    /// Unique within the organization
    pub title: String,
    pub description: String,
    pub manager_id: Option<String>,
    pub techlead_id: Option<String>,
    /// Merged into the tags of every ticket created under the project
    pub techstack: Vec<String>,
    /// Developer user ids
    pub contributors: Vec<String>,
    pub status: ProjectStatus,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`create_with_db`]
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub manager_id: String,
    pub techlead_id: String,
    pub techstack: Vec<String>,
    pub contributors: Vec<String>,
}

/// Project repository for database operations
pub struct ProjectRepository<'a> {
    db: &'a Database,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a project and its contributor rows in one transaction
    pub async fn create(&self, project: &Project) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, organization_id, title, description, manager_id, techlead_id,
                                  techstack, status, is_active, start_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.id)
        .bind(&project.organization_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.manager_id)
        .bind(&project.techlead_id)
        .bind(encode_list(&project.techstack))
        .bind(project.status.as_str())
        .bind(project.is_active)
        .bind(project.start_date)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;

        for user_id in &project.contributors {
            sqlx::query("INSERT INTO project_contributors (project_id, user_id) VALUES (?, ?)")
                .bind(&project.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_contributors(row_to_project(row)?).await?)),
            None => Ok(None),
        }
    }

    pub async fn exists_with_title(&self, organization_id: &str, title: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM projects WHERE organization_id = ? AND title = ?")
            .bind(organization_id)
            .bind(title)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    pub async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE organization_id = ? ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(organization_id)
        .fetch_all(self.db.pool())
        .await?;

        self.hydrate(rows).await
    }

    pub async fn list_by_manager(&self, manager_id: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE manager_id = ? ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(manager_id)
        .fetch_all(self.db.pool())
        .await?;

        self.hydrate(rows).await
    }

    pub async fn list_by_contributor(&self, user_id: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM projects
            WHERE id IN (SELECT project_id FROM project_contributors WHERE user_id = ?)
            ORDER BY created_at DESC
            "#,
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        self.hydrate(rows).await
    }

    async fn contributors(&self, project_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT user_id FROM project_contributors WHERE project_id = ? ORDER BY added_at, user_id",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|row| row.get("user_id")).collect())
    }

    async fn with_contributors(&self, mut project: Project) -> Result<Project> {
        project.contributors = self.contributors(&project.id).await?;
        Ok(project)
    }

    async fn hydrate(&self, rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Project>> {
        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(self.with_contributors(row_to_project(row)?).await?);
        }
        Ok(projects)
    }
}

fn row_to_project(row: sqlx::sqlite::SqliteRow) -> Result<Project> {
    Ok(Project {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        title: row.get("title"),
        description: row
            .get::<Option<String>, _>("description")
            .unwrap_or_default(),
        manager_id: row.get("manager_id"),
        techlead_id: row.get("techlead_id"),
        techstack: decode_list(row.get("techstack")),
        contributors: Vec::new(),
        status: decode_enum(&row, "status", ProjectStatus::parse)?,
        is_active: row.get("is_active"),
        start_date: row.get("start_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// Public API functions
// ============================================================================

/// Create a project in an organization
///
/// Title and description are trimmed and length-checked; the title is
/// normalised to capitalised words. Manager, tech lead and contributors
/// must belong to the organization.
pub async fn create_with_db(db: &Database, organization_id: &str, new: NewProject) -> Result<Project> {
    let title = title_case(new.title.trim());
    let description = new.description.trim().to_string();

    if !TITLE_LEN.contains(&title.chars().count()) {
        return Err(crate::Error::InvalidInput(format!(
            "Project title must be between {} and {} characters",
            TITLE_LEN.start(),
            TITLE_LEN.end()
        )));
    }
    if !DESCRIPTION_LEN.contains(&description.chars().count()) {
        return Err(crate::Error::InvalidInput(format!(
            "Project description must be between {} and {} characters",
            DESCRIPTION_LEN.start(),
            DESCRIPTION_LEN.end()
        )));
    }

    let users = UserRepository::new(db);
    let contributors = normalize_set(new.contributors);
    for user_id in [&new.manager_id, &new.techlead_id]
        .into_iter()
        .chain(contributors.iter())
    {
        let belongs = users
            .get(user_id)
            .await?
            .is_some_and(|u| u.organization_id == organization_id);
        if !belongs {
            return Err(crate::Error::UserNotFound(user_id.clone()));
        }
    }

    let repo = ProjectRepository::new(db);
    if repo.exists_with_title(organization_id, &title).await? {
        return Err(crate::Error::DuplicateProject(title));
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        organization_id: organization_id.to_string(),
        title,
        description,
        manager_id: Some(new.manager_id),
        techlead_id: Some(new.techlead_id),
        techstack: normalize_set(new.techstack),
        contributors,
        status: ProjectStatus::Planning,
        is_active: true,
        start_date: now,
        created_at: now,
        updated_at: now,
    };
    repo.create(&project).await?;

    tracing::info!(project_id = %project.id, title = %project.title, "Project created");
    Ok(project)
}

/// Look up a project
pub async fn get_with_db(db: &Database, project_id: &str) -> Result<Project> {
    ProjectRepository::new(db)
        .get(project_id)
        .await?
        .ok_or_else(|| crate::Error::ProjectNotFound(project_id.to_string()))
}

/// Projects visible to the caller
///
/// Admins see every project of their organization, managers the projects
/// they manage and developers the projects they contribute to. Moderators
/// see nothing.
pub async fn list_for_caller(db: &Database, caller: &Caller) -> Result<Vec<Project>> {
    let repo = ProjectRepository::new(db);
    let projects = match caller.role {
        Role::Admin => repo.list_by_organization(&caller.organization_id).await?,
        Role::Manager => repo.list_by_manager(&caller.user_id).await?,
        Role::Developer => repo.list_by_contributor(&caller.user_id).await?,
        Role::Moderator => Vec::new(),
    };

    Ok(projects
        .into_iter()
        .filter(|p| p.organization_id == caller.organization_id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testing::Fixture;

    fn new_project(fx: &Fixture, title: &str) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: "An internal customer portal".to_string(),
            manager_id: fx.admin.id.clone(),
            techlead_id: fx.admin.id.clone(),
            techstack: vec!["Go".into(), "Docker".into()],
            contributors: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_normalises_title() {
        let fx = Fixture::new().await;
        let project = create_with_db(&fx.db, &fx.organization.id, new_project(&fx, "  web PORTAL "))
            .await
            .unwrap();

        assert_eq!(project.title, "Web Portal");
        assert_eq!(project.status, ProjectStatus::Planning);
        assert!(project.is_active);

        let stored = get_with_db(&fx.db, &project.id).await.unwrap();
        assert_eq!(stored.techstack, vec!["Go", "Docker"]);
    }

    #[tokio::test]
    async fn test_create_validates_lengths() {
        let fx = Fixture::new().await;

        let err = create_with_db(&fx.db, &fx.organization.id, new_project(&fx, "ab"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut short = new_project(&fx, "Valid Title");
        short.description = "   too short   ".to_string();
        let err = create_with_db(&fx.db, &fx.organization.id, short).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_duplicate_title_conflicts() {
        let fx = Fixture::new().await;
        // The fixture already owns "Platform"
        let err = create_with_db(&fx.db, &fx.organization.id, new_project(&fx, "platform"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_manager_from_other_org_rejected() {
        let fx = Fixture::new().await;
        let mut input = new_project(&fx, "Billing");
        input.manager_id = "someone-else".to_string();
        let err = create_with_db(&fx.db, &fx.organization.id, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_scoped_by_role() {
        let fx = Fixture::new().await;
        let dev = fx.developer("Grace", &["Go"]).await;
        let manager = fx.employee("Linus", Role::Manager).await;
        let moderator = fx.employee("Mod", Role::Moderator).await;

        let mut input = new_project(&fx, "Billing");
        input.manager_id = manager.id.clone();
        input.contributors = vec![dev.id.clone()];
        let billing = create_with_db(&fx.db, &fx.organization.id, input).await.unwrap();
        assert_eq!(billing.contributors, vec![dev.id.clone()]);

        let admin_view = list_for_caller(&fx.db, &fx.caller(&fx.admin)).await.unwrap();
        assert_eq!(admin_view.len(), 2);

        let dev_view = list_for_caller(&fx.db, &fx.caller(&dev)).await.unwrap();
        assert_eq!(dev_view.len(), 1);
        assert_eq!(dev_view[0].id, billing.id);
        assert_eq!(dev_view[0].contributors, vec![dev.id.clone()]);

        let manager_view = list_for_caller(&fx.db, &fx.caller(&manager)).await.unwrap();
        assert_eq!(manager_view.len(), 1);

        let moderator_view = list_for_caller(&fx.db, &fx.caller(&moderator)).await.unwrap();
        assert!(moderator_view.is_empty());
    }
}
