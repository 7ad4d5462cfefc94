//! Ticket records and their repository
//!
//! Tickets move through a fixed cycle:
//! INPROGRESS -> INTESTING -> COMPLETED -> INPROGRESS.
//! New tickets always start in INPROGRESS.

use crate::Result;
use crate::storage::{Database, decode_enum, decode_list, encode_list};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

const TICKET_COLUMNS: &str = "id, project_id, title, description, status, priority, creator_id, developer_id, tags, created_at, updated_at";

/// Ticket workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    InProgress,
    InTesting,
    Completed,
}

impl TicketStatus {
    /// Board order
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::InProgress,
        TicketStatus::InTesting,
        TicketStatus::Completed,
    ];

    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::InProgress => "INPROGRESS",
            TicketStatus::InTesting => "INTESTING",
            TicketStatus::Completed => "COMPLETED",
        }
    }

    /// Parse a status name
    ///
    /// Accepts the stored form as well as `in-progress`, `in_progress` and
    /// `In Progress`, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "INPROGRESS" => Some(TicketStatus::InProgress),
            "INTESTING" => Some(TicketStatus::InTesting),
            "COMPLETED" => Some(TicketStatus::Completed),
            _ => None,
        }
    }

    /// The status that follows this one in the workflow cycle
    pub fn next(self) -> Self {
        match self {
            TicketStatus::InProgress => TicketStatus::InTesting,
            TicketStatus::InTesting => TicketStatus::Completed,
            TicketStatus::Completed => TicketStatus::InProgress,
        }
    }

    /// Board column id
    pub fn column_id(&self) -> &'static str {
        match self {
            TicketStatus::InProgress => "in-progress",
            TicketStatus::InTesting => "in-testing",
            TicketStatus::Completed => "completed",
        }
    }

    /// Board column title
    pub fn column_title(&self) -> &'static str {
        match self {
            TicketStatus::InProgress => "In Progress",
            TicketStatus::InTesting => "In Testing",
            TicketStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        TicketStatus::parse(s).ok_or_else(|| {
            crate::Error::InvalidInput(format!(
                "Unknown ticket status '{}'. Valid statuses: INPROGRESS, INTESTING, COMPLETED",
                s
            ))
        })
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }

    /// Parse a priority, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub creator_id: String,
    /// `None` only when the organization had no developers at creation time
    pub developer_id: Option<String>,
    /// Ordered; duplicates allowed
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to write a new ticket
///
/// There is no status field: every new ticket starts in INPROGRESS.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub creator_id: String,
    pub developer_id: Option<String>,
    pub tags: Vec<String>,
}

/// Ticket repository for database operations
pub struct TicketRepository<'a> {
    db: &'a Database,
}

impl<'a> TicketRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a ticket in a single statement and return it
    pub async fn create(&self, new: &NewTicket) -> Result<Ticket> {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            project_id: new.project_id.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: TicketStatus::InProgress,
            priority: new.priority,
            creator_id: new.creator_id.clone(),
            developer_id: new.developer_id.clone(),
            tags: new.tags.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tickets (id, project_id, title, description, status, priority,
                                 creator_id, developer_id, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.project_id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(&ticket.creator_id)
        .bind(&ticket.developer_id)
        .bind(encode_list(&ticket.tags))
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(ticket)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Ticket>> {
        let row = sqlx::query(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(row_to_ticket).transpose()
    }

    /// Tickets of a project, oldest first
    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE project_id = ? ORDER BY created_at, id",
            TICKET_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(row_to_ticket).collect()
    }

    /// Move a ticket from `from` to `to`
    ///
    /// Returns false when the ticket does not exist or is no longer in `from`.
    pub(crate) async fn update_status(
        &self,
        id: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tickets SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(from.as_str())
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_project(&self, project_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Number of tickets assigned to each developer of an organization, any status
    ///
    /// Developers without tickets are absent from the map.
    pub async fn assigned_counts(&self, organization_id: &str) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT t.developer_id AS developer_id, COUNT(*) AS assigned
            FROM tickets t
            JOIN users u ON u.id = t.developer_id
            WHERE u.organization_id = ? AND u.role = 'DEVELOPER'
            GROUP BY t.developer_id
            "#,
        )
        .bind(organization_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("developer_id"), row.get("assigned")))
            .collect())
    }
}

fn row_to_ticket(row: sqlx::sqlite::SqliteRow) -> Result<Ticket> {
    Ok(Ticket {
        id: row.get("id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: decode_enum(&row, "status", TicketStatus::parse)?,
        priority: decode_enum(&row, "priority", Priority::parse)?,
        creator_id: row.get("creator_id"),
        developer_id: row.get("developer_id"),
        tags: decode_list(row.get("tags")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_status_cycle() {
        let start = TicketStatus::InProgress;
        assert_eq!(start.next(), TicketStatus::InTesting);
        assert_eq!(start.next().next(), TicketStatus::Completed);
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_status_parse_variants() {
        assert_eq!(TicketStatus::parse("INPROGRESS"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("in-testing"), Some(TicketStatus::InTesting));
        assert_eq!(TicketStatus::parse("In Progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("completed"), Some(TicketStatus::Completed));
        assert_eq!(TicketStatus::parse("BLOCKED"), None);

        let err = "BLOCKED".parse::<TicketStatus>().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse(" Low "), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn test_board_columns() {
        let ids: Vec<_> = TicketStatus::ALL.iter().map(|s| s.column_id()).collect();
        assert_eq!(ids, vec!["in-progress", "in-testing", "completed"]);
        assert_eq!(TicketStatus::InTesting.column_title(), "In Testing");
    }

    #[tokio::test]
    async fn test_create_forces_inprogress_and_keeps_tag_order() {
        let fx = Fixture::new().await;
        let repo = TicketRepository::new(&fx.db);

        let ticket = repo
            .create(&NewTicket {
                project_id: fx.project.id.clone(),
                title: "Fix login".to_string(),
                description: "Users cannot log in".to_string(),
                priority: Priority::High,
                creator_id: fx.admin.id.clone(),
                developer_id: None,
                tags: vec!["Go".into(), "Go".into(), "Docker".into()],
            })
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);

        let stored = repo.get(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::InProgress);
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.developer_id, None);
        assert_eq!(stored.tags, vec!["Go", "Go", "Docker"]);
        assert_eq!(repo.count_for_project(&fx.project.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_status_requires_expected_current() {
        let fx = Fixture::new().await;
        let repo = TicketRepository::new(&fx.db);
        let ticket = fx.ticket_for(None).await;

        assert!(!repo
            .update_status("missing", TicketStatus::InProgress, TicketStatus::InTesting)
            .await
            .unwrap());
        assert!(!repo
            .update_status(&ticket.id, TicketStatus::InTesting, TicketStatus::Completed)
            .await
            .unwrap());
        assert!(repo
            .update_status(&ticket.id, TicketStatus::InProgress, TicketStatus::InTesting)
            .await
            .unwrap());
        assert_eq!(
            repo.get(&ticket.id).await.unwrap().unwrap().status,
            TicketStatus::InTesting
        );
    }

    #[tokio::test]
    async fn test_assigned_counts_any_status() {
        let fx = Fixture::new().await;
        let dev = fx.developer("Grace", &["Go"]).await;
        let repo = TicketRepository::new(&fx.db);

        let first = fx.ticket_for(Some(&dev.id)).await;
        fx.ticket_for(Some(&dev.id)).await;
        fx.ticket_for(None).await;
        repo.update_status(&first.id, TicketStatus::InProgress, TicketStatus::InTesting)
            .await
            .unwrap();

        let counts = repo.assigned_counts(&fx.organization.id).await.unwrap();
        assert_eq!(counts.get(&dev.id), Some(&2));
        assert_eq!(counts.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_status_is_database_error() {
        let fx = Fixture::new().await;
        let ticket = fx.ticket_for(None).await;

        sqlx::query("PRAGMA ignore_check_constraints = ON")
            .execute(fx.db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE tickets SET status = 'BLOCKED' WHERE id = ?")
            .bind(&ticket.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        let repo = TicketRepository::new(&fx.db);
        let err = repo.get(&ticket.id).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Persistence);
        assert!(err.to_string().contains("BLOCKED"));

        let err = repo.list_by_project(&fx.project.id).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Persistence);
    }
}
