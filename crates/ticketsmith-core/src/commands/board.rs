//! Project board
//!
//! Aggregates a project, the names of the people attached to it and its
//! tickets grouped into one column per workflow status.

use crate::Result;
use crate::commands::employee::{User, UserRepository};
use crate::commands::project::{self, Project};
use crate::commands::ticket::{Priority, Ticket, TicketRepository, TicketStatus};
use crate::storage::Database;
use serde::Serialize;
use std::collections::HashMap;

/// A user reference with a display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: String,
    pub name: String,
}

impl From<&User> for Person {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardTicket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub creator: Option<Person>,
    pub developer: Option<Person>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    /// `in-progress`, `in-testing` or `completed`
    pub id: String,
    pub title: String,
    pub tickets: Vec<BoardTicket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectBoard {
    pub project: Project,
    pub manager: Option<Person>,
    pub techlead: Option<Person>,
    pub contributors: Vec<Person>,
    pub columns: Vec<BoardColumn>,
}

impl ProjectBoard {
    pub fn column(&self, status: TicketStatus) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.id == status.column_id())
    }

    pub fn ticket_count(&self) -> usize {
        self.columns.iter().map(|c| c.tickets.len()).sum()
    }
}

/// Build the board for a project
pub async fn board_with_db(db: &Database, project_id: &str) -> Result<ProjectBoard> {
    let project = project::get_with_db(db, project_id).await?;
    let tickets = TicketRepository::new(db).list_by_project(project_id).await?;

    // One lookup per distinct user
    let users = UserRepository::new(db);
    let mut people: HashMap<String, Option<Person>> = HashMap::new();
    let referenced = project
        .manager_id
        .iter()
        .chain(project.techlead_id.iter())
        .chain(project.contributors.iter())
        .chain(tickets.iter().map(|t| &t.creator_id))
        .chain(tickets.iter().filter_map(|t| t.developer_id.as_ref()));
    for id in referenced {
        if !people.contains_key(id) {
            let person = users.get(id).await?.as_ref().map(Person::from);
            people.insert(id.clone(), person);
        }
    }
    let lookup = |id: Option<&String>| id.and_then(|id| people.get(id).cloned().flatten());

    let mut columns: Vec<BoardColumn> = TicketStatus::ALL
        .iter()
        .map(|status| BoardColumn {
            id: status.column_id().to_string(),
            title: status.column_title().to_string(),
            tickets: Vec::new(),
        })
        .collect();

    for ticket in &tickets {
        let index = TicketStatus::ALL
            .iter()
            .position(|s| *s == ticket.status)
            .unwrap_or(0);
        columns[index].tickets.push(board_ticket(ticket, &lookup));
    }

    Ok(ProjectBoard {
        manager: lookup(project.manager_id.as_ref()),
        techlead: lookup(project.techlead_id.as_ref()),
        contributors: project
            .contributors
            .iter()
            .filter_map(|id| lookup(Some(id)))
            .collect(),
        project,
        columns,
    })
}

fn board_ticket(ticket: &Ticket, lookup: &impl Fn(Option<&String>) -> Option<Person>) -> BoardTicket {
    BoardTicket {
        id: ticket.id.clone(),
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        priority: ticket.priority,
        tags: ticket.tags.clone(),
        creator: lookup(Some(&ticket.creator_id)),
        developer: lookup(ticket.developer_id.as_ref()),
    }
}
