//! Shared fixtures for unit tests

use crate::commands::employee::{self, Role, User};
use crate::commands::organization::{Organization, register_with_db};
use crate::commands::project::{self, NewProject, Project};
use crate::commands::ticket::{NewTicket, Priority, Ticket, TicketRepository};
use crate::identity::Caller;
use crate::storage::Database;
use uuid::Uuid;

/// An in-memory database holding one organization, its admin and a
/// "Platform" project with techstack ["Go", "Docker"]
pub(crate) struct Fixture {
    pub db: Database,
    pub organization: Organization,
    pub admin: User,
    pub project: Project,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let registration = register_with_db(&db, "Acme", "Ada", "ada@acme.io")
            .await
            .unwrap();
        let organization = registration.organization;
        let admin = registration.admin;

        let project = project::create_with_db(
            &db,
            &organization.id,
            NewProject {
                title: "Platform".to_string(),
                description: "Shared platform services".to_string(),
                manager_id: admin.id.clone(),
                techlead_id: admin.id.clone(),
                techstack: vec!["Go".into(), "Docker".into()],
                contributors: vec![],
            },
        )
        .await
        .unwrap();

        Self {
            db,
            organization,
            admin,
            project,
        }
    }

    pub async fn employee(&self, name: &str, role: Role) -> User {
        let email = format!("{}-{}@acme.io", name.to_lowercase(), Uuid::new_v4().simple());
        employee::create_with_db(&self.db, &self.organization.id, name, &email, role, vec![])
            .await
            .unwrap()
    }

    pub async fn developer(&self, name: &str, skills: &[&str]) -> User {
        let user = self.employee(name, Role::Developer).await;
        let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
        employee::set_skills_with_db(&self.db, &user.id, &skills)
            .await
            .unwrap()
    }

    pub fn caller(&self, user: &User) -> Caller {
        Caller::from(user)
    }

    pub async fn ticket_for(&self, developer_id: Option<&str>) -> Ticket {
        TicketRepository::new(&self.db)
            .create(&NewTicket {
                project_id: self.project.id.clone(),
                title: "Existing work".to_string(),
                description: String::new(),
                priority: Priority::Medium,
                creator_id: self.admin.id.clone(),
                developer_id: developer_id.map(str::to_string),
                tags: vec![],
            })
            .await
            .unwrap()
    }
}
