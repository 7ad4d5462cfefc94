//! Ticket creation service

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::{Error, Result};
use crate::commands::project::ProjectRepository;
use crate::commands::ticket::{NewTicket, Ticket, TicketRepository};
use crate::config::Config;
use crate::engine::extractor::TicketExtractor;
use crate::engine::ranking::DeveloperRanker;
use crate::engine::tags::reconcile_tags;
use crate::identity::Caller;
use crate::llm::{LlmClient, TextGenerator, Unconfigured};
use crate::storage::Database;

/// Entry point for creating tickets
pub struct TicketService {
    db: Database,
    extractor: TicketExtractor,
}

impl TicketService {
    pub fn new(db: Database, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            db,
            extractor: TicketExtractor::new(generator),
        }
    }

    /// Build a service backed by the configured LLM endpoint
    ///
    /// A missing API key is not an error here. It surfaces from
    /// `create_ticket` once the project has been resolved.
    pub fn from_config(db: Database, config: &Config) -> Result<Self> {
        let generator: Arc<dyn TextGenerator> = match LlmClient::from_config(&config.llm) {
            Ok(client) => Arc::new(client),
            Err(Error::ConfigError(reason)) => {
                debug!(reason = %reason, "LLM client not configured");
                Arc::new(Unconfigured::new(reason))
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(db, generator).with_extraction_timeout(Duration::from_secs(
            config.assignment.extraction_timeout_secs,
        )))
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extractor = self.extractor.with_timeout(timeout);
        self
    }

    /// Create a ticket from a free-text description
    ///
    /// The project is resolved before the generator is called, so an unknown
    /// project never costs an outbound request. A project owned by another
    /// organization is reported as not found. Nothing is written unless
    /// every step succeeds, and the stored ticket always starts in
    /// INPROGRESS.
    pub async fn create_ticket(
        &self,
        caller: &Caller,
        project_id: &str,
        description: &str,
    ) -> Result<Ticket> {
        if description.trim().is_empty() {
            return Err(Error::InvalidInput("Ticket description is required".to_string()));
        }

        let project = ProjectRepository::new(&self.db)
            .get(project_id)
            .await?
            .filter(|p| p.organization_id == caller.organization_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;

        let draft = self.extractor.extract(description).await?;
        let tags = reconcile_tags(&draft.tags, &project);

        let assignment = DeveloperRanker::new(&self.db)
            .select(&caller.organization_id, &tags)
            .await?;

        let ticket = TicketRepository::new(&self.db)
            .create(&NewTicket {
                project_id: project.id.clone(),
                title: draft.title,
                description: draft.description,
                priority: draft.priority,
                creator_id: caller.user_id.clone(),
                developer_id: assignment.developer_id().map(str::to_string),
                tags,
            })
            .await?;

        info!(
            ticket_id = %ticket.id,
            project_id = %ticket.project_id,
            developer_id = ?ticket.developer_id,
            priority = %ticket.priority,
            "Ticket created"
        );
        Ok(ticket)
    }
}
