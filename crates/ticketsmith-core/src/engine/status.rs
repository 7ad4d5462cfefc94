//! Ticket status transitions
//!
//! The only place in the crate that changes a ticket's status. Every move is
//! a single step along INPROGRESS -> INTESTING -> COMPLETED -> INPROGRESS.

use tracing::{info, warn};

use crate::commands::ticket::{Ticket, TicketRepository, TicketStatus};
use crate::storage::Database;
use crate::{Error, Result};

/// Move a ticket to `target` and return the updated ticket
///
/// `target` must be the successor of the ticket's current status. The write
/// only lands if the status is still the one that was read.
pub async fn advance_status(db: &Database, ticket_id: &str, target: TicketStatus) -> Result<Ticket> {
    let repo = TicketRepository::new(db);
    let current = repo
        .get(ticket_id)
        .await?
        .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;

    if current.status.next() != target {
        return Err(Error::InvalidInput(format!(
            "Ticket {} is {}; it can only move to {}",
            ticket_id,
            current.status,
            current.status.next()
        )));
    }

    if !repo.update_status(ticket_id, current.status, target).await? {
        warn!(ticket_id = %ticket_id, "Ticket status changed concurrently");
        return Err(Error::InvalidInput(format!(
            "Ticket {} changed status while it was being updated",
            ticket_id
        )));
    }

    let ticket = repo
        .get(ticket_id)
        .await?
        .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;

    info!(ticket_id = %ticket.id, from = %current.status, to = %ticket.status, "Ticket status updated");
    Ok(ticket)
}

/// Move the ticket one step along the workflow cycle
pub async fn advance_to_next(db: &Database, ticket_id: &str) -> Result<Ticket> {
    let current = TicketRepository::new(db)
        .get(ticket_id)
        .await?
        .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;

    advance_status(db, ticket_id, current.status.next()).await
}
