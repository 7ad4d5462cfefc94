//! Ticketsmith Core Library
//!
//! This crate provides the core functionality for Ticketsmith, including:
//! - Organizations, employees, projects and tickets (SQLite storage)
//! - Ticket extraction from free text via an LLM
//! - Automatic developer assignment (skill match, then workload balance)
//! - The ticket status workflow and the per-project kanban board

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod llm;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::ticket::{Priority, Ticket, TicketStatus};
    pub use crate::config::Config;
    pub use crate::engine::TicketService;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::identity::Caller;
    pub use crate::storage::Database;
}
