//! Ticket creation engine
//!
//! - `extractor`: free text to a structured draft via a `TextGenerator`
//! - `tags`: merges draft tags with the project techstack
//! - `ranking`: picks the developer (skill match, then workload)
//! - `status`: the ticket workflow transitions
//! - `service`: ties the pieces together behind `TicketService`

pub mod extractor;
pub mod ranking;
pub mod service;
pub mod status;
pub mod tags;

pub use extractor::{TicketDraft, TicketExtractor};
pub use ranking::{Assignment, DeveloperCandidate, DeveloperRanker};
pub use service::TicketService;
pub use status::{advance_status, advance_to_next};
pub use tags::reconcile_tags;
