//! Error types for Ticketsmith

use thiserror::Error;

/// Result type alias using Ticketsmith's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an error, used by callers to pick a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input; nothing was changed
    Validation,
    /// A referenced entity does not exist
    NotFound,
    /// The write would violate a uniqueness rule
    Conflict,
    /// The text-generation service failed or replied with garbage
    Extraction,
    /// The storage layer failed
    Persistence,
    /// Configuration is missing or invalid
    Configuration,
    /// Anything else
    Internal,
}

/// Ticketsmith error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Project '{0}' not found. Run `ticketsmith projects list` to see your projects.")]
    ProjectNotFound(String),

    #[error("Ticket '{0}' not found.")]
    TicketNotFound(String),

    #[error("User '{0}' not found. Run `ticketsmith employees list` to see all employees.")]
    UserNotFound(String),

    #[error("Organization '{0}' not found.")]
    OrganizationNotFound(String),

    #[error("Organization '{0}' is already registered.")]
    OrganizationExists(String),

    #[error("A user with email '{0}' already exists.")]
    EmailTaken(String),

    #[error("Project '{0}' already exists in this organization.")]
    DuplicateProject(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `ticketsmith config get llm.api_key`.")]
    LLMError(String),

    #[error("Rate limited. Retry after {0} seconds.")]
    RateLimited(u64),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Extraction errors (E900-E999)
    #[error("Could not understand the ticket description: {0}")]
    ExtractionFailed(String),

    #[error("Ticket extraction timed out after {0:?}")]
    ExtractionTimeout(std::time::Duration),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E001",
            Self::TicketNotFound(_) => "E002",
            Self::UserNotFound(_) => "E003",
            Self::OrganizationNotFound(_) => "E004",
            Self::OrganizationExists(_) => "E010",
            Self::EmailTaken(_) => "E011",
            Self::DuplicateProject(_) => "E012",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::ExtractionFailed(_) => "E900",
            Self::ExtractionTimeout(_) => "E901",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Classify this error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::Validation,
            Self::ProjectNotFound(_)
            | Self::TicketNotFound(_)
            | Self::UserNotFound(_)
            | Self::OrganizationNotFound(_) => ErrorKind::NotFound,
            Self::OrganizationExists(_) | Self::EmailTaken(_) | Self::DuplicateProject(_) => {
                ErrorKind::Conflict
            }
            Self::NetworkError(_)
            | Self::LLMError(_)
            | Self::RateLimited(_)
            | Self::ExtractionFailed(_)
            | Self::ExtractionTimeout(_) => ErrorKind::Extraction,
            Self::DatabaseError(_) => ErrorKind::Persistence,
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::Other(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ProjectNotFound(_) => Some("ticketsmith projects list --as <user-id>".to_string()),
            Self::UserNotFound(_) => Some("ticketsmith employees list --org <org-id>".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("ticketsmith config get llm.api_key".to_string()),
            Self::ExtractionFailed(_) => {
                Some("Rephrase the description and try again".to_string())
            }
            Self::ExtractionTimeout(elapsed) => Some(format!(
                "ticketsmith config set assignment.extraction_timeout_secs {}",
                elapsed.as_secs().max(1) * 2
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_not_found_errors() {
        let error = Error::ProjectNotFound("p-1".to_string());
        assert_eq!(error.code(), "E001");
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains("p-1"));

        let error = Error::TicketNotFound("t-1".to_string());
        assert_eq!(error.code(), "E002");
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.suggestion(), None);
    }

    #[test]
    fn test_extraction_kinds_are_distinct_from_not_found() {
        let extraction = Error::ExtractionFailed("no JSON object".to_string());
        let missing = Error::ProjectNotFound("p-1".to_string());

        assert_eq!(extraction.kind(), ErrorKind::Extraction);
        assert_ne!(extraction.kind(), missing.kind());
        assert_eq!(Error::ExtractionTimeout(Duration::from_secs(30)).kind(), ErrorKind::Extraction);
        assert_eq!(Error::RateLimited(10).kind(), ErrorKind::Extraction);
        assert_eq!(Error::LLMError("boom".into()).kind(), ErrorKind::Extraction);
    }

    #[test]
    fn test_validation_and_conflict() {
        let error = Error::InvalidInput("description is required".to_string());
        assert_eq!(error.code(), "E800");
        assert_eq!(error.kind(), ErrorKind::Validation);

        assert_eq!(Error::EmailTaken("a@b.c".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::OrganizationExists("acme.io".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::DuplicateProject("Portal".into()).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_timeout_suggestion_doubles() {
        let error = Error::ExtractionTimeout(Duration::from_secs(15));
        assert_eq!(
            error.suggestion(),
            Some("ticketsmith config set assignment.extraction_timeout_secs 30".to_string())
        );
        assert!(error.to_string().contains("15s"));
    }

    #[test]
    fn test_database_error_is_persistence() {
        let error: Error = sqlx::Error::RowNotFound.into();
        assert_eq!(error.code(), "E400");
        assert_eq!(error.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io.into();
        assert_eq!(error.code(), "E9999");
        assert_eq!(error.kind(), ErrorKind::Internal);
    }
}
