//! LLM integration - OpenAI-compatible chat completions
//!
//! This module provides:
//! - `TextGenerator`, the seam the ticket extractor talks to
//! - `LlmClient`, the HTTP implementation of that seam
//! - `Unconfigured`, used when no client could be built
//! - Request/response types matching the chat completions API

mod client;
mod types;

use async_trait::async_trait;

use crate::error::{Error, Result};

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse, Message, MessageRole,
    ResponseFormat, Usage,
};

/// Something that turns a system instruction plus a user message into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// Generator for a missing LLM configuration
///
/// Every call fails with a configuration error, so the problem is reported
/// when text is first needed rather than when the service is wired up.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        Err(Error::ConfigError(self.reason.clone()))
    }
}
