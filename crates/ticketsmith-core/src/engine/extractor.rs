//! Text-to-ticket extraction
//!
//! Sends a free-text description to a [`TextGenerator`] and turns the reply
//! into a [`TicketDraft`]. The reply is untrusted: a JSON object is located
//! in it and every field is checked before a draft is produced.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::commands::ticket::Priority;
use crate::error::{Error, Result};
use crate::llm::TextGenerator;

/// Default bound on one extraction round trip
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Instruction sent with every description
pub const SYSTEM_PROMPT: &str = r#"You are an assistant that analyzes ticket descriptions for a software team.
Determine the most appropriate priority for the ticket (low, medium or high) and the technologies it involves.
Respond ONLY with a single JSON object in exactly this format:
{"title": "<short title based on the description>", "description": "<summary of the ticket>", "priority": "<low|medium|high>", "tags": ["<tag1>", "<tag2>"]}
Tags are relevant tech stack names such as "React", "Node.js" or "PostgreSQL".
Do not include any other text."#;

/// Structured ticket fields derived from a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Derives ticket drafts from free text
#[derive(Clone)]
pub struct TicketExtractor {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl TicketExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    /// Bound the outbound call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make one generator call and parse its reply
    ///
    /// An empty or whitespace-only description is an input error. Generator
    /// failures, timeouts and unusable replies are extraction errors. No
    /// retry is attempted.
    pub async fn extract(&self, description: &str) -> Result<TicketDraft> {
        if description.trim().is_empty() {
            return Err(Error::InvalidInput("Ticket description is required".to_string()));
        }

        let user = format!("Ticket description: {}", description);
        let reply = match tokio::time::timeout(self.timeout, self.generator.generate(SYSTEM_PROMPT, &user)).await {
            Err(_) => {
                warn!(timeout = ?self.timeout, "Ticket extraction timed out");
                return Err(Error::ExtractionTimeout(self.timeout));
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Text generation failed");
                return Err(match e {
                    // Keep the code and suggestion of LLM and configuration errors
                    e @ (Error::LLMError(_)
                    | Error::RateLimited(_)
                    | Error::NetworkError(_)
                    | Error::ConfigError(_)) => e,
                    other => Error::ExtractionFailed(other.to_string()),
                });
            }
            Ok(Ok(reply)) => reply,
        };

        debug!(reply_len = reply.len(), "Received extraction reply");
        parse_draft(&reply)
    }
}

/// Validate a generator reply into a draft
pub fn parse_draft(reply: &str) -> Result<TicketDraft> {
    let json = extract_json_object(reply)
        .ok_or_else(|| Error::ExtractionFailed("reply contains no JSON object".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::ExtractionFailed(format!("reply is not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::ExtractionFailed("reply is not a JSON object".to_string()))?;

    let title = match object.get("title").and_then(Value::as_str).map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => return Err(Error::ExtractionFailed("missing or empty title".to_string())),
    };

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::ExtractionFailed("missing description".to_string()))?
        .trim()
        .to_string();

    let priority = object
        .get("priority")
        .and_then(Value::as_str)
        .and_then(Priority::parse)
        .ok_or_else(|| Error::ExtractionFailed("priority must be low, medium or high".to_string()))?;

    Ok(TicketDraft {
        title,
        description,
        priority,
        tags: string_array(object, "tags"),
    })
}

/// An array of strings, or empty when absent or mixed
fn string_array(object: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(items) = object.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .unwrap_or_default()
}

/// Locate the JSON object in a reply that may carry markdown or prose
fn extract_json_object(reply: &str) -> Option<&str> {
    // Fenced block first, with or without a language tag
    if let Some(start) = reply.find("```") {
        let after_fence = start + 3;
        let body_start = reply[after_fence..]
            .find('\n')
            .map(|newline| after_fence + newline + 1)
            .unwrap_or(after_fence);
        if let Some(end) = reply[body_start..].find("```") {
            let body = reply[body_start..body_start + end].trim();
            if body.starts_with('{') {
                return Some(body);
            }
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed reply and records the user message
    struct Scripted {
        reply: Result<String>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            self.seen.lock().unwrap().push(user.to_string());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(Error::LLMError(e.to_string())),
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }
    }

    #[tokio::test]
    async fn test_extract_parses_reply() {
        let generator = Scripted::ok(
            r#"{"title": "Fix login", "description": "Login fails on Safari", "priority": "High", "tags": ["React", "Node.js"]}"#,
        );
        let extractor = TicketExtractor::new(generator.clone());

        let draft = extractor.extract("login is broken on safari").await.unwrap();
        assert_eq!(draft.title, "Fix login");
        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.tags, vec!["React", "Node.js"]);

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "Ticket description: login is broken on safari");
    }

    #[tokio::test]
    async fn test_extract_rejects_blank_description() {
        let generator = Scripted::ok("{}");
        let extractor = TicketExtractor::new(generator.clone());

        let err = extractor.extract("   \n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_times_out() {
        let extractor = TicketExtractor::new(Arc::new(Slow)).with_timeout(Duration::from_millis(50));

        let err = extractor.extract("anything").await.unwrap_err();
        assert!(matches!(err, Error::ExtractionTimeout(_)));
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }

    #[tokio::test]
    async fn test_generator_error_is_extraction() {
        let generator = Arc::new(Scripted {
            reply: Err(Error::Other("upstream down".to_string())),
            seen: Mutex::new(Vec::new()),
        });
        let err = TicketExtractor::new(generator).extract("anything").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"title\": \"T\", \"description\": \"\", \"priority\": \"low\", \"tags\": []}\n```";
        let draft = parse_draft(reply).unwrap();
        assert_eq!(draft.title, "T");
        assert_eq!(draft.description, "");
        assert_eq!(draft.priority, Priority::Low);
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        for reply in [
            "no json here",
            "[1, 2, 3]",
            r#"{"description": "d", "priority": "low"}"#,
            r#"{"title": "  ", "description": "d", "priority": "low"}"#,
            r#"{"title": "t", "priority": "low"}"#,
            r#"{"title": "t", "description": "d", "priority": "urgent"}"#,
            r#"{"title": "t", "description": "d", "priority": 3}"#,
        ] {
            let err = parse_draft(reply).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Extraction, "reply: {}", reply);
        }
    }

    #[test]
    fn test_parse_tags_defaults() {
        let missing = parse_draft(r#"{"title": "t", "description": "d", "priority": "medium"}"#).unwrap();
        assert!(missing.tags.is_empty());

        let mixed = parse_draft(
            r#"{"title": "t", "description": "d", "priority": "MEDIUM", "tags": ["Go", 7]}"#,
        )
        .unwrap();
        assert!(mixed.tags.is_empty());

        let not_array = parse_draft(
            r#"{"title": "t", "description": "d", "priority": "medium", "tags": "Go"}"#,
        )
        .unwrap();
        assert!(not_array.tags.is_empty());

        let dupes = parse_draft(
            r#"{"title": "t", "description": "d", "priority": "medium", "tags": ["Go", "Go"]}"#,
        )
        .unwrap();
        assert_eq!(dupes.tags, vec!["Go", "Go"]);
    }
}
