use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::models::action::{SuggestionAction, ToolCall};
use crate::services::classify_service::FileCategory;
use crate::services::structure_service::DirectoryListing;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Network trouble, timeouts, rate limits. Worth retrying.
    #[error("transient: {0}")]
    Transient(String),
    /// Bad credentials, bad request. Retrying will not help.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl OracleError {
    /// Sorts a transport error message into transient or permanent.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_retryable_message(&message) {
            Self::Transient(message)
        } else {
            Self::Permanent(message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_lowercase();

    if lower.contains("unauthorized")
        || lower.contains("bad request")
        || lower.contains("no api key")
        || lower.contains("invalid api key")
        || lower.contains("permission")
    {
        return false;
    }

    if let Some(status) = extract_http_status_code(&lower) {
        if (400..500).contains(&status) && !matches!(status, 408 | 409 | 429) {
            return false;
        }
    }

    true
}

fn extract_http_status_code(message: &str) -> Option<u16> {
    for token in message.split(|c: char| !c.is_ascii_digit()) {
        if token.len() != 3 {
            continue;
        }
        let Ok(status) = token.parse::<u16>() else {
            continue;
        };
        if (100..600).contains(&status) {
            return Some(status);
        }
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentAnalysis {
    pub word_count: usize,
    pub line_count: usize,
    pub has_urls: bool,
    pub has_email: bool,
}

pub struct ContentAnalyzer {
    word: Regex,
    url: Regex,
    email: Regex,
}

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self {
            word: Regex::new(r"\w+").expect("static regex"),
            url: Regex::new(r"https?://[^\s]+").expect("static regex"),
            email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
                .expect("static regex"),
        }
    }

    pub fn analyze(&self, content: &str) -> ContentAnalysis {
        ContentAnalysis {
            word_count: self.word.find_iter(content).count(),
            line_count: content.lines().count(),
            has_urls: self.url.is_match(content),
            has_email: self.email.is_match(content),
        }
    }
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionContext {
    pub dependencies: Vec<String>,
    pub directory: Option<PathBuf>,
    pub structure: Option<DirectoryListing>,
    pub analysis: ContentAnalysis,
}

impl SuggestionContext {
    /// Plain-text rendering for prompt-based transports.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if !self.dependencies.is_empty() {
            out.push_str(&format!(
                "Dependencies: This file imports {}\n",
                self.dependencies.join(", ")
            ));
        }
        if let (Some(directory), Some(listing)) = (&self.directory, &self.structure) {
            out.push_str("Project structure:\n");
            out.push_str(&format!("Current directory: {}\n", directory.display()));
            out.push_str(&format!("Files in this directory: {}\n", listing.files.join(", ")));
            out.push_str(&format!("Subdirectories: {}\n", listing.dirs.join(", ")));
        }
        out.push_str(&format!(
            "\nFile analysis: words={}, lines={}, has_urls={}, has_email={}\n",
            self.analysis.word_count,
            self.analysis.line_count,
            self.analysis.has_urls,
            self.analysis.has_email
        ));
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRequest {
    pub file_path: PathBuf,
    pub category: FileCategory,
    pub content_snippet: String,
    pub context: SuggestionContext,
}

/// A source of organization suggestions: a language model behind some
/// transport, a rules engine, or a test double.
pub trait Oracle {
    fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> impl Future<Output = Result<Vec<ToolCall>, OracleError>> + Send;
}

/// Function schemas for the five actions, in the shape tool-calling chat APIs
/// expect.
pub fn tool_definitions() -> serde_json::Value {
    let tool = |name: &str, description: &str, required: &[&str]| {
        let properties: serde_json::Map<String, serde_json::Value> = required
            .iter()
            .map(|arg| (arg.to_string(), json!({"type": "string"})))
            .collect();
        json!({
            "type": "function",
            "function": {
                "name": name,
                "description": description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    };

    json!([
        tool(SuggestionAction::MOVE_FILE, "Move a file to a new location", &["source", "destination"]),
        tool(SuggestionAction::CREATE_FOLDER, "Create a new folder", &["path"]),
        tool(SuggestionAction::ADD_NOTE, "Add a note to a file", &["file_path", "note"]),
        tool(SuggestionAction::RENAME_FILE, "Rename a file", &["source", "new_name"]),
        tool(SuggestionAction::DELETE_FILE, "Delete a file", &["file_path"]),
    ])
}

/// Pulls `choices[0].message.tool_calls` out of a chat-completion body.
/// A response without tool calls yields an empty list.
pub fn parse_tool_calls(body: &str) -> Result<Vec<ToolCall>, OracleError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| OracleError::Transient(format!("unreadable oracle response: {e}")))?;

    let Some(calls) = value
        .pointer("/choices/0/message/tool_calls")
        .and_then(|v| v.as_array())
    else {
        return Ok(Vec::new());
    };

    Ok(calls
        .iter()
        .filter_map(|call| {
            let function = call.get("function")?;
            let name = function.get("name")?.as_str()?.to_string();
            let arguments = match function.get("arguments") {
                Some(serde_json::Value::String(raw)) => raw.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Some(ToolCall { name, arguments })
        })
        .collect())
}

/// Calls the oracle under `policy`: up to `max_attempts` tries with the
/// policy's backoff between them. Permanent errors stop immediately; the
/// cancel flag is honored between attempts.
pub async fn suggest_with_retry<O: Oracle>(
    oracle: &O,
    request: &SuggestionRequest,
    policy: &RetryPolicy,
    cancel_flag: &AtomicBool,
) -> Result<Vec<ToolCall>, OracleError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match oracle.suggest(request).await {
            Ok(calls) => return Ok(calls),
            Err(err) => {
                if attempt >= attempts || !err.is_retryable() {
                    warn!(
                        "Error getting suggestion for {} after {attempt} attempt(s): {err}",
                        request.file_path.display()
                    );
                    return Err(err);
                }
                if cancel_flag.load(Ordering::Relaxed) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                info!(
                    "Suggestion attempt {attempt}/{attempts} for {} failed ({err}); retrying in {}s",
                    request.file_path.display(),
                    delay.as_secs()
                );
                last_error = Some(err);
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| OracleError::Transient("oracle failed with unknown error".to_string())))
}

pub fn request_for(
    file_path: &Path,
    category: FileCategory,
    content: &str,
    snippet_chars: usize,
    context: SuggestionContext,
) -> SuggestionRequest {
    SuggestionRequest {
        file_path: file_path.to_path_buf(),
        category,
        content_snippet: content.chars().take(snippet_chars).collect(),
        context,
    }
}
