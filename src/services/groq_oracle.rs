use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::config::OrganizerConfig;
use crate::error::AppError;
use crate::models::action::ToolCall;
use crate::services::oracle_service::{
    parse_tool_calls, tool_definitions, Oracle, OracleError, SuggestionRequest,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const MAX_TOKENS: u32 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_CHARS: usize = 300;

/// Tool-calling chat-completions client for Groq's OpenAI-compatible API.
pub struct GroqOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GroqOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::General(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &OrganizerConfig) -> Result<Option<Self>, AppError> {
        match &config.api_key {
            Some(key) => Self::new(key.clone(), config.text_model.clone()).map(Some),
            None => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &SuggestionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(request)}],
            "tools": tool_definitions(),
            "max_tokens": MAX_TOKENS,
        })
    }
}

pub fn build_prompt(request: &SuggestionRequest) -> String {
    format!(
        "Analyze this file and suggest how to organize it within the project: {path}\n\
         \n\
         File type: {category}\n\
         {context}\n\
         File content summary:\n\
         {snippet}\n\
         \n\
         Important: Consider the following guidelines when making suggestions:\n\
         1. Maintain the integrity of the project structure.\n\
         2. Do not break up files that import each other or have dependencies.\n\
         3. Keep related files in the same directory.\n\
         4. Suggest creating subdirectories only for logically separate components.\n\
         5. Rename files if it improves clarity, but maintain consistency.\n\
         6. Suggest deleting files only if they are clearly obsolete or redundant.\n\
         7. Add notes to files to explain their purpose or suggest improvements.\n\
         8. Consider the overall project architecture when making suggestions.\n\
         9. For non-text files, focus on organizing based on filename and file type.\n\
         \n\
         Provide your suggestions using the available tools. You can use multiple tools if needed.",
        path = request.file_path.display(),
        category = request.category,
        context = request.context.describe(),
        snippet = request.content_snippet,
    )
}

impl Oracle for GroqOracle {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<ToolCall>, OracleError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| OracleError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Transient(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(ERROR_BODY_CHARS).collect();
            return Err(OracleError::classify(format!(
                "HTTP {}: {excerpt}",
                status.as_u16()
            )));
        }

        debug!(
            "Oracle response for {} ({} bytes)",
            request.file_path.display(),
            body.len()
        );
        parse_tool_calls(&body)
    }
}
