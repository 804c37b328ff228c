use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A raw tool call as returned by an oracle: a function name plus its JSON
/// argument string. Nothing about it has been validated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum SuggestionAction {
    MoveFile { source: String, destination: String },
    CreateFolder { path: String },
    AddNote { file_path: String, note: String },
    RenameFile { source: String, new_name: String },
    DeleteFile { file_path: String },
}

impl SuggestionAction {
    pub const MOVE_FILE: &'static str = "move_file";
    pub const CREATE_FOLDER: &'static str = "create_folder";
    pub const ADD_NOTE: &'static str = "add_note";
    pub const RENAME_FILE: &'static str = "rename_file";
    pub const DELETE_FILE: &'static str = "delete_file";

    /// Validates a tool call against the action schema.
    ///
    /// Returns `Ok(None)` for tool names outside the schema (they are ignored),
    /// and `MalformedSuggestion` when the arguments are not a JSON object or a
    /// required argument is missing or not a string.
    pub fn from_tool_call(call: &ToolCall) -> Result<Option<Self>, AppError> {
        let known = matches!(
            call.name.as_str(),
            Self::MOVE_FILE
                | Self::CREATE_FOLDER
                | Self::ADD_NOTE
                | Self::RENAME_FILE
                | Self::DELETE_FILE
        );
        if !known {
            return Ok(None);
        }

        let args: serde_json::Value = serde_json::from_str(&call.arguments).map_err(|e| {
            AppError::MalformedSuggestion(format!("invalid JSON in '{}' arguments: {e}", call.name))
        })?;
        if !args.is_object() {
            return Err(AppError::MalformedSuggestion(format!(
                "'{}' arguments must be an object",
                call.name
            )));
        }

        let action = match call.name.as_str() {
            Self::MOVE_FILE => Self::MoveFile {
                source: get_string_arg(&args, &call.name, "source")?,
                destination: get_string_arg(&args, &call.name, "destination")?,
            },
            Self::CREATE_FOLDER => Self::CreateFolder {
                path: get_string_arg(&args, &call.name, "path")?,
            },
            Self::ADD_NOTE => Self::AddNote {
                file_path: get_string_arg(&args, &call.name, "file_path")?,
                note: get_string_arg(&args, &call.name, "note")?,
            },
            Self::RENAME_FILE => Self::RenameFile {
                source: get_string_arg(&args, &call.name, "source")?,
                new_name: get_string_arg(&args, &call.name, "new_name")?,
            },
            _ => Self::DeleteFile {
                file_path: get_string_arg(&args, &call.name, "file_path")?,
            },
        };
        Ok(Some(action))
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::MoveFile { .. } => Self::MOVE_FILE,
            Self::CreateFolder { .. } => Self::CREATE_FOLDER,
            Self::AddNote { .. } => Self::ADD_NOTE,
            Self::RenameFile { .. } => Self::RENAME_FILE,
            Self::DeleteFile { .. } => Self::DELETE_FILE,
        }
    }
}

fn get_string_arg(args: &serde_json::Value, tool: &str, key: &str) -> Result<String, AppError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            AppError::MalformedSuggestion(format!("'{tool}' is missing string argument '{key}'"))
        })
}
