use std::path::{Path, PathBuf};

use serde_json::json;

use crate::models::action::{SuggestionAction, ToolCall};
use crate::services::classify_service::FileCategory;
use crate::services::oracle_service::{Oracle, OracleError, SuggestionRequest};
use crate::scope_path;

/// Files each non-code document under a per-category folder at the root.
///
/// Code files are left in place: moving them is what the dependency veto
/// exists for, and a rules engine has no better idea where they belong.
pub struct RulesOracle {
    root: PathBuf,
}

impl RulesOracle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn plan(&self, request: &SuggestionRequest) -> Vec<ToolCall> {
        if matches!(request.category, FileCategory::Code | FileCategory::Other) {
            return Vec::new();
        }
        let folder = request.category.default_folder_name();
        if self.already_filed(&request.file_path, folder) {
            return Vec::new();
        }
        let Some(file_name) = request.file_path.file_name() else {
            return Vec::new();
        };
        let source = scope_path::relative_to(&request.file_path, &self.root)
            .unwrap_or_else(|| request.file_path.clone());
        let destination = Path::new(folder).join(file_name);

        vec![
            ToolCall::new(SuggestionAction::CREATE_FOLDER, json!({ "path": folder })),
            ToolCall::new(
                SuggestionAction::MOVE_FILE,
                json!({
                    "source": source.to_string_lossy(),
                    "destination": destination.to_string_lossy(),
                }),
            ),
        ]
    }

    fn already_filed(&self, path: &Path, folder: &str) -> bool {
        scope_path::relative_to(path, &self.root)
            .and_then(|rel| rel.components().next().map(|c| c.as_os_str() == folder))
            .unwrap_or(false)
    }
}

impl Oracle for RulesOracle {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<ToolCall>, OracleError> {
        Ok(self.plan(request))
    }
}
