pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod scope_path;
pub mod services;
pub mod state;

pub use commands::organize_pipeline::{organize_folder, undo_changes, OrganizeProgress};
pub use config::OrganizerConfig;
pub use error::AppError;
pub use services::oracle_service::{Oracle, OracleError, SuggestionRequest};
pub use state::OrganizeSession;
