pub mod backup_service;
pub mod classify_service;
pub mod dependency_service;
pub mod duplicate_service;
pub mod file_service;
pub mod groq_oracle;
pub mod oracle_service;
pub mod report_service;
pub mod rules_oracle;
pub mod safety_service;
pub mod structure_service;
pub mod undo_service;
