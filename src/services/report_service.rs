use crate::models::change::ChangeKind;
use crate::models::report::OrganizeReport;
use crate::services::classify_service;
use crate::state::OrganizeSession;

pub fn build_report(session: &OrganizeSession) -> OrganizeReport {
    let mut report = OrganizeReport {
        total_files_processed: session.tracked.len(),
        changes_made: session.pass_records().len(),
        ..OrganizeReport::default()
    };

    for kind in [ChangeKind::Move, ChangeKind::Rename, ChangeKind::Delete] {
        report.actions_taken.insert(kind.to_string(), 0);
    }
    for record in session.pass_records() {
        *report.actions_taken.entry(record.kind.to_string()).or_insert(0) += 1;
    }
    report.actions_taken.insert("add_note".to_string(), session.notes_added);
    report
        .actions_taken
        .insert("create_folder".to_string(), session.folders_created);

    for path in session.tracked.current_paths() {
        let category = classify_service::categorize(path);
        *report
            .file_categories
            .entry(category.label().to_string())
            .or_insert(0) += 1;
    }

    report
}
