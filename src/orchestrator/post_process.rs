//! Post-run processing utilities.
//!
//! Handles exports, preference persistence and the text summary after a run ends.

use crate::cli::ExportArgs;
use crate::model::{SearchParameters, SearchRun};
use crate::storage::{self, Preferences};
use crate::text_summary;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub summary: Vec<String>,
    pub export_messages: Vec<String>,
    pub saved_preferences: Option<std::path::PathBuf>,
}

/// Process a finished run: write exports, persist preferences if asked, and build the summary.
pub(crate) fn process_run_completion(
    exports: &ExportArgs,
    save_parameters: Option<&SearchParameters>,
    run: &SearchRun,
) -> ProcessedRun {
    let mut export_messages = Vec::new();
    if let Some(export_path) = exports.export_json.as_deref() {
        match storage::export_json(export_path, run) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = exports.export_csv.as_deref() {
        match storage::export_csv(export_path, &run.leads) {
            Ok(_) => export_messages.push(format!(
                "Exported CSV ({} leads): {}",
                run.leads.len(),
                export_path.display()
            )),
            Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
        }
    }

    let saved_preferences = save_parameters.and_then(|params| {
        let current = storage::load_preferences().unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "could not read preferences before saving");
            Preferences::default()
        });
        match storage::save_preferences(&current.with_parameters(params)) {
            Ok(path) => Some(path),
            Err(e) => {
                export_messages.push(format!("Saving preferences failed: {e:#}"));
                None
            }
        }
    });

    ProcessedRun {
        summary: text_summary::build_text_summary(run).lines,
        export_messages,
        saved_preferences,
    }
}
