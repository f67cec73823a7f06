//! The batch importer: drives the parser over every staged document,
//! persists the surviving records and folds every partial failure into one
//! terminal outcome.

use std::fs;

use itertools::Itertools;

use crate::error::ImportError;
use crate::fps::{parse_document, ParseContext};
use crate::record::ImportResult;
use crate::stage::{self, Upload};
use crate::store::{ProblemStore, StoreError};
use crate::workdir::resolve_writable_dir;
use crate::{ImportConfig, LanguageCatalog};

/// The aggregated state of one import invocation.
///
/// The batch loop is the sole writer; one [`finalize`](Self::finalize) step
/// turns the state into the terminal result. Title and filename lists keep
/// insertion order and are deduplicated.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    imported: usize,
    failed: usize,
    duplicate_titles: Vec<String>,
    unknown_titles: Vec<String>,
    skipped_titles: Vec<String>,
    failed_files: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

fn bracketed(items: &[String]) -> String {
    format!("[{}]", items.iter().join(", "))
}

impl BatchOutcome {
    fn record_imported(&mut self) {
        self.imported += 1;
    }

    fn record_duplicate(&mut self, title: &str) {
        self.failed += 1;
        push_unique(&mut self.duplicate_titles, title);
    }

    fn record_unknown(&mut self, title: &str) {
        self.failed += 1;
        push_unique(&mut self.unknown_titles, title);
    }

    // a false add_problem return is tallied without a title: the record is
    // lost from every diagnostic list
    fn record_unreported_failure(&mut self) {
        self.failed += 1;
    }

    fn record_skipped_titles(&mut self, titles: Vec<String>) {
        for title in &titles {
            push_unique(&mut self.skipped_titles, title);
        }
    }

    fn record_unparsable_file(&mut self, name: &str) {
        push_unique(&mut self.failed_files, name);
    }

    /// The terminal error when not a single document yielded a result,
    /// stating which combination of failures led there.
    fn no_results_error(&self) -> ImportError {
        let message = match (self.failed_files.is_empty(), self.skipped_titles.is_empty()) {
            (false, true) => format!(
                "no problems imported: every XML document failed to parse: {}",
                bracketed(&self.failed_files)
            ),
            (true, false) => format!(
                "no problems imported: no item carries any test data: {}",
                bracketed(&self.skipped_titles)
            ),
            (false, false) => format!(
                "no problems imported: unparsable XML files: {}, items without test data: {}",
                bracketed(&self.failed_files),
                bracketed(&self.skipped_titles)
            ),
            (true, true) => {
                "no problems imported: the upload does not contain any problem item".to_string()
            }
        };
        ImportError::NothingImported(message)
    }

    /// Fold the aggregated state into the terminal result: a hard failure
    /// when any record failed to persist, a warning when records persisted
    /// but something was skipped along the way, success otherwise.
    fn finalize(self) -> Result<(), ImportError> {
        if self.failed > 0 {
            let mut message = format!(
                "imported {} problem(s), {} failed; duplicate titles: {}",
                self.imported,
                self.failed,
                bracketed(&self.duplicate_titles)
            );
            if !self.unknown_titles.is_empty() {
                message.push_str(&format!(
                    "\nfailed for unknown reasons: {}",
                    bracketed(&self.unknown_titles)
                ));
            }
            if !self.skipped_titles.is_empty() {
                message.push_str(&format!(
                    "\nskipped for missing test data: {}",
                    bracketed(&self.skipped_titles)
                ));
            }
            if !self.failed_files.is_empty() {
                message.push_str(&format!(
                    "\nunparsable XML files: {}",
                    bracketed(&self.failed_files)
                ));
            }
            return Err(ImportError::PartlyFailed(message));
        }
        if !self.skipped_titles.is_empty() || !self.failed_files.is_empty() {
            let mut parts = Vec::new();
            if !self.skipped_titles.is_empty() {
                parts.push(format!(
                    "skipped for missing test data: {}",
                    bracketed(&self.skipped_titles)
                ));
            }
            if !self.failed_files.is_empty() {
                parts.push(format!(
                    "unparsable XML files: {}",
                    bracketed(&self.failed_files)
                ));
            }
            return Err(ImportError::ImportedWithWarnings(format!(
                "import completed: {}; all remaining problems were imported",
                parts.iter().join("; ")
            )));
        }
        Ok(())
    }
}

/// Drives a whole FPS import: staging, parsing, persistence, aggregation.
pub struct FpsImporter<'a> {
    config: &'a ImportConfig,
    catalog: &'a dyn LanguageCatalog,
    store: &'a mut dyn ProblemStore,
}

impl<'a> FpsImporter<'a> {
    /// Build an importer around its configuration and collaborators.
    pub fn new(
        config: &'a ImportConfig,
        catalog: &'a dyn LanguageCatalog,
        store: &'a mut dyn ProblemStore,
    ) -> FpsImporter<'a> {
        FpsImporter {
            config,
            catalog,
            store,
        }
    }

    /// Import every problem contained in `upload`, attributing the records
    /// to `author`.
    ///
    /// Completes without a value when every problem was imported cleanly;
    /// any partial failure surfaces as one of the message-carrying
    /// [`ImportError`] variants, see the crate documentation.
    pub fn import(&mut self, upload: &Upload, author: &str) -> Result<(), ImportError> {
        stage::check_extension(&upload.filename)?;
        let workdir = resolve_writable_dir(
            &self.config.testcase_dir,
            &self.config.testcase_fallback_dir,
        )?;
        let asset_dir =
            resolve_writable_dir(&self.config.asset_dir, &self.config.asset_fallback_dir)?;

        let staged = stage::stage(upload, &workdir)?;
        // the staged XML copies are only needed while parsing
        let _staging_sweep = staged.staging_dir().map(|dir| {
            scopeguard::guard(dir.to_path_buf(), |dir| {
                if let Err(e) = fs::remove_dir_all(&dir) {
                    warn!("cannot remove staging directory {}: {}", dir.display(), e);
                }
            })
        });

        let ctx = ParseContext {
            workdir: &workdir,
            asset_dir: &asset_dir,
            asset_url_prefix: &self.config.asset_url_prefix,
            author,
            catalog: self.catalog,
        };
        let mut outcome = BatchOutcome::default();
        let mut results: Vec<ImportResult> = Vec::new();
        for unit in staged.units() {
            match parse_document(unit, &ctx) {
                Ok(document) => {
                    results.extend(document.results);
                    outcome.record_skipped_titles(document.skipped);
                }
                Err(error @ ImportError::XmlParse { .. }) => {
                    warn!("skipping document {:?}: {}", unit.name(), error);
                    outcome.record_unparsable_file(unit.name());
                }
                Err(error) => return Err(error),
            }
        }
        if results.is_empty() {
            return Err(outcome.no_results_error());
        }

        for result in &results {
            let title = result.problem.title.as_str();
            match self.store.add_problem(result) {
                Ok(true) => outcome.record_imported(),
                Ok(false) => outcome.record_unreported_failure(),
                Err(StoreError::DuplicateTitle(_)) => outcome.record_duplicate(title),
                Err(error) => {
                    error!("failed to persist problem {:?}: {:?}", title, error);
                    outcome.record_unknown(title);
                }
            }
        }
        outcome.finalize()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn outcome() -> BatchOutcome {
        BatchOutcome::default()
    }

    #[test]
    fn clean_batch_finalizes_to_success() {
        let mut state = outcome();
        state.record_imported();
        state.record_imported();
        assert!(state.finalize().is_ok());
    }

    #[test]
    fn any_failure_wins_over_warnings() {
        let mut state = outcome();
        state.record_imported();
        state.record_duplicate("A + B");
        state.record_skipped_titles(vec!["No data".into()]);
        let err = state.finalize().unwrap_err();
        let ImportError::PartlyFailed(message) = err else {
            panic!("expected a hard failure");
        };
        assert!(message.contains("imported 1 problem(s), 1 failed"));
        assert!(message.contains("duplicate titles: [A + B]"));
        assert!(message.contains("skipped for missing test data: [No data]"));
    }

    #[test]
    fn unreported_failures_move_the_counter_only() {
        let mut state = outcome();
        state.record_imported();
        state.record_unreported_failure();
        let ImportError::PartlyFailed(message) = state.finalize().unwrap_err() else {
            panic!("expected a hard failure");
        };
        assert!(message.contains("1 failed"));
        assert!(message.contains("duplicate titles: []"));
    }

    #[test]
    fn skips_without_failures_finalize_to_a_warning() {
        let mut state = outcome();
        state.record_imported();
        state.record_skipped_titles(vec!["No data".into(), "No data".into()]);
        state.record_unparsable_file("broken.xml");
        let ImportError::ImportedWithWarnings(message) = state.finalize().unwrap_err() else {
            panic!("expected a warning outcome");
        };
        // duplicated titles are listed once
        assert!(message.contains("skipped for missing test data: [No data]"));
        assert!(message.contains("unparsable XML files: [broken.xml]"));
    }

    #[test]
    fn empty_batch_message_states_the_cause() {
        let mut state = outcome();
        state.record_unparsable_file("a.xml");
        let ImportError::NothingImported(message) = state.no_results_error() else {
            panic!("expected a nothing-imported outcome");
        };
        assert_eq!(
            message,
            "no problems imported: every XML document failed to parse: [a.xml]"
        );

        let mut state = outcome();
        state.record_skipped_titles(vec!["T".into()]);
        state.record_unparsable_file("a.xml");
        let ImportError::NothingImported(message) = state.no_results_error() else {
            panic!("expected a nothing-imported outcome");
        };
        assert!(message.contains("unparsable XML files: [a.xml]"));
        assert!(message.contains("items without test data: [T]"));
    }
}
