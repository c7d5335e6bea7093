//! Import orchestration.
//!
//! Routes a batch to its parser, converts a parser failure into one fatal
//! error, applies caller defaults, drops events that break the model
//! invariants, and computes the final statistics. `import` always returns a
//! report.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::model::{ImportError, ImportReport};

use super::file::load_files;
use super::parsers::{ParseContext, SourceParser, parser_for};
use super::types::{ImportOptions, ImportSource, RawFile};

/// Runs imports with one set of options.
#[derive(Debug, Clone, Default)]
pub struct Importer {
    options: ImportOptions,
}

impl Importer {
    #[must_use]
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import an in-memory batch from `source`.
    #[must_use]
    pub fn import(&self, source: ImportSource, files: &[RawFile]) -> ImportReport {
        self.import_with(parser_for(source).as_ref(), files)
    }

    /// Import an in-memory batch with a specific parser.
    #[must_use]
    pub fn import_with(&self, parser: &dyn SourceParser, files: &[RawFile]) -> ImportReport {
        let source = parser.source();
        info!(%source, files = files.len(), "Starting import");

        let mut ctx = ParseContext::new(&self.options);
        if let Err(e) = parser.parse(files, &mut ctx) {
            warn!(%source, error = %e, kept = ctx.events.len(), "Parser failed");
            ctx.errors.push(ImportError::fatal(e.to_string()));
        }

        let ParseContext {
            events,
            mut errors,
            mut stats,
            ..
        } = ctx;
        stats.total_files = files.len();

        let mut accepted = Vec::with_capacity(events.len());
        for mut event in events {
            if event.user_id.is_none() {
                event.user_id.clone_from(&self.options.user_id);
            }
            match event.validate() {
                Ok(()) => accepted.push(event),
                Err(reason) => {
                    warn!(%source, title = %event.title, %reason, "Dropped invalid event");
                    errors.push(ImportError::skipped(
                        format!("Dropped \"{}\": {reason}", event.title),
                        event.metadata.get("path").and_then(|p| p.as_str()),
                    ));
                    stats.skipped += 1;
                }
            }
        }
        stats.count_events(&accepted);

        let cancelled = self.options.abort.is_aborted();
        info!(
            %source,
            events = stats.total_events,
            errors = errors.len(),
            skipped = stats.skipped,
            cancelled,
            "Import finished"
        );

        ImportReport {
            events: accepted,
            errors,
            stats,
            cancelled,
        }
    }

    /// Load `paths` from disk and import them.
    ///
    /// With no `source`, the source is detected from the file names. Entries
    /// that cannot be read are reported as skips. A missing path yields a
    /// report with a single fatal error.
    pub async fn import_paths(
        &self,
        source: Option<ImportSource>,
        paths: &[PathBuf],
    ) -> (ImportSource, ImportReport) {
        let loaded = match load_files(paths, &self.options.abort).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Failed to load input");
                let report = ImportReport {
                    errors: vec![ImportError::fatal(e.to_string())],
                    cancelled: self.options.abort.is_aborted(),
                    ..ImportReport::default()
                };
                return (source.unwrap_or(ImportSource::Csv), report);
            }
        };

        let source = source.unwrap_or_else(|| ImportSource::detect(&loaded.files));
        let mut report = self.import(source, &loaded.files);
        report.stats.skipped += loaded.errors.len();
        report.errors.splice(0..0, loaded.errors);
        (source, report)
    }
}
