//! Import command implementation.
//!
//! Loads the given paths, runs the importer, and stores accepted events.
//! Ctrl-C raises the abort flag; the partial report is still stored and
//! printed.

use crate::cli::ImportArgs;
use crate::cli::commands::open_storage;
use crate::config::{resolve_user_id, Config};
use crate::error::{Error, Result};
use crate::import::{EventSink, FieldMapping, ImportOptions, ImportSource, Importer, JsonlSink};
use crate::model::{ImportError, ImportReport, ImportStats};
use crate::storage::UpsertStats;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Errors listed in human output before the rest are summarised.
const MAX_LISTED_ERRORS: usize = 10;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportOutput<'a> {
    source: String,
    dry_run: bool,
    cancelled: bool,
    stats: &'a ImportStats,
    errors: &'a [ImportError],
    #[serde(skip_serializing_if = "Option::is_none")]
    stored: Option<UpsertStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out: Option<String>,
}

/// Build the CLI's explicit column mapping from `field=Column` assignments.
fn build_mapping(assignments: &[String]) -> Result<Option<FieldMapping>> {
    if assignments.is_empty() {
        return Ok(None);
    }
    let mut mapping = FieldMapping::default();
    for assignment in assignments {
        mapping.apply(assignment).map_err(|reason| Error::InvalidMapping {
            assignment: assignment.clone(),
            reason,
        })?;
    }
    Ok(Some(mapping))
}

fn build_options(args: &ImportArgs, config: &Config) -> Result<ImportOptions> {
    let defaults = ImportOptions::default();
    Ok(ImportOptions {
        user_id: resolve_user_id(args.user.as_deref(), config),
        default_layer: args
            .layer
            .or(config.default_layer)
            .unwrap_or(defaults.default_layer),
        default_event_type: args
            .event_type
            .clone()
            .or_else(|| config.default_event_type.clone())
            .unwrap_or(defaults.default_event_type),
        mapping: build_mapping(&args.mappings)?,
        ..defaults
    })
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error for invalid arguments, storage failures, or when the
/// importer reports a fatal error (after the report has been printed).
pub fn execute(args: &ImportArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let options = build_options(args, &config)?;
    let abort = options.abort.clone();
    let importer = Importer::new(options);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    let (source, report) = rt.block_on(async {
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current file");
                abort.abort();
            }
        });
        let result = importer.import_paths(args.source.resolve(), &args.paths).await;
        watcher.abort();
        result
    });

    let mut stored = None;
    let mut run_id = None;
    if !args.dry_run {
        let mut storage = open_storage(db_path, &config)?;
        let (_, upserted) = storage.upsert_events(report.events.clone())?;
        let run = storage.record_run(source, &report, upserted)?;
        info!(run = %run.id, inserted = upserted.inserted, updated = upserted.updated, "Recorded import");
        stored = Some(upserted);
        run_id = Some(run.id);
    }

    if let Some(out) = &args.out {
        JsonlSink::new(out).add_batch(report.events.clone())?;
    }

    if json {
        let output = ImportOutput {
            source: source.to_string(),
            dry_run: args.dry_run,
            cancelled: report.cancelled,
            stats: &report.stats,
            errors: &report.errors,
            stored,
            run_id,
            out: args.out.as_ref().map(|p| p.display().to_string()),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_report(source, &report, stored, args);
    }

    let fatal = report.fatal_errors();
    if fatal > 0 {
        let first = report
            .errors
            .iter()
            .find(|e| e.fatal)
            .map(|e| e.message.clone())
            .unwrap_or_default();
        return Err(Error::ImportFailed { fatal, first });
    }
    Ok(())
}

fn print_report(source: ImportSource, report: &ImportReport, stored: Option<UpsertStats>, args: &ImportArgs) {
    let stats = &report.stats;

    println!("{} {}", "Import".cyan().bold(), source.to_string().bold());
    println!(
        "  Files:   {} ({} recognised)",
        stats.total_files, stats.processed_files
    );
    println!("  Events:  {}", stats.total_events.to_string().green());
    for (layer, count) in &stats.events_by_layer {
        println!("    {:<14} {count}", layer.as_str());
    }
    if stats.skipped > 0 {
        println!("  Skipped: {}", stats.skipped.to_string().yellow());
    }

    match stored {
        Some(upserted) => println!(
            "  Stored:  {} new, {} updated",
            upserted.inserted, upserted.updated
        ),
        None => println!("  {}", "Dry run: nothing stored".dimmed()),
    }
    if let Some(out) = &args.out {
        println!("  Wrote:   {}", out.display());
    }

    if !report.errors.is_empty() {
        println!();
        println!("{}", "Problems".yellow().bold());
        for error in report.errors.iter().take(MAX_LISTED_ERRORS) {
            let marker = if error.fatal { "fatal".red() } else { "skip".yellow() };
            match &error.file {
                Some(file) => println!("  [{marker}] {} {}", error.message, format!("({file})").dimmed()),
                None => println!("  [{marker}] {}", error.message),
            }
        }
        if report.errors.len() > MAX_LISTED_ERRORS {
            println!("  ... and {} more", report.errors.len() - MAX_LISTED_ERRORS);
        }
    }

    if report.cancelled {
        println!();
        println!("{}", "Cancelled: results above are partial".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SourceArg;
    use crate::model::Layer;

    fn args() -> ImportArgs {
        ImportArgs {
            paths: vec![PathBuf::from("export")],
            source: SourceArg::Auto,
            user: None,
            layer: None,
            event_type: None,
            mappings: Vec::new(),
            dry_run: true,
            out: None,
        }
    }

    #[test]
    fn test_build_mapping() {
        assert!(build_mapping(&[]).unwrap().is_none());

        let mapping = build_mapping(&["title=Headline".to_string()]).unwrap().unwrap();
        assert_eq!(mapping.title.as_deref(), Some("Headline"));

        let err = build_mapping(&["nonsense".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let err = build_mapping(&["colour=Red".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidMapping { .. }));
    }

    #[test]
    fn test_options_prefer_flags_over_config() {
        let config = Config {
            default_user_id: Some("config_user".into()),
            default_layer: Some(Layer::Health),
            default_event_type: Some("checkup".into()),
            db_path: None,
        };

        let mut flagged = args();
        flagged.user = Some("flag_user".into());
        flagged.layer = Some(Layer::Travel);
        let options = build_options(&flagged, &config).unwrap();
        assert_eq!(options.user_id.as_deref(), Some("flag_user"));
        assert_eq!(options.default_layer, Layer::Travel);
        assert_eq!(options.default_event_type, "checkup");

        let options = build_options(&args(), &Config::default()).unwrap();
        assert_eq!(options.default_layer, Layer::Media);
        assert_eq!(options.default_event_type, "event");
    }
}
