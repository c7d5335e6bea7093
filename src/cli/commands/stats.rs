//! Stats command implementation.

use crate::cli::commands::open_storage;
use crate::config::Config;
use crate::error::Result;
use crate::model::Layer;
use crate::storage::ImportRun;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    total_events: usize,
    events_by_layer: BTreeMap<Layer, usize>,
    recent_runs: Vec<ImportRun>,
}

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or queried.
pub fn execute(runs: usize, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let storage = open_storage(db_path, &config)?;

    let output = StatsOutput {
        total_events: storage.count_events()?,
        events_by_layer: storage.count_by_layer()?,
        recent_runs: storage.list_runs(runs)?,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Timeline".cyan().bold());
    println!("  Events: {}", output.total_events.to_string().green());
    for layer in Layer::ALL {
        let count = output.events_by_layer.get(&layer).copied().unwrap_or(0);
        println!("    {:<14} {count}", layer.as_str());
    }

    if !output.recent_runs.is_empty() {
        println!();
        println!("{}", "Recent imports".cyan().bold());
        for run in &output.recent_runs {
            let when = chrono::DateTime::from_timestamp_millis(run.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let cancelled = if run.cancelled { " cancelled" } else { "" };
            println!(
                "  {when}  {:<9} {} events, {} new, {} updated, {} errors{cancelled}  {}",
                run.source,
                run.total_events,
                run.inserted,
                run.updated,
                run.errors,
                run.id.dimmed()
            );
        }
    }
    Ok(())
}
