//! Version command implementation.

use crate::cli::SourceArg;
use crate::error::Result;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use clap::ValueEnum;
use serde::Serialize;

/// Import sources selectable with `--source`, excluding `auto`.
fn supported_sources() -> Vec<String> {
    SourceArg::value_variants()
        .iter()
        .filter_map(|arg| arg.resolve())
        .map(|source| source.to_string())
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    schema_version: i32,
    sources: Vec<String>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let sources = supported_sources();

    if json {
        let output = VersionOutput {
            version,
            build,
            schema_version: CURRENT_SCHEMA_VERSION,
            sources,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("lifeline version {version} ({build}, schema v{CURRENT_SCHEMA_VERSION})");
    println!("sources: {}", sources.join(", "));
    Ok(())
}
