//! Events command implementation.

use crate::cli::EventsArgs;
use crate::cli::commands::{open_storage, truncate};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::TimelineEvent;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the events command.
///
/// With an id, prints that one event in full. Otherwise lists stored events,
/// newest first.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the event is unknown.
pub fn execute(args: &EventsArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let storage = open_storage(db_path, &config)?;

    if let Some(id) = &args.id {
        let event = storage
            .get_event(id)?
            .ok_or_else(|| Error::EventNotFound { id: id.clone() })?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
        return Ok(());
    }

    let events = storage.list_events(args.layer, args.source, args.limit)?;

    if json {
        println!("{}", serde_json::to_string(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    for event in &events {
        println!(
            "{}  {:<13} {}  {}",
            event.start_date.format("%Y-%m-%d"),
            event.layer.as_str(),
            truncate(&event.title, 60),
            format!("[{}] {}", event.source, event.id).dimmed()
        );
    }
    println!();
    println!("{} event(s)", events.len());
    Ok(())
}

fn print_event(event: &TimelineEvent) {
    println!("{}", event.title.bold());
    println!("  ID:      {}", event.id);
    match event.end_date {
        Some(end) => println!(
            "  When:    {} to {}",
            event.start_date.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  When:    {}", event.start_date.format("%Y-%m-%d %H:%M")),
    }
    println!("  Layer:   {} ({})", event.layer, event.event_type);
    println!("  Source:  {}", event.source);
    if let Some(source_id) = &event.source_id {
        println!("  Ref:     {}", source_id.dimmed());
    }
    if let Some(user) = &event.user_id {
        println!("  User:    {user}");
    }
    if let Some(location) = &event.location {
        let name = location.name.as_deref().unwrap_or("");
        println!(
            "  Where:   {name} ({:.5}, {:.5})",
            location.latitude, location.longitude
        );
    }
    for media in &event.media {
        println!("  Media:   {}", media.file_name);
    }
    if let Some(description) = &event.description {
        println!();
        println!("{description}");
    }
}
