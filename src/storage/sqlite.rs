//! SQLite storage implementation.
//!
//! Stores accepted timeline events and a history of import runs. Every batch
//! write happens inside one IMMEDIATE transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::import::{EventSink, ImportSource};
use crate::model::{ImportReport, Layer, Source, TimelineEvent};
use crate::storage::schema::apply_schema;

const EVENT_COLUMNS: &str = "id, user_id, title, description, start_at, end_at, layer, event_type, \
    source, source_id, location, media, metadata, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Outcome of an upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertStats {
    /// Events stored for the first time.
    pub inserted: usize,
    /// Events that replaced an earlier import of the same record.
    pub updated: usize,
}

/// One recorded import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRun {
    pub id: String,
    pub source: String,
    pub total_files: i64,
    pub total_events: i64,
    pub inserted: i64,
    pub updated: i64,
    pub errors: i64,
    pub skipped: i64,
    pub cancelled: bool,
    pub created_at: i64,
}

impl SqliteStorage {
    /// Open a database at the given path, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an IMMEDIATE transaction, committing on success.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    // ==================
    // Event Operations
    // ==================

    /// Insert or update a batch of events.
    ///
    /// An event whose `(source, sourceId)` is already stored replaces the
    /// stored row but keeps its id and creation time. Returns the events as
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing from the batch is kept.
    pub fn upsert_events(
        &mut self,
        events: Vec<TimelineEvent>,
    ) -> Result<(Vec<TimelineEvent>, UpsertStats)> {
        let now = Utc::now().timestamp_millis();
        let result = self.mutate(|tx| {
            let mut stats = UpsertStats::default();
            let mut stored = Vec::with_capacity(events.len());

            for mut event in events {
                let existing = match event.source_id.as_deref() {
                    Some(source_id) => tx
                        .query_row(
                            "SELECT id, created_at FROM events WHERE source = ?1 AND source_id = ?2",
                            rusqlite::params![event.source.as_str(), source_id],
                            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                        )
                        .optional()?,
                    None => None,
                };

                if let Some((id, created_at)) = existing {
                    event.id = id;
                    event.created_at = created_at;
                    event.updated_at = now;
                    stats.updated += 1;
                } else {
                    stats.inserted += 1;
                }
                write_event(tx, &event)?;
                stored.push(event);
            }
            Ok((stored, stats))
        })?;

        debug!(inserted = result.1.inserted, updated = result.1.updated, "Stored event batch");
        Ok(result)
    }

    /// Get an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_event(&self, id: &str) -> Result<Option<TimelineEvent>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                [id],
                map_event_row,
            )
            .optional()?;
        Ok(event)
    }

    /// List events, newest first, optionally filtered by layer and source.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_events(
        &self,
        layer: Option<Layer>,
        source: Option<Source>,
        limit: usize,
    ) -> Result<Vec<TimelineEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE (?1 IS NULL OR layer = ?1) AND (?2 IS NULL OR source = ?2)
             ORDER BY start_at DESC, id
             LIMIT ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let events = stmt
            .query_map(
                rusqlite::params![layer.map(|l| l.as_str()), source.map(|s| s.as_str()), limit],
                map_event_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Total number of stored events.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_events(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Stored event counts per layer. Layers without events are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_by_layer(&self) -> Result<BTreeMap<Layer, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT layer, COUNT(*) FROM events GROUP BY layer")?;
        let rows = stmt
            .query_map([], |row| {
                let layer: Layer = parse_column(row, 0)?;
                let count: i64 = row.get(1)?;
                Ok((layer, usize::try_from(count).unwrap_or_default()))
            })?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }

    // ==================
    // Import History
    // ==================

    /// Record a finished import run.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record_run(
        &mut self,
        source: ImportSource,
        report: &ImportReport,
        upserted: UpsertStats,
    ) -> Result<ImportRun> {
        let run = ImportRun {
            id: format!("run_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
            source: source.to_string(),
            total_files: to_i64(report.stats.total_files),
            total_events: to_i64(report.stats.total_events),
            inserted: to_i64(upserted.inserted),
            updated: to_i64(upserted.updated),
            errors: to_i64(report.errors.len()),
            skipped: to_i64(report.stats.skipped),
            cancelled: report.cancelled,
            created_at: Utc::now().timestamp_millis(),
        };

        self.mutate(|tx| {
            tx.execute(
                "INSERT INTO import_runs (id, source, total_files, total_events, inserted, updated, errors, skipped, cancelled, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    run.id,
                    run.source,
                    run.total_files,
                    run.total_events,
                    run.inserted,
                    run.updated,
                    run.errors,
                    run.skipped,
                    run.cancelled,
                    run.created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(run)
    }

    /// Most recent import runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<ImportRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, total_files, total_events, inserted, updated, errors, skipped, cancelled, created_at
             FROM import_runs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok(ImportRun {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    total_files: row.get(2)?,
                    total_events: row.get(3)?,
                    inserted: row.get(4)?,
                    updated: row.get(5)?,
                    errors: row.get(6)?,
                    skipped: row.get(7)?,
                    cancelled: row.get(8)?,
                    created_at: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

impl EventSink for SqliteStorage {
    fn add_batch(&mut self, events: Vec<TimelineEvent>) -> Result<Vec<TimelineEvent>> {
        self.upsert_events(events).map(|(stored, _)| stored)
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn write_event(tx: &Transaction, event: &TimelineEvent) -> Result<()> {
    let location = event.location.as_ref().map(serde_json::to_string).transpose()?;
    let media = if event.media.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&event.media)?)
    };
    let metadata = if event.metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&event.metadata)?)
    };

    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO events ({EVENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        rusqlite::params![
            event.id,
            event.user_id,
            event.title,
            event.description,
            event.start_date.timestamp_millis(),
            event.end_date.map(|d| d.timestamp_millis()),
            event.layer.as_str(),
            event.event_type,
            event.source.as_str(),
            event.source_id,
            location,
            media,
            metadata,
            event.created_at,
            event.updated_at,
        ],
    )?;
    Ok(())
}

fn conversion_error(idx: usize, kind: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, kind, message.into())
}

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(|e| conversion_error(idx, Type::Text, e.to_string())))
        .transpose()
}

fn millis_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|ms| {
        DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| conversion_error(idx, Type::Integer, format!("timestamp out of range: {ms}")))
    })
    .transpose()
}

// Helper to map event rows
fn map_event_row(row: &rusqlite::Row) -> rusqlite::Result<TimelineEvent> {
    let start_date = millis_column(row, 4)?
        .ok_or_else(|| conversion_error(4, Type::Null, "missing start".to_string()))?;
    Ok(TimelineEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start_date,
        end_date: millis_column(row, 5)?,
        layer: parse_column(row, 6)?,
        event_type: row.get(7)?,
        source: parse_column(row, 8)?,
        source_id: row.get(9)?,
        location: json_column(row, 10)?,
        media: json_column(row, 11)?.unwrap_or_default(),
        metadata: json_column(row, 12)?.unwrap_or_default(),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, MediaAttachment, MediaKind};
    use chrono::TimeZone;

    fn event(title: &str, layer: Layer, source: Source, year: i32) -> TimelineEvent {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        TimelineEvent::new(title, start, layer, "test", source)
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_event_roundtrip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let original = event("Trip", Layer::Travel, Source::Google, 2020)
            .with_source_id("a.jpg")
            .with_description(Some("Rome".into()))
            .with_location(Location::new(41.9, 12.5))
            .with_media(MediaAttachment {
                file_name: "a.jpg".into(),
                kind: MediaKind::Photo,
                mime_type: Some("image/jpeg".into()),
            })
            .with_metadata("people", vec!["Ann"]);

        storage.add_batch(vec![original.clone()]).unwrap();
        let loaded = storage.get_event(&original.id).unwrap().unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_reimport_updates_in_place() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = event("Old title", Layer::Work, Source::Linkedin, 2019).with_source_id("pos:1");
        let (_, stats) = storage.upsert_events(vec![first.clone()]).unwrap();
        assert_eq!(stats, UpsertStats { inserted: 1, updated: 0 });

        let again = event("New title", Layer::Work, Source::Linkedin, 2019)
            .with_source_id("pos:1")
            .with_id("evt_other");
        let (stored, stats) = storage.upsert_events(vec![again]).unwrap();

        assert_eq!(stats, UpsertStats { inserted: 0, updated: 1 });
        assert_eq!(stored[0].id, first.id);
        assert_eq!(stored[0].created_at, first.created_at);
        assert_eq!(storage.count_events().unwrap(), 1);
        assert_eq!(storage.get_event(&first.id).unwrap().unwrap().title, "New title");
    }

    #[test]
    fn test_same_source_id_different_source() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .add_batch(vec![
                event("A", Layer::Media, Source::Google, 2020).with_source_id("x"),
                event("B", Layer::Media, Source::Facebook, 2020).with_source_id("x"),
            ])
            .unwrap();
        assert_eq!(storage.count_events().unwrap(), 2);
    }

    #[test]
    fn test_list_and_count_by_layer() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .add_batch(vec![
                event("Job", Layer::Work, Source::Linkedin, 2018),
                event("Degree", Layer::Education, Source::Linkedin, 2014),
                event("Photo", Layer::Media, Source::Google, 2021),
                event("Promotion", Layer::Work, Source::Manual, 2020),
            ])
            .unwrap();

        let all = storage.list_events(None, None, 10).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].title, "Photo");

        let work = storage.list_events(Some(Layer::Work), None, 10).unwrap();
        assert_eq!(work.len(), 2);

        let linkedin_work = storage
            .list_events(Some(Layer::Work), Some(Source::Linkedin), 10)
            .unwrap();
        assert_eq!(linkedin_work.len(), 1);

        assert_eq!(storage.list_events(None, None, 1).unwrap().len(), 1);

        let counts = storage.count_by_layer().unwrap();
        assert_eq!(counts.get(&Layer::Work), Some(&2));
        assert_eq!(counts.get(&Layer::Health), None);
    }

    #[test]
    fn test_record_and_list_runs() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut report = ImportReport::default();
        report.stats.total_files = 3;
        report.cancelled = true;

        let run = storage
            .record_run(ImportSource::Google, &report, UpsertStats { inserted: 2, updated: 1 })
            .unwrap();
        assert!(run.id.starts_with("run_"));

        let runs = storage.list_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0], run);
        assert_eq!(runs[0].source, "google");
        assert!(runs[0].cancelled);
    }
}
