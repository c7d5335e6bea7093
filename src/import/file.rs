//! File loading and JSONL output.
//!
//! - Loading: paths or directories (walked with `walkdir`) → in-memory
//!   [`RawFile`]s, read with `tokio::fs`, checking the abort flag between
//!   files.
//! - Output: atomic JSONL writes (temp file, fsync, rename).

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::model::{ImportError, TimelineEvent};

use super::types::{AbortSignal, ImportFailure, ImportResult, RawFile};

/// Files read from disk plus the entries that could not be read.
#[derive(Debug, Default)]
pub struct LoadedInput {
    pub files: Vec<RawFile>,
    pub errors: Vec<ImportError>,
}

/// Read every file under `paths`.
///
/// A file argument keeps its path as given. Files found under a directory
/// argument get a path relative to that directory's parent, so the
/// directory's own name (e.g. `Photos from 2019`) stays visible to the
/// parsers. Hidden entries are skipped and directory symlinks are not
/// followed. An entry that cannot be read is recorded as a non-fatal error.
/// Stops early, returning what was read, when `abort` is raised.
///
/// # Errors
///
/// Returns an error if one of `paths` does not exist.
pub async fn load_files(paths: &[PathBuf], abort: &AbortSignal) -> ImportResult<LoadedInput> {
    let mut loaded = LoadedInput::default();

    for root in paths {
        let metadata = tokio::fs::metadata(root)
            .await
            .map_err(|_| ImportFailure::NotFound(root.display().to_string()))?;

        if metadata.is_file() {
            if abort.is_aborted() {
                break;
            }
            read_into(&mut loaded, root, root.to_string_lossy().into_owned()).await;
            continue;
        }

        let base = root.parent().unwrap_or_else(|| Path::new(""));
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string());
                    warn!(path = ?path, error = %e, "Skipping unreadable entry");
                    loaded.errors.push(ImportError::skipped(
                        format!("Skipped unreadable entry: {e}"),
                        path.as_deref(),
                    ));
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                match tokio::fs::metadata(entry.path()).await {
                    Ok(target) if target.is_file() => {}
                    Ok(_) => {
                        debug!(path = %entry.path().display(), "Not following directory symlink");
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "Skipping broken symlink");
                        loaded.errors.push(ImportError::skipped(
                            format!("Skipped broken link: {e}"),
                            Some(entry.path().display().to_string().as_str()),
                        ));
                        continue;
                    }
                }
            }

            if abort.is_aborted() {
                debug!(loaded = loaded.files.len(), "Loading aborted");
                return Ok(loaded);
            }
            let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
            read_into(&mut loaded, entry.path(), relative.to_string_lossy().into_owned()).await;
        }
    }

    debug!(count = loaded.files.len(), skipped = loaded.errors.len(), "Loaded input files");
    Ok(loaded)
}

async fn read_into(loaded: &mut LoadedInput, path: &Path, shown: String) {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            trace!(file = %shown, size = bytes.len(), "Loaded file");
            loaded.files.push(RawFile::new(shown, bytes));
        }
        Err(e) => {
            warn!(file = %shown, error = %e, "Skipping unreadable file");
            loaded
                .errors
                .push(ImportError::skipped(format!("Skipped unreadable file: {e}"), Some(shown.as_str())));
        }
    }
}

/// Whether a path's file name starts with `.`.
fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Write content to a file atomically.
///
/// Writes to a temporary sibling, syncs it to disk, then renames it over
/// the target. On failure the original file is left untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> ImportResult<()> {
    let temp_path = path.with_extension("jsonl.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write events to a JSONL file atomically, one event per line.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_jsonl(path: &Path, events: &[TimelineEvent]) -> ImportResult<()> {
    let mut content = String::new();
    for event in events {
        content.push_str(&serde_json::to_string(event)?);
        content.push('\n');
    }
    atomic_write(path, &content)
}

/// Read events back from a JSONL file. Blank lines are ignored.
///
/// # Errors
///
/// Returns an error if the file is missing or a line is not a valid event.
pub fn read_jsonl(path: &Path) -> ImportResult<Vec<TimelineEvent>> {
    if !path.exists() {
        return Err(ImportFailure::NotFound(path.display().to_string()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, Source};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/events.jsonl");
        let events = vec![
            TimelineEvent::new("A", Utc::now(), Layer::Work, "job", Source::Linkedin).with_source_id("a"),
            TimelineEvent::new("B", Utc::now(), Layer::Media, "photo", Source::Google),
        ];

        write_jsonl(&path, &events).unwrap();
        assert!(!path.with_extension("jsonl.tmp").exists());

        let read = read_jsonl(&path).unwrap();
        assert_eq!(read, events);
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_jsonl(&temp_dir.path().join("none.jsonl"));
        assert!(matches!(result, Err(ImportFailure::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_directory_keeps_folder_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Takeout");
        let album = root.join("Photos from 2019");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("a.jpg"), [1u8, 2, 3]).unwrap();
        fs::write(root.join("b.csv"), "Title,Date\n").unwrap();
        fs::write(root.join(".DS_Store"), "junk").unwrap();

        let loaded = load_files(&[root], &AbortSignal::new()).await.unwrap();
        assert!(loaded.errors.is_empty());
        let files = loaded.files;
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&"Takeout/b.csv"));
        assert!(paths.contains(&"Takeout/Photos from 2019/a.jpg"));
        let photo = files.iter().find(|f| f.name() == "a.jpg").unwrap();
        assert_eq!(photo.folder(), Some("Photos from 2019"));
        assert_eq!(photo.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_load_missing_path() {
        let result = load_files(&[PathBuf::from("/definitely/not/here")], &AbortSignal::new()).await;
        assert!(matches!(result, Err(ImportFailure::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_stops_when_aborted() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.csv"), "x").unwrap();

        let abort = AbortSignal::new();
        abort.abort();
        let loaded = load_files(&[temp_dir.path().to_path_buf()], &abort).await.unwrap();
        assert!(loaded.files.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bad_entries_are_skipped_not_fatal() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Takeout");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.jpg"), [7u8]).unwrap();
        symlink(&root, root.join("loop")).unwrap();
        symlink(root.join("missing.jpg"), root.join("dangling.jpg")).unwrap();
        fs::write(temp_dir.path().join("target.csv"), "Title,Date\n").unwrap();
        symlink(temp_dir.path().join("target.csv"), root.join("linked.csv")).unwrap();

        let loaded = load_files(&[root], &AbortSignal::new()).await.unwrap();
        let paths: Vec<&str> = loaded.files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["Takeout/a.jpg", "Takeout/linked.csv"]);
        assert_eq!(loaded.errors.len(), 1);
        assert!(!loaded.errors[0].fatal);
        assert!(loaded.errors[0].file.as_deref().unwrap().ends_with("dangling.jpg"));
    }
}
