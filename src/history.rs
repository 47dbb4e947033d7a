//! Append-only command history persisted to a plain text file.
//!
//! Every raw input line is logged before it is decoded or dispatched, one
//! entry per line. The file is the sole source of truth: each operation
//! opens, touches and closes it, and nothing is cached in between. The
//! shell is single-threaded and assumed to be the only writer in its
//! working directory; concurrent writers are not guarded against.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default history file, relative to the shell's working directory.
pub const DEFAULT_HISTORY_FILE: &str = ".procsh_history";

/// Errors from the history store. All of them degrade gracefully at the
/// call sites in the shell loop; none aborts the process.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The history file could not be opened or created.
    #[error("failed to open history file '{}': {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The history file was open but reading or writing it failed.
    #[error("history file I/O failed on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File-backed store of raw command lines, append-ordered, never
/// reordered or deduplicated.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one raw entry verbatim; returns how many entries were
    /// written (0 or 1).
    ///
    /// No newline is added here: the raw line from input capture already
    /// carries one. Failure to open or write the file degrades to 0 and is
    /// never fatal to the caller.
    pub fn append(&self, entry: &str) -> usize {
        match self.try_append(entry) {
            Ok(()) => 1,
            Err(err) => {
                tracing::warn!("history append degraded: {err}");
                0
            }
        }
    }

    fn try_append(&self, entry: &str) -> Result<(), HistoryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.open_failed(source))?;
        file.write_all(entry.as_bytes())
            .map_err(|source| self.io_failed(source))
    }

    /// Truncate the history file, leaving it empty. Invoked once at shell
    /// startup so each session begins with a fresh log.
    pub fn clear(&self) -> Result<(), HistoryError> {
        File::create(&self.path)
            .map(|_| ())
            .map_err(|source| self.open_failed(source))
    }

    /// Read the last `n` entries, oldest first, with the trailing newline
    /// stripped from each.
    ///
    /// The final line of the file is always dropped: the `history` built-in
    /// appends its own raw line before reading, so without the drop it
    /// would list itself. When more lines remain than `n`, only the most
    /// recent `n` are kept.
    pub fn read_last(&self, n: usize) -> Result<Vec<String>, HistoryError> {
        let file = File::open(&self.path).map_err(|source| self.open_failed(source))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            entries.push(line.map_err(|source| self.io_failed(source))?);
        }

        // The most recent line is the command being processed right now.
        entries.pop();

        if entries.len() > n {
            entries.drain(..entries.len() - n);
        }
        Ok(entries)
    }

    /// Append each entry followed by a newline; returns the count written.
    ///
    /// Bulk-restore counterpart of [`HistoryStore::append`] for callers
    /// that hold entries without their line terminators.
    pub fn write_many(&self, entries: &[String]) -> usize {
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(source) => {
                tracing::warn!("history bulk write degraded: {}", self.open_failed(source));
                return 0;
            }
        };

        let mut written = 0;
        for entry in entries {
            if let Err(source) = writeln!(file, "{entry}") {
                tracing::warn!("history bulk write degraded: {}", self.io_failed(source));
                break;
            }
            written += 1;
        }
        written
    }

    fn open_failed(&self, source: io::Error) -> HistoryError {
        HistoryError::OpenFailed {
            path: self.path.clone(),
            source,
        }
    }

    fn io_failed(&self, source: io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join(DEFAULT_HISTORY_FILE))
    }

    #[test]
    fn round_trip_excludes_the_in_flight_command() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.clear().unwrap();
        assert_eq!(store.append("ls\n"), 1);
        // Simulates the `history` command's own append before its read.
        assert_eq!(store.append("pwd\n"), 1);

        assert_eq!(store.read_last(10).unwrap(), vec!["ls"]);
    }

    #[test]
    fn read_last_keeps_the_most_recent_in_order() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.clear().unwrap();

        for entry in ["one", "two", "three", "four", "five", "history"] {
            store.append(&format!("{entry}\n"));
        }

        assert_eq!(store.read_last(3).unwrap(), vec!["three", "four", "five"]);
        assert_eq!(store.read_last(0).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn clear_empties_the_file() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.append("ls\n");
        store.clear().unwrap();
        store.append("history\n");

        // Only the in-flight line is present, so nothing remains after the drop.
        assert!(store.read_last(10).unwrap().is_empty());
    }

    #[test]
    fn write_many_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.clear().unwrap();

        let entries: Vec<String> = ["restored", "session", "history"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(store.write_many(&entries), 3);

        assert_eq!(store.read_last(10).unwrap(), vec!["restored", "session"]);
    }

    #[test]
    fn append_degrades_when_file_cannot_open() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("no/such/dir/history"));

        assert_eq!(store.append("ls\n"), 0);
        assert_eq!(store.write_many(&["ls".to_string()]), 0);
    }

    #[test]
    fn read_last_fails_when_file_is_missing() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        assert!(matches!(
            store.read_last(10),
            Err(HistoryError::OpenFailed { .. })
        ));
    }
}
