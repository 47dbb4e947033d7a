use std::collections::HashMap;
use std::env as stdenv;

use crate::history::HistoryStore;

/// Mutable, per-run context threaded through the command loop.
///
/// The session contains:
/// - `prompt`: the string printed before each read.
/// - `history`: the file-backed log of raw input lines.
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `should_exit`: a flag the REPL loop checks to know when to terminate;
///   the dispatcher sets it when `exit` is entered.
///
/// Threading the session explicitly keeps the shell free of process-wide
/// globals.
pub struct Session {
    /// Prompt written before each line is read.
    pub prompt: String,
    /// The on-disk command history.
    pub history: HistoryStore,
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Session {
    /// Capture the current process environment and attach a history store.
    ///
    /// Variables are copied from `std::env::vars()`; `should_exit` starts
    /// out false.
    pub fn new(prompt: impl Into<String>, history: HistoryStore) -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        Self {
            prompt: prompt.into(),
            history,
            vars,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable for this session.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_session(dir: &tempfile::TempDir) -> Session {
        Session::new("$ ", HistoryStore::new(dir.path().join("history")))
    }

    #[test]
    fn test_set_and_get_var() {
        let dir = tempdir().unwrap();
        let mut session = make_session(&dir);

        assert_eq!(session.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        session.set_var("KEY", "VALUE");

        assert_eq!(session.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_reads_from_process_env() {
        let dir = tempdir().unwrap();
        let session = make_session(&dir);
        assert!(session.get_var("PATH").is_some());
    }
}
