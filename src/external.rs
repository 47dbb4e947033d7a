use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::Result;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Errors from launching or waiting on an external program.
///
/// Reported with the underlying OS error text; the command is treated as
/// failed and the shell loop continues.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program was not found on the search path.
    #[error("command not found: {0}")]
    CommandNotFound(String),
    /// The child process could not be created.
    #[error("failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The child was created but waiting on it failed.
    #[error("failed to wait for '{program}': {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Command that is not a builtin.
///
/// Holds the resolved executable path plus the original program token,
/// which the child keeps as its `argv[0]`.
pub struct ExternalCommand {
    path: OsString,
    name: String,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(path: OsString, name: String, args: Vec<OsString>) -> Self {
        Self { path, name, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = session.get_var("PATH")?;
        let executable = find_command_path(OsStr::new(&search_paths), Path::new(name))?;
        Some(Box::new(ExternalCommand::new(
            executable.into_os_string(),
            name.to_string(),
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    /// Spawn the program and block until this specific child terminates.
    ///
    /// The child inherits the parent's standard streams (`stdout` is unused
    /// here) and sees the session's variable view as its environment. At
    /// most one child is ever outstanding; there is no backgrounding.
    fn execute(
        self: Box<Self>,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let mut cmd = std::process::Command::new(&self.path);
        cmd.args(&self.args)
            .envs(session.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.name);
        }

        tracing::debug!(program = %self.name, path = ?self.path, "spawning child");
        let mut child = cmd.spawn().map_err(|source| ExecError::SpawnFailed {
            program: self.name.clone(),
            source,
        })?;
        let exit_status = child.wait().map_err(|source| ExecError::WaitFailed {
            program: self.name.clone(),
            source,
        })?;

        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a program path the way a typical shell would.
///
/// Behavior:
/// - Anything with more than one component (absolute, `./foo`, `bin/sh`)
///   is checked as given and returned if it exists.
/// - A single bare component is searched through each directory in
///   `search_paths` (PATH) and the first existing match is returned; on
///   non-Unix hosts the current directory is tried first.
/// - An empty path resolves to nothing.
pub fn find_command_path(search_paths: &OsStr, program: &Path) -> Option<PathBuf> {
    if program.as_os_str().is_empty() {
        return None;
    }

    if program.is_absolute() || program.components().count() > 1 {
        return program.exists().then(|| program.to_path_buf());
    }

    if cfg!(not(unix)) && program.exists() {
        return Some(program.to_path_buf());
    }

    for dir in std::env::split_paths(search_paths) {
        let candidate = dir.join(program);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_path_is_returned() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/bin"), path).expect("/bin/sh should resolve");
        assert_eq!(found, path);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_missing_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new("/bin/nonexisting")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn bare_name_is_searched_in_path() {
        let found = find_command_path(osstr("/bin"), Path::new("sh"))
            .expect("'sh' should be found in /bin");
        assert!(found.starts_with("/bin"));
        assert!(found.ends_with("sh"));
    }

    #[test]
    #[cfg(unix)]
    fn bare_name_missing_from_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new("nonexisting")).is_none());
    }

    #[test]
    fn empty_path_is_none() {
        assert!(find_command_path(OsStr::new("/bin"), Path::new("")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn child_exit_code_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new("$ ", HistoryStore::new(dir.path().join("history")));

        let cmd = Box::new(ExternalCommand::new(
            OsString::from("/bin/sh"),
            "sh".to_string(),
            vec![OsString::from("-c"), OsString::from("exit 3")],
        ));
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, &mut session).unwrap();

        assert_eq!(code, 3);
    }

    #[test]
    #[cfg(unix)]
    fn spawn_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new("$ ", HistoryStore::new(dir.path().join("history")));

        // Resolution is bypassed, so the spawn itself fails.
        let cmd = Box::new(ExternalCommand::new(
            OsString::from("/definitely/not/a/program"),
            "nope".to_string(),
            Vec::new(),
        ));
        let mut out = Vec::new();
        let err = cmd.execute(&mut out, &mut session).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::SpawnFailed { .. })
        ));
    }
}
