use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::{DispatchError, Factory};
use crate::session::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Root under which `procread` resolves its relative arguments.
const PROC_ROOT: &str = "/proc";

/// Number of entries the `history` built-in lists.
const HISTORY_LINES: usize = 10;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "history" or "procread".
    fn name() -> &'static str;

    /// Executes the command using the provided output stream and session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                // A failed built-in reports itself and the loop goes on.
                eprintln!("procsh: {}: {:#}", T::name(), e);
                Ok(1)
            }
        }
    }
}

/// Fallback command carrying argh's usage output when argument parsing
/// stopped early (bad arguments or `--help`).
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        if self.is_error {
            eprint!("{}", self.output);
            Ok(1)
        } else {
            write!(stdout, "{}", self.output)?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Stream a file from the process information filesystem to standard output.
pub struct ProcRead {
    #[argh(positional, greedy)]
    /// relative path under the process info root; exactly one is required.
    pub paths: Vec<String>,
}

impl BuiltinCommand for ProcRead {
    fn name() -> &'static str {
        "procread"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let path = match self.paths.as_slice() {
            [] => return Err(DispatchError::MissingArgument("file argument required").into()),
            [one] => one,
            _ => {
                return Err(
                    DispatchError::TooManyArguments("only 1 argument is permitted").into(),
                );
            }
        };

        let resolved = resolve_proc_path(path)?;
        let mut file = File::open(&resolved)
            .with_context(|| format!("cannot open '{}'", resolved.display()))?;
        std::io::copy(&mut file, stdout)?;
        Ok(0)
    }
}

/// Resolve a `procread` argument against the process info root.
///
/// Absolute paths are rejected before any file access. A path already
/// carrying the `proc/` prefix is used as given; anything else is joined
/// under [`PROC_ROOT`].
fn resolve_proc_path(path: &str) -> Result<PathBuf, DispatchError> {
    if path.is_empty() {
        return Err(DispatchError::MissingArgument("file argument required"));
    }
    if path.starts_with('/') {
        return Err(DispatchError::InvalidArgument(
            "only relative file paths are supported",
        ));
    }
    if path.starts_with("proc/") {
        Ok(PathBuf::from(path))
    } else {
        Ok(Path::new(PROC_ROOT).join(path))
    }
}

#[derive(FromArgs)]
/// List the most recent commands from the history log.
pub struct History {
    #[argh(positional, greedy)]
    /// ignored; the last 10 entries are always listed.
    pub _args: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        // The raw `history` line was appended before dispatch, so the read
        // excludes it. Empty or unreadable history fails quietly.
        let entries = match session.history.read_last(HISTORY_LINES) {
            Ok(entries) if !entries.is_empty() => entries,
            _ => return Ok(1),
        };
        for entry in &entries {
            writeln!(stdout, "{entry}")?;
        }
        Ok(0)
    }
}
