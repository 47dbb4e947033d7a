use crate::builtin::{History, ProcRead};
use crate::command::{CommandFactory, ExitCode};
use crate::external::{ExecError, ExternalCommand};
use crate::lexer;
use crate::parser::{self, TOKEN_LIMIT};
use crate::session::Session;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use thiserror::Error;

/// Errors raised by the dispatcher before a command ever runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// A required argument was not provided.
    #[error("{0}")]
    MissingArgument(&'static str),
    /// More arguments than the command accepts.
    #[error("{0}")]
    TooManyArguments(&'static str),
    /// The command text itself is malformed.
    #[error("invalid command")]
    InvalidCommandSyntax,
    /// An argument was provided but is not acceptable.
    #[error("{0}")]
    InvalidArgument(&'static str),
}

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: built-ins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell's command dispatcher and read-eval-print loop.
///
/// One iteration takes a raw input line through history logging, escape
/// decoding, trimming and dispatch to either a built-in or an external
/// program. The interpreter owns the [`Session`] and a list of
/// [`CommandFactory`] objects that are queried in order to create commands
/// by name. Every failure is isolated to its iteration; only `exit` (or end
/// of input) ends the loop.
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter over `session` with a custom set of command factories.
    pub fn new(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { session, commands }
    }

    /// Create an interpreter with the default set of commands:
    /// - built-ins: `procread`, `history`
    /// - the external program launcher
    pub fn with_defaults(session: Session) -> Self {
        Self::new(
            session,
            vec![
                Box::new(Factory::<ProcRead>::default()),
                Box::new(Factory::<History>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Take one raw input line through the full pipeline: log it, decode
    /// it, trim it, dispatch it.
    ///
    /// Returns the command's exit code. Failures are reported to stderr and
    /// isolated to this call; the caller keeps looping unless
    /// [`Session::should_exit`] was set.
    pub fn process_line(&mut self, raw: &str, stdout: &mut dyn Write) -> ExitCode {
        // The raw line goes to the log before any decoding, newline included.
        self.session.history.append(&format!("{raw}\n"));

        let decoded = match lexer::unescape(raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                eprintln!("procsh: decode: {err}");
                return 1;
            }
        };

        match self.dispatch(decoded.trim(), stdout) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("procsh: {err:#}");
                1
            }
        }
    }

    /// Decide what a decoded, trimmed command is and run it.
    fn dispatch(&mut self, command: &str, stdout: &mut dyn Write) -> Result<ExitCode> {
        // `exit` matches the whole command, so `exit 1` falls through to
        // external dispatch.
        if command == "exit" {
            self.session.should_exit = true;
            return Ok(0);
        }
        if command.is_empty() {
            return Ok(0);
        }
        // Quoting was resolved during decoding; a leading quote here cannot
        // start a program name.
        if command.starts_with('"') || command.starts_with('\'') {
            return Err(DispatchError::InvalidCommandSyntax.into());
        }

        let tokens = parser::tokenize(command, TOKEN_LIMIT);
        let Some(name) = tokens.first() else {
            return Ok(0);
        };
        let args: Vec<&str> = tokens.iter().skip(1).map(|s| s.as_str()).collect();

        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.session, name, &args) {
                return cmd.execute(stdout, &mut self.session);
            }
        }
        Err(ExecError::CommandNotFound(name.clone()).into())
    }

    /// The interactive read-eval-print loop.
    ///
    /// Reads with a line editor, feeds each line through
    /// [`Interpreter::process_line`] and stops when the session's exit flag
    /// is set or input ends. An interrupt at the prompt discards the line
    /// and prompts again.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        while !self.session.should_exit {
            match rl.readline(&self.session.prompt) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    self.process_line(&line, &mut stdout);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("procsh: read error: {err}");
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use tempfile::tempdir;

    fn make_interpreter(dir: &tempfile::TempDir) -> Interpreter {
        let session = Session::new("$ ", HistoryStore::new(dir.path().join("history")));
        session.history.clear().unwrap();
        Interpreter::with_defaults(session)
    }

    #[test]
    fn exit_sets_the_flag_even_with_surrounding_whitespace() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        assert_eq!(sh.process_line("   exit  ", &mut out), 0);
        assert!(sh.session().should_exit);

        let mut sh = make_interpreter(&dir);
        assert_eq!(sh.process_line("exit", &mut out), 0);
        assert!(sh.session().should_exit);
    }

    #[test]
    fn exit_with_arguments_is_not_the_builtin() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        sh.process_line("exit now please_do_not_exist", &mut out);
        assert!(!sh.session().should_exit);
    }

    #[test]
    fn empty_line_is_a_successful_no_op() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        assert_eq!(sh.process_line("", &mut out), 0);
        assert_eq!(sh.process_line("   \t ", &mut out), 0);
        assert!(!sh.session().should_exit);
        assert!(out.is_empty());
    }

    #[test]
    fn leading_quote_is_rejected() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        let err = sh.dispatch("\"ls\" -la", &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::InvalidCommandSyntax)
        ));
    }

    #[test]
    fn unknown_program_fails_and_loop_continues() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        let err = sh
            .dispatch("definitely_not_a_real_program_12345", &mut out)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::CommandNotFound(_))
        ));
        assert!(!sh.session().should_exit);

        // The same line through the public entry point degrades to code 1.
        assert_eq!(
            sh.process_line("definitely_not_a_real_program_12345", &mut out),
            1
        );
    }

    #[test]
    fn decode_failure_aborts_only_that_line() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        assert_eq!(sh.process_line("'unterminated", &mut out), 1);
        assert!(!sh.session().should_exit);
        assert_eq!(sh.process_line("exit", &mut out), 0);
        assert!(sh.session().should_exit);
    }

    #[test]
    fn history_builtin_lists_prior_lines_but_not_itself() {
        let dir = tempdir().unwrap();
        let mut sh = make_interpreter(&dir);
        let mut out = Vec::new();

        // Unknown programs still get logged before dispatch fails.
        sh.process_line("alpha_not_a_real_program", &mut out);
        sh.process_line("beta_not_a_real_program", &mut out);

        let mut out = Vec::new();
        let code = sh.process_line("history", &mut out);

        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "alpha_not_a_real_program\nbeta_not_a_real_program\n"
        );
    }
}
