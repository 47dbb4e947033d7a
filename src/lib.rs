//! A small interactive shell built around a line-to-process pipeline.
//!
//! Each raw input line is appended to an on-disk history log, decoded
//! ([`unescape`]), trimmed, tokenized ([`tokenize`]) and dispatched either
//! to a built-in command (`exit`, `history`, `procread`) or to an external
//! program, which the shell spawns and waits on. Per-command failures are
//! reported and isolated to their iteration; only `exit` or end of input
//! ends the loop.
//!
//! The main entry point is [`Interpreter`], which owns the [`Session`]
//! (prompt, history store, environment view) and executes commands through
//! a set of pluggable factories. The public module [`command`] exposes the
//! traits for implementing your own commands.

mod builtin;
pub mod command;
mod external;
mod history;
mod interpreter;
mod lexer;
mod parser;
mod session;

pub use external::ExecError;
pub use history::{DEFAULT_HISTORY_FILE, HistoryError, HistoryStore};
pub use interpreter::{DispatchError, Interpreter};
pub use lexer::{DecodeError, unescape};
pub use parser::{TOKEN_LIMIT, tokenize};
pub use session::Session;
