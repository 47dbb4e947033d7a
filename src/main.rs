use argh::FromArgs;
use procsh::{DEFAULT_HISTORY_FILE, HistoryStore, Interpreter, Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// An interactive shell with a persistent command history and a /proc reader.
struct Options {
    /// history file path (default: .procsh_history in the working directory)
    #[argh(option)]
    history_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let history = HistoryStore::new(
        options
            .history_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE)),
    );
    // Each session starts with a fresh log; a failure here only degrades
    // the history features.
    if let Err(err) = history.clear() {
        tracing::warn!("could not reset history: {err}");
    }

    let session = Session::new(assemble_prompt(), history);
    Interpreter::with_defaults(session).repl()
}

/// Build the `user@host $ ` prompt from the process environment.
fn assemble_prompt() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "user".to_string());
    let host = std::env::var("HOSTNAME")
        .ok()
        .or_else(read_kernel_hostname)
        .unwrap_or_else(|| "localhost".to_string());
    format!("{user}@{host} $ ")
}

fn read_kernel_hostname() -> Option<String> {
    let raw = std::fs::read_to_string("/proc/sys/kernel/hostname").ok()?;
    let host = raw.trim();
    (!host.is_empty()).then(|| host.to_string())
}
