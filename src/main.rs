mod backup;
mod calc;
mod db;
mod exchange;
mod ipc;
mod model;
mod reports;
mod stats;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Grade-tracking sidecar: newline-delimited JSON requests on stdin,
/// one JSON response per line on stdout.
#[derive(Parser, Debug)]
#[command(name = "gradebookd", version, long_about = None)]
struct Cli {
    /// Workspace directory to open at startup
    #[arg(long, value_name = "DIR", env = "GRADEBOOK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    // stdout carries responses; logs go to stderr only.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
    };
    if let Some(path) = cli.workspace.as_deref() {
        if let Err(e) = ipc::select_workspace(&mut state, path) {
            warn!(error = %e, workspace = %path.to_string_lossy(), "startup workspace not opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "bad request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
