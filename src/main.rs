mod absences;
mod backup;
mod bundle;
mod calc;
mod config;
mod db;
mod error;
mod ipc;
mod model;
mod recovery;
mod store;
mod targets;
mod validate;

use clap::Parser;
use std::io::{self, BufRead, Write};

fn main() {
    let args = config::Args::parse();
    config::init_logging(args.log_format);

    let mut state = ipc::AppState::default();

    if let Some(path) = args.workspace.as_deref() {
        match ipc::open_workspace(&mut state, path) {
            Ok(()) => tracing::info!(workspace = %path.display(), "workspace opened"),
            Err(e) => tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace"),
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "crcalcd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request_guarded(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
