//!
//! perfschema inspection binary
//! ----------------------------
//! Replays a JSON event log (connects, errors, disconnects, account/host
//! teardown, truncates) into an in-process error store and prints a
//! performance table as a frame.

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use perfschema::config::PfsConfig;
use perfschema::error::AppError;
use perfschema::instrument::{ErrorStore, ThreadId};
use perfschema::system_catalog::registry;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    Connect {
        thread: ThreadId,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        host: Option<String>,
    },
    Error {
        thread: ThreadId,
        number: u32,
        #[serde(default)]
        handled: bool,
    },
    Disconnect { thread: ThreadId },
    DropAccount { user: String, host: String },
    DropHost { host: String },
    DropUser { user: String },
    Truncate { table: String },
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--events <log.json>] [--table <name>]\n  {program} --list\n\nFlags:\n  --events <path>   JSON array of events to replay before reading the table\n  --table <name>    Table to print (default: performance_schema.events_errors_summary_global_by_error)\n  --list            List registered tables and their columns\n  -h, --help        Show this help\n\nEnvironment:\n  PERFSCHEMA_CONFIG, PERFSCHEMA_MAX_SERVER_ERRORS, PERFSCHEMA_ERROR_CLASSES, RUST_LOG"
    );
}

fn replay(store: &ErrorStore, events: Vec<Event>) -> Result<()> {
    for ev in events {
        debug!(target: "perfschema", "replay {:?}", ev);
        match ev {
            Event::Connect { thread, user, host } => store.register_thread(thread, user.as_deref(), host.as_deref()),
            Event::Error { thread, number, handled } => store.record_error_number(thread, number, handled),
            Event::Disconnect { thread } => { store.disconnect_thread(thread); }
            Event::DropAccount { user, host } => { store.drop_account(&user, &host); }
            Event::DropHost { host } => { store.drop_host(&host); }
            Event::DropUser { user } => { store.drop_user(&user); }
            Event::Truncate { table } => {
                let share = registry::lookup_from_str(&table)
                    .ok_or_else(|| AppError::not_found("no_table".to_string(), table.clone()))?;
                if !share.truncatable {
                    return Err(anyhow!("table '{}' cannot be truncated", share.qualified_name()));
                }
                (share.delete_all_rows)(store)?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "perfschema".to_string());
    let mut events_path: Option<String> = None;
    let mut table = "performance_schema.events_errors_summary_global_by_error".to_string();
    let mut list = false;
    let mut it = args.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--events" => events_path = Some(it.next().cloned().ok_or_else(|| anyhow!("--events needs a path"))?),
            "--table" => table = it.next().cloned().ok_or_else(|| anyhow!("--table needs a name"))?,
            "--list" => list = true,
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => { print_usage(&program); return Err(anyhow!("unknown argument '{}'", other)); }
        }
    }

    if list {
        for share in registry::all() {
            println!("{}", share.qualified_name());
            for c in share.columns {
                println!("  {:<20} {}", c.name, c.coltype.sql_type());
            }
        }
        return Ok(());
    }

    let cfg = PfsConfig::from_env()?;
    let store = Arc::new(ErrorStore::from_config(&cfg));
    info!(target: "perfschema", "error store ready: classes={} keys={}", store.classes().len(), store.key_space_len());

    if let Some(p) = events_path {
        let text = fs::read_to_string(&p).with_context(|| format!("reading events '{}'", p))?;
        let events: Vec<Event> = serde_json::from_str(&text).with_context(|| format!("parsing events '{}'", p))?;
        info!(target: "perfschema", "replaying {} events from {}", events.len(), p);
        replay(&store, events)?;
    }

    let share = registry::lookup_from_str(&table)
        .ok_or_else(|| AppError::not_found("no_table".to_string(), table.clone()))?;
    let mut handle = (share.create)(Arc::clone(&store));
    let df = registry::scan_to_frame(handle.as_mut())?;
    println!("{}", df);
    Ok(())
}
