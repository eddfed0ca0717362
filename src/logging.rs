//! Opt-in tracing setup. The library only emits `tracing` events; embedders
//! that want them on disk call [`init_logging`] once, or install their own
//! subscriber instead.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

fn resolve_log_path(override_path: Option<&str>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => env::temp_dir().join("brokerlink_trace.jsonl"),
    }
}

/// Destination for the JSON-lines trace log, overridable via
/// `BROKERLINK_LOG`.
pub fn log_path() -> PathBuf {
    resolve_log_path(env::var("BROKERLINK_LOG").ok().as_deref())
}

/// Install a JSON file subscriber for this process, writing to [`log_path`]
/// and capped at `max_level`. Idempotent; silently a no-op when the log file
/// cannot be opened or another global subscriber is already installed.
pub fn init_logging(max_level: Level) {
    init_logging_to(log_path(), max_level);
}

/// Like [`init_logging`] but with an explicit destination, for embedders
/// that manage their own log layout.
pub fn init_logging_to(path: PathBuf, max_level: Level) {
    let _ = TRACING_INIT.get_or_init(|| {
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(max_level)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_path_wins_when_set() {
        assert_eq!(
            resolve_log_path(Some("/var/log/broker.jsonl")),
            PathBuf::from("/var/log/broker.jsonl")
        );
    }

    #[test]
    fn empty_or_missing_override_falls_back_to_temp_dir() {
        for path in [resolve_log_path(None), resolve_log_path(Some(""))] {
            assert_eq!(path, env::temp_dir().join("brokerlink_trace.jsonl"));
        }
    }
}
