//! Runtime settings.
//!
//! Defaults are compiled in; environment variables (loaded from `.env` by the
//! binary) override them, and CLI flags override both.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;

/// Upload cap for `POST /api/upload`.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const DEFAULT_OUTBOX_DIR: &str = "outbox";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    /// Where notifications are dropped for the mail relay.
    pub outbox_dir: PathBuf,
    /// Where canonical rows are written; persistence is off when unset.
    pub snapshot_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            outbox_dir: PathBuf::from(DEFAULT_OUTBOX_DIR),
            snapshot_dir: None,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Read `TAGSHEET_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to the default.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            port: non_empty("TAGSHEET_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            outbox_dir: non_empty("TAGSHEET_OUTBOX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.outbox_dir),
            snapshot_dir: non_empty("TAGSHEET_SNAPSHOT_DIR").map(PathBuf::from),
            max_upload_bytes: non_empty("TAGSHEET_MAX_UPLOAD_MB")
                .and_then(|v| v.parse::<usize>().ok())
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}
