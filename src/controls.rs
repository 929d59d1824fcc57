//! Polling cadence and transport controls shared across binaries.

use clap::Parser;
use std::time::Duration;

/// Tunable knobs applied to every subscription a process starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchControls {
    interval: Duration,
    proxy: Option<String>,
}

impl WatchControls {
    /// Constructs a new set of watch controls.
    pub fn new(interval: Duration, proxy: Option<String>) -> Self {
        Self { interval, proxy }
    }

    /// Time to wait between successive polls of a category page.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forward proxy URL for outbound fetches, if one is configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

impl Default for WatchControls {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            proxy: None,
        }
    }
}

/// Command-line interface shared by binaries that want watch controls.
#[derive(Parser, Debug, Clone)]
#[command(name = "dropwatch", about = "Keyword stock monitor for category pages")]
pub struct Cli {
    /// Category page URL to monitor
    pub target: String,

    /// Keyword matched against item titles, case-insensitive
    pub keyword: String,

    /// Seconds to wait between polls
    #[arg(long, env = "DROPWATCH_INTERVAL", default_value_t = 10)]
    pub interval_secs: u64,

    /// Forward proxy URL for outbound requests
    #[arg(long, env = "DROPWATCH_PROXY")]
    pub proxy: Option<String>,

    /// Requester identifier stamped on notifications
    #[arg(long, env = "DROPWATCH_CHAT_ID", default_value_t = 0)]
    pub chat_id: i64,
}

impl Cli {
    /// Converts the parsed CLI into `WatchControls`.
    pub fn build_controls(&self) -> WatchControls {
        WatchControls::new(Duration::from_secs(self.interval_secs), self.proxy.clone())
    }
}
