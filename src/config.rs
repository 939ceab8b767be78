use std::time::Duration;

use clap::Args;

use crate::store::TimeRange;

pub const DEFAULT_TOP_N: usize = 50;
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub top_n: usize,
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
    pub range: TimeRange,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            refresh_timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
            range: TimeRange::All,
        }
    }
}

/// Engine settings shared by every leaderboard command.
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Size of the published top list
    #[arg(long, env = "LEADERBOARD_TOP_N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,
    /// Seconds between periodic refreshes
    #[arg(long, env = "LEADERBOARD_REFRESH_SECS", default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_secs: u64,
    /// Seconds before an in-flight refresh is abandoned
    #[arg(
        long,
        env = "LEADERBOARD_REFRESH_TIMEOUT_SECS",
        default_value_t = DEFAULT_REFRESH_TIMEOUT_SECS
    )]
    pub refresh_timeout_secs: u64,
    /// Time-range hint handed to the issue store
    #[arg(long, env = "LEADERBOARD_RANGE", value_enum, default_value_t = TimeRange::All)]
    pub range: TimeRange,
}

impl From<EngineArgs> for EngineConfig {
    fn from(args: EngineArgs) -> Self {
        Self {
            top_n: args.top_n.max(1),
            refresh_interval: Duration::from_secs(args.refresh_secs.max(1)),
            refresh_timeout: Duration::from_secs(args.refresh_timeout_secs.max(1)),
            range: args.range,
        }
    }
}
