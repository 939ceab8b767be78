use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_JSON_VAR: &str = "LEADERBOARD_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    /// Case-insensitive on/off switch. Anything unrecognized keeps plain text.
    fn from_switch(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return LogFormat::default();
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_switch(env::var(LOG_JSON_VAR).ok().as_deref());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_switch_accepts_common_spellings() {
        for raw in ["1", "true", "TRUE", " Yes ", "on"] {
            assert_eq!(LogFormat::from_switch(Some(raw)), LogFormat::Json, "{raw}");
        }
    }

    #[test]
    fn unset_or_unknown_switch_keeps_plain_text() {
        assert_eq!(LogFormat::from_switch(None), LogFormat::Plain);
        for raw in ["", "0", "false", "no", "json please"] {
            assert_eq!(LogFormat::from_switch(Some(raw)), LogFormat::Plain, "{raw}");
        }
    }
}
