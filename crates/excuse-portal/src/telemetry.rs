use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Install the global subscriber. Events go to stderr so command output on
/// stdout stays parseable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for_level(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// A bare level such as `debug` only raises verbosity for the portal crates;
/// anything else is treated as a full filter directive.
fn filter_for_level(level: &str) -> Result<EnvFilter, TelemetryError> {
    let trimmed = level.trim();
    let directive = if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        format!("warn,excuse_portal={trimmed},excuse_portal_cli={trimmed}")
    } else {
        trimmed.to_string()
    };

    EnvFilter::try_new(&directive).map_err(|source| TelemetryError::EnvFilter {
        value: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_is_scoped_to_portal_crates() {
        let filter = filter_for_level("debug").expect("valid level");
        let rendered = filter.to_string();
        assert!(rendered.contains("excuse_portal=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn rejects_garbage_filters() {
        assert!(matches!(
            filter_for_level("excuse_portal=loud"),
            Err(TelemetryError::EnvFilter { .. })
        ));
    }
}
