//! Log subscriber setup with configurable formats.

use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingConfig, ObservabilityConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, overrides the configured level and filter.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), TracingError> {
    let logging = &config.logging;

    tracing_subscriber::registry()
        .with(fmt_layer(logging))
        .with(build_env_filter(logging))
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))
}

fn fmt_layer(logging: &LoggingConfig) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(logging.file_line)
        .with_line_number(logging.file_line);

    match (logging.format, logging.timestamps) {
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        (LogFormat::Json, true) => layer.json().with_current_span(true).boxed(),
        (LogFormat::Json, false) => layer.json().with_current_span(true).without_time().boxed(),
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let base_level = config.level.to_tracing_level().to_string().to_lowercase();

    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new(&base_level))
    } else if let Some(filter) = &config.filter {
        let combined = format!("{},{}", base_level, filter);
        EnvFilter::try_new(combined).unwrap_or_else(|_| EnvFilter::new(&base_level))
    } else {
        EnvFilter::new(base_level)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing initialization error: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_filter_from_config() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            filter: Some("sweeper::db=trace".to_string()),
            ..Default::default()
        };
        temp_env::with_var_unset("RUST_LOG", || {
            let filter = build_env_filter(&config).to_string();
            assert!(filter.contains("debug"), "{filter}");
            assert!(filter.contains("sweeper::db=trace"), "{filter}");
        });
    }

    #[test]
    fn test_rust_log_wins() {
        let config = LoggingConfig {
            filter: Some("sweeper::db=trace".to_string()),
            ..Default::default()
        };
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            let filter = build_env_filter(&config).to_string();
            assert_eq!(filter, "warn");
        });
    }

    #[test]
    fn test_bad_filter_falls_back_to_level() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filter: Some("sweeper=notalevel".to_string()),
            ..Default::default()
        };
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(build_env_filter(&config).to_string(), "warn");
        });
    }
}
