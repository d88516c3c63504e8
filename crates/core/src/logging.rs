//! Logging setup.
//!
//! Everything goes to stderr; stdout carries answers and JSON only.

use crate::error::{AppError, AppResult};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `log_level` is an `EnvFilter` directive string such as `debug` or
/// `assistant_agent=trace,info`; without one, `RUST_LOG` is used, and
/// without that, `info`.
///
/// # Example
/// ```no_run
/// use assistant_core::logging::init_logging;
///
/// init_logging(Some("debug"), true).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());

    match log_level {
        Some(directives) => builder
            .parse(directives)
            .map_err(|e| AppError::Config(format!("Invalid log filter {:?}: {}", directives, e))),
        None => Ok(builder.from_env_lossy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_config_error() {
        let result = build_filter(Some("assistant=notalevel"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_module_directives_parse() {
        let filter = build_filter(Some("assistant_agent=trace,warn")).unwrap();
        assert!(filter.to_string().contains("assistant_agent=trace"));
    }
}
