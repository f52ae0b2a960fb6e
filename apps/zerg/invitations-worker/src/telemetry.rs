//! Error reports and log output for the worker process.

use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use crate::config::LogFormat;

/// Install color-eyre with error locations and no environment dump.
/// Later calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// `RUST_LOG` when set and valid, otherwise the format's default directives.
pub fn log_filter(format: LogFormat) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format.default_filter()))
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .pretty()
            .boxed(),
    }
}

/// Install the global subscriber with span traces for eyre reports.
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let installed = tracing_subscriber::registry()
        .with(fmt_layer(format))
        .with(tracing_error::ErrorLayer::default())
        .with(log_filter(format))
        .try_init()
        .is_ok();

    if installed {
        info!(log_format = %format, "Tracing initialized");
    } else {
        debug!("Tracing already initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_format() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(
                log_filter(LogFormat::Json).to_string(),
                EnvFilter::new("info,sea_orm=warn,sqlx=warn").to_string()
            );
            assert!(log_filter(LogFormat::Pretty).to_string().contains("debug"));
        });
    }

    #[test]
    fn test_rust_log_overrides_default_filter() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            assert_eq!(
                log_filter(LogFormat::Pretty).to_string(),
                EnvFilter::new("warn").to_string()
            );
        });
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        init_tracing(LogFormat::Pretty);
        assert!(!init_tracing(LogFormat::Json));
    }

    #[test]
    fn test_install_color_eyre_twice() {
        install_color_eyre();
        install_color_eyre();
    }
}
