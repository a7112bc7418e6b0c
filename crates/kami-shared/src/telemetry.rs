//! Telemetry setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogSettings;

/// Installs the global subscriber: JSON to stdout, plus a daily rolling
/// JSON file when `log.directory` is set. Keep the returned guard alive
/// for the lifetime of the process or buffered file output is lost.
pub fn init_telemetry(settings: &LogSettings) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let (file_layer, guard) = match settings.directory.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .with(file_layer)
        .init();

    guard
}
