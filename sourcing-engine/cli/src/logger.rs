use std::str::FromStr;
use tracing::{dispatcher::SetGlobalDefaultError, subscriber};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format `{other}`, expected `text` or `json`")),
        }
    }
}

/// Installs the global subscriber. Events go to stderr so that printed documents and types
/// stay clean on stdout.
pub(crate) fn init_logger(log_format: LogFormat) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber::set_global_default(builder.finish()),
        LogFormat::Json => subscriber::set_global_default(builder.json().finish()),
    }
}

/// In JSON mode, panics are logged as error events before exiting.
pub(crate) fn set_panic_hook(log_format: LogFormat) {
    if log_format != LogFormat::Json {
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| info.payload().downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_default();

        match info.location() {
            Some(location) => tracing::error!(
                reason = payload.as_str(),
                file = location.file(),
                line = location.line(),
                column = location.column(),
                "PANIC"
            ),
            None => tracing::error!(reason = payload.as_str(), "PANIC"),
        }

        std::process::exit(255);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_formats_parse() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
