//! Structured logging setup.
//!
//! Every event emitted while a request is in flight is nested in that
//! request's span, so both output formats carry `request_id`, `client_ip`
//! and `user_id` without any per-call-site plumbing.

use std::io::IsTerminal;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output, span fields listed under each event.
    #[default]
    Pretty,
    /// One JSON object per line, including the current span's fields.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Installs the global `tracing` subscriber writing to stdout.
///
/// `RUST_LOG` takes precedence over `config.filter` when set.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber has already been installed.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;
    let ansi = std::io::stdout().is_terminal();

    build_subscriber(config.format, filter, std::io::stdout, ansi)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

fn build_subscriber<W>(
    format: LogFormat,
    filter: EnvFilter,
    writer: W,
    ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer)
                .finish(),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer)
                .finish(),
        ),
    }
}

/// In-memory log sink for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuf {
    pub(crate) fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use suivi_core::RequestCorrelationContext;

    use super::*;
    use crate::correlation::request_span;

    /// Logs one event inside a request span and returns the captured output.
    fn capture(format: LogFormat) -> (RequestCorrelationContext, String) {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = build_subscriber(
            format,
            EnvFilter::new("info"),
            move || writer.clone(),
            false,
        );
        let ctx = RequestCorrelationContext::new("203.0.113.9", Some("P-42"));
        tracing::subscriber::with_default(subscriber, || {
            request_span(&ctx).in_scope(|| tracing::info!("handling"));
        });
        (ctx, buf.text())
    }

    #[test]
    fn default_config() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn pretty_lists_span_fields_below_event() {
        let (ctx, out) = capture(LogFormat::Pretty);
        let lines: Vec<&str> = out.lines().collect();

        let event = lines.iter().position(|l| l.contains("handling")).unwrap();
        // The event line itself carries no span context.
        assert!(!lines[event].contains(&ctx.request_id));

        let span_line = lines[event..]
            .iter()
            .find(|l| l.contains("in request"))
            .unwrap();
        assert!(span_line.contains(&ctx.request_id));
        assert!(span_line.contains("P-42"));
    }

    #[test]
    fn json_carries_current_span() {
        let (ctx, out) = capture(LogFormat::Json);
        let line = out.lines().find(|l| l.contains("handling")).unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["fields"]["message"], "handling");
        assert_eq!(value["span"]["request_id"], ctx.request_id.as_str());
        assert_eq!(value["span"]["client_ip"], "203.0.113.9");
        assert_eq!(value["span"]["user_id"], "P-42");
    }

    #[test]
    fn second_install_fails() {
        let config = LogConfig {
            filter: "warn".to_string(),
            format: LogFormat::Json,
        };
        // Another test may have installed one already; either way the
        // second call must be refused.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
