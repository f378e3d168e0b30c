use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Builds the JSON subscriber used by the service.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn get_subscriber<W>(default_filter: &str, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .json()
        .with_current_span(true);

    Registry::default().with(env_filter).with(formatting_layer)
}

/// Installs structured JSON logging on stdout.
pub fn init_telemetry() {
    get_subscriber("info", std::io::stdout).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_can_be_scoped() {
        let subscriber = get_subscriber("debug", std::io::sink);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user_id = "user-1", "scoped event");
        });
    }
}
