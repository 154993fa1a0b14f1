use crate::configuration::SentrySettings;
use crate::errors::AppError;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

pub fn get_subscriber(env_filter: String) -> impl Subscriber + Send + Sync {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let fmt_layer = fmt::layer().with_target(false).json();

    Registry::default().with(filter_layer).with(fmt_layer)
}

/// Starts the Sentry client when a DSN is configured. Keep the guard alive
/// for as long as errors should be delivered.
pub fn init_sentry(
    settings: Option<&SentrySettings>,
) -> Result<Option<sentry::ClientInitGuard>, AppError> {
    let Some(settings) = settings else {
        return Ok(None);
    };
    let dsn: sentry::types::Dsn = settings
        .dsn
        .parse()
        .map_err(|e| AppError::ConfigError(format!("invalid sentry dsn: {e}")))?;
    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    });
    tracing::info!(enabled = guard.is_enabled(), "sentry initialized");
    Ok(Some(guard))
}
