pub mod configuration;
pub mod email_client;
pub mod errors;
pub mod handlers;
pub mod jobs;
pub mod notifier;
mod telemetry;
pub mod templates;

use crate::configuration::{SettingsEmailConfiguration, get_configuration};
use crate::email_client::SmtpMailTransport;
use crate::errors::AppError;
use crate::notifier::{PasswordResetNotifier, SentryReporter};
use crate::templates::EmailTemplates;
use axum::Router;
use axum::extract::{ConnectInfo, MatchedPath};
use axum::http::Request;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span};

pub async fn run() -> Result<(), AppError> {
    let conf = get_configuration()?;
    init_tracing();
    let _sentry = telemetry::init_sentry(conf.sentry.as_ref())?;

    let templates = EmailTemplates::new(conf.templates.dir.as_deref())?;
    let notifier = PasswordResetNotifier::new(
        Arc::new(SettingsEmailConfiguration),
        Arc::new(templates),
        Arc::new(SmtpMailTransport),
        Arc::new(SentryReporter),
        conf.application.debug,
    );

    let addr = format!("{}:{}", conf.application.host, conf.application.port);
    tracing::info!(%addr, "starting forgot password mailer");

    let app_state = AppState {
        notifier: Arc::new(notifier),
    };
    let app = app_internal(app_state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::EstablishServer(e.to_string()))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::EstablishServer(e.to_string()))
}

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let subscriber = telemetry::get_subscriber("info".into());
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("tracing subscriber already installed: {e}");
        }
    });
}

#[derive(Clone)]
pub struct AppState {
    pub notifier: Arc<PasswordResetNotifier>,
}

pub fn app_internal(app_state: AppState) -> Router {
    init_tracing();
    Router::new()
        .route("/health/{name}", get(handlers::health_check::health))
        .route(
            "/jobs/forgot_password",
            post(handlers::forgot_password::schedule),
        )
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    // matched route, placeholders not filled in
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str);
                    let client_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    info_span!(
                        "request_to_forgot_password_mailer",
                        method = ?request.method(),
                        matched_path,
                        client_ip = %client_ip,
                        error_type = tracing::field::Empty,
                    )
                })
                .on_failure(
                    |error: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                        span.record("error_type", tracing::field::display(&error));
                        tracing::error!(?latency, "error: {:?}", error);
                    },
                ),
        )
}
