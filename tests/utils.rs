use axum::Router;
use forgot_password_mailer::configuration::{EmailConfiguration, EmailConfigurationProvider};
use forgot_password_mailer::email_client::{MailConnection, MailTransport, OutgoingEmail};
use forgot_password_mailer::errors::{AppError, DeliveryError};
use forgot_password_mailer::notifier::{ErrorReporter, PasswordResetNotifier};
use forgot_password_mailer::templates::EmailTemplates;
use forgot_password_mailer::{AppState, app_internal};
use secrecy::Secret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

pub struct FixedConfiguration;

#[async_trait::async_trait]
impl EmailConfigurationProvider for FixedConfiguration {
    async fn email_configuration(&self) -> Result<EmailConfiguration, DeliveryError> {
        Ok(EmailConfiguration {
            host: "127.0.0.1".into(),
            username: String::new(),
            password: Secret::new(String::new()),
            port: 1025,
            use_tls: false,
            from_address: "Team Plane <team@mailer.plane.so>".into(),
            timeout_secs: 5,
        })
    }
}

/// Hands every sent email to the test through a channel.
pub struct ChannelTransport {
    outbox: mpsc::UnboundedSender<OutgoingEmail>,
    pub closed: Arc<AtomicUsize>,
}

struct ChannelConnection {
    outbox: mpsc::UnboundedSender<OutgoingEmail>,
    closed: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl MailTransport for ChannelTransport {
    async fn open(
        &self,
        _conf: &EmailConfiguration,
    ) -> Result<Box<dyn MailConnection>, DeliveryError> {
        Ok(Box::new(ChannelConnection {
            outbox: self.outbox.clone(),
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait::async_trait]
impl MailConnection for ChannelConnection {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        self.outbox
            .send(email.clone())
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct CountingReporter(pub AtomicUsize);

impl ErrorReporter for CountingReporter {
    fn report(&self, _error: &DeliveryError) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestAppInfo {
    pub socket_addr: SocketAddr,
    pub outbox: mpsc::UnboundedReceiver<OutgoingEmail>,
    pub reports: Arc<CountingReporter>,
}

pub fn test_notifier() -> (
    Arc<PasswordResetNotifier>,
    mpsc::UnboundedReceiver<OutgoingEmail>,
    Arc<AtomicUsize>,
    Arc<CountingReporter>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicUsize::new(0));
    let reports = Arc::new(CountingReporter::default());
    let notifier = PasswordResetNotifier::new(
        Arc::new(FixedConfiguration),
        Arc::new(EmailTemplates::builtin().expect("built-in templates compile")),
        Arc::new(ChannelTransport {
            outbox: tx,
            closed: closed.clone(),
        }),
        reports.clone(),
        false,
    );
    (Arc::new(notifier), rx, closed, reports)
}

pub fn test_router() -> (Router, mpsc::UnboundedReceiver<OutgoingEmail>) {
    let (notifier, outbox, _, _) = test_notifier();
    (app_internal(AppState { notifier }), outbox)
}

/// returns server_addr and the captured outbox
pub async fn spawn_app() -> Result<TestAppInfo, AppError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0)); // port 0: the OS picks a free port
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::EstablishServer(e.to_string()))?;
    let socket_addr = listener
        .local_addr()
        .map_err(|e| AppError::EstablishServer(e.to_string()))?;

    let (notifier, outbox, _, reports) = test_notifier();
    let app = app_internal(AppState { notifier });

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    Ok(TestAppInfo {
        socket_addr,
        outbox,
        reports,
    })
}
