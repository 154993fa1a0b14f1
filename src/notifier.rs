use crate::configuration::EmailConfigurationProvider;
use crate::email_client::{MailTransport, OutgoingEmail};
use crate::errors::DeliveryError;
use crate::templates::{EmailTemplates, strip_tags};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

pub const FORGOT_PASSWORD_TEMPLATE: &str = "forgot_password";
pub const FORGOT_PASSWORD_SUBJECT: &str = "A new password to your Plane account has been requested";

/// Everything needed to mail one reset link. Values are used verbatim.
#[derive(Deserialize, Clone, Debug)]
pub struct PasswordResetRequest {
    pub first_name: String,
    pub email: String,
    #[serde(alias = "uidb64")]
    pub reset_token_id: String,
    #[serde(alias = "token")]
    pub reset_token_secret: String,
    #[serde(alias = "current_site")]
    pub site_origin: String,
}

impl PasswordResetRequest {
    /// The link the recipient follows to pick a new password.
    ///
    /// Query values are concatenated as-is and not percent-encoded.
    pub fn reset_url(&self) -> String {
        format!(
            "{}/accounts/password/?uidb64={}&token={}&email={}",
            self.site_origin, self.reset_token_id, self.reset_token_secret, self.email
        )
    }
}

/// Receives every delivery failure, once.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &DeliveryError);
}

#[derive(Clone, Debug, Default)]
pub struct SentryReporter;

impl ErrorReporter for SentryReporter {
    fn report(&self, error: &DeliveryError) {
        let event_id = sentry::capture_error(error);
        tracing::debug!(%event_id, "delivery error reported");
    }
}

pub struct PasswordResetNotifier {
    configuration: Arc<dyn EmailConfigurationProvider>,
    templates: Arc<EmailTemplates>,
    transport: Arc<dyn MailTransport>,
    reporter: Arc<dyn ErrorReporter>,
    debug: bool,
}

impl PasswordResetNotifier {
    pub fn new(
        configuration: Arc<dyn EmailConfigurationProvider>,
        templates: Arc<EmailTemplates>,
        transport: Arc<dyn MailTransport>,
        reporter: Arc<dyn ErrorReporter>,
        debug: bool,
    ) -> Self {
        Self {
            configuration,
            templates,
            transport,
            reporter,
            debug,
        }
    }

    /// Sends the reset email for `request`.
    ///
    /// Failures are logged and reported before being returned; nothing is
    /// retried.
    #[instrument(
        name = "sending forgot password email",
        skip(self, request),
        fields(recipient = %request.email)
    )]
    pub async fn send(&self, request: &PasswordResetRequest) -> Result<(), DeliveryError> {
        match self.deliver(request).await {
            Ok(()) => {
                tracing::info!("forgot password email sent");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error.kind = error.kind(), "forgot password email not sent");
                if self.debug {
                    tracing::error!(error = ?error, "{error}");
                }
                self.reporter.report(&error);
                Err(error)
            }
        }
    }

    async fn deliver(&self, request: &PasswordResetRequest) -> Result<(), DeliveryError> {
        let reset_url = request.reset_url();
        let conf = self.configuration.email_configuration().await?;

        let context = json!({
            "first_name": request.first_name,
            "forgot_password_url": reset_url,
            "email": request.email,
        });
        let html_content = self.templates.render(FORGOT_PASSWORD_TEMPLATE, &context)?;
        let text_content = strip_tags(&html_content);

        let email = OutgoingEmail {
            subject: FORGOT_PASSWORD_SUBJECT.to_string(),
            text_body: text_content,
            from: conf.from_address.clone(),
            to: vec![request.email.clone()],
            html_alternative: html_content,
        };

        let mut connection = self.transport.open(&conf).await?;
        let sent = connection.send(&email).await;
        connection.close().await;
        sent
    }
}
