use crate::configuration::EmailConfiguration;
use crate::errors::DeliveryError;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

/// A message ready for a [`MailConnection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub text_body: String,
    pub from: String,
    pub to: Vec<String>,
    pub html_alternative: String,
}

/// Opens mail connections from per-send configuration.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn open(
        &self,
        conf: &EmailConfiguration,
    ) -> Result<Box<dyn MailConnection>, DeliveryError>;
}

/// A connection scoped to one send. Callers must `close` it once they are
/// done, whether or not `send` succeeded.
#[async_trait::async_trait]
pub trait MailConnection: Send {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError>;

    async fn close(self: Box<Self>);
}

#[derive(Clone, Debug, Default)]
pub struct SmtpMailTransport;

#[async_trait::async_trait]
impl MailTransport for SmtpMailTransport {
    async fn open(
        &self,
        conf: &EmailConfiguration,
    ) -> Result<Box<dyn MailConnection>, DeliveryError> {
        let builder = if conf.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&conf.host)
                .map_err(|e| DeliveryError::Connection(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&conf.host)
        };
        let mut builder = builder.port(conf.port).timeout(Some(conf.timeout()));
        if !conf.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                conf.username.clone(),
                conf.password.expose_secret().clone(),
            ));
        }
        let transport: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        tracing::debug!(host = %conf.host, port = conf.port, tls = conf.use_tls, "opened smtp connection");
        Ok(Box::new(SmtpConnection {
            transport,
            host: conf.host.clone(),
        }))
    }
}

struct SmtpConnection {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

#[async_trait::async_trait]
impl MailConnection for SmtpConnection {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn close(self: Box<Self>) {
        // without the pool feature every send ends with QUIT, so dropping the
        // transport is all that is left
        tracing::debug!(host = %self.host, "closed smtp connection");
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|e| DeliveryError::Address(format!("{address}: {e}")))
}

/// Builds a multipart/alternative message with the text part first.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.as_str());
    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    let body = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        )
        .singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_HTML)
                .body(email.html_alternative.clone()),
        );

    builder
        .multipart(body)
        .map_err(|e| DeliveryError::Message(e.to_string()))
}
