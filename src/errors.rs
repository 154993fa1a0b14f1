use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("error establishing server: {0}")]
    EstablishServer(String),

    #[error("error initializing Config: {0}")]
    ConfigError(String),

    #[error("error parsing env value: {0}")]
    EnvError(String),

    #[error("error loading email templates: {0}")]
    TemplateError(String),
}

/// Why a forgot-password email did not go out.
///
/// Every stage of a send maps onto one variant, so logs and error reports can
/// tell a bad SMTP password from a broken template without parsing messages.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email configuration unavailable: {0}")]
    Configuration(String),

    #[error("error rendering email template: {0}")]
    Template(#[from] tera::Error),

    #[error("invalid email address: {0}")]
    Address(String),

    #[error("error building email message: {0}")]
    Message(String),

    #[error("error opening mail connection: {0}")]
    Connection(String),

    #[error("error sending email: {0}")]
    Transport(String),
}

impl DeliveryError {
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::Configuration(_) => "configuration",
            DeliveryError::Template(_) => "template",
            DeliveryError::Address(_) => "address",
            DeliveryError::Message(_) => "message",
            DeliveryError::Connection(_) => "connection",
            DeliveryError::Transport(_) => "transport",
        }
    }
}
