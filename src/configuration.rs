use crate::errors::{AppError, DeliveryError};
use config::{Config, Environment, File, FileFormat};
use garde::Validate;
use secrecy::Secret;
use serde_aux::field_attributes::{deserialize_bool_from_anything, deserialize_number_from_string};
use std::time::Duration;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email: EmailConfiguration,
    #[serde(default)]
    pub templates: TemplateSettings,
    pub sentry: Option<SentrySettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Log full delivery errors, not just their kind.
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub debug: bool,
}

/// SMTP settings for outgoing mail. Read fresh for every send.
#[derive(serde::Deserialize, Validate, Clone, Debug)]
pub struct EmailConfiguration {
    #[garde(length(min = 1))]
    pub host: String,
    #[serde(default)]
    #[garde(skip)]
    pub username: String,
    #[serde(default = "empty_secret")]
    #[garde(skip)]
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    #[garde(range(min = 1))]
    pub port: u16,
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    #[garde(skip)]
    pub use_tls: bool,
    #[garde(length(min = 1))]
    pub from_address: String,
    #[serde(
        default = "default_timeout_secs",
        deserialize_with = "deserialize_number_from_string"
    )]
    #[garde(skip)]
    pub timeout_secs: u64,
}

impl EmailConfiguration {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct TemplateSettings {
    /// Directory of `*.html` templates overriding the built-in ones.
    pub dir: Option<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SentrySettings {
    pub dsn: String,
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir().map_err(|e| AppError::ConfigError(e.to_string()))?;
    let config_dir = base_path.join("config");

    let env: Env = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "local".into())
        .try_into()?;
    let additional_conf = config_dir.join(format!("{}.yaml", env.as_str()));
    let additional_conf = additional_conf
        .to_str()
        .ok_or_else(|| AppError::ConfigError("config path is not valid utf-8".into()))?;

    let settings = Config::builder()
        .add_source(File::from(config_dir.join("base.yaml")))
        .add_source(File::new(additional_conf, FileFormat::Yaml))
        // APP_EMAIL__HOST=smtp.example.com -> email.host
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| AppError::ConfigError(e.to_string()))?;
    settings
        .try_deserialize::<Settings>()
        .map_err(|e| AppError::ConfigError(e.to_string()))
}

pub enum Env {
    Local,
    Production,
}

impl Env {
    pub fn as_str(&self) -> &str {
        match self {
            Env::Local => "local",
            Env::Production => "production",
        }
    }
}

impl TryFrom<String> for Env {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            _ => Err(AppError::EnvError(value)),
        }
    }
}

/// Source of the SMTP settings used by a single send.
#[async_trait::async_trait]
pub trait EmailConfigurationProvider: Send + Sync {
    async fn email_configuration(&self) -> Result<EmailConfiguration, DeliveryError>;
}

/// Reloads the `email` section from the configuration files and environment
/// on every call, so operators can change SMTP settings without a restart.
#[derive(Clone, Debug, Default)]
pub struct SettingsEmailConfiguration;

#[async_trait::async_trait]
impl EmailConfigurationProvider for SettingsEmailConfiguration {
    async fn email_configuration(&self) -> Result<EmailConfiguration, DeliveryError> {
        let settings = tokio::task::spawn_blocking(get_configuration)
            .await
            .map_err(|e| DeliveryError::Configuration(e.to_string()))?
            .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
        settings
            .email
            .validate()
            .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
        Ok(settings.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn email_conf(yaml: &str) -> EmailConfiguration {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn env_accepts_known_names_only() {
        assert!(matches!(Env::try_from("Production".to_string()), Ok(Env::Production)));
        assert!(matches!(Env::try_from("local".to_string()), Ok(Env::Local)));
        assert!(matches!(Env::try_from("staging".to_string()), Err(AppError::EnvError(_))));
    }

    #[test]
    fn email_configuration_defaults_and_string_numbers() {
        let conf = email_conf(
            r#"
host: smtp.example.com
port: "2525"
use_tls: "true"
from_address: "Team Plane <team@mailer.plane.so>"
"#,
        );
        assert_eq!(conf.port, 2525);
        assert!(conf.use_tls);
        assert_eq!(conf.username, "");
        assert_eq!(conf.password.expose_secret(), "");
        assert_eq!(conf.timeout(), Duration::from_secs(10));
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn email_configuration_rejects_empty_host_and_zero_port() {
        let conf = email_conf(
            r#"
host: ""
port: 0
from_address: "noreply@example.com"
"#,
        );
        assert!(conf.validate().is_err());
    }

    #[test]
    fn password_is_not_printed_by_debug() {
        let conf = email_conf(
            r#"
host: smtp.example.com
port: 587
password: hunter2
from_address: "noreply@example.com"
"#,
        );
        assert!(!format!("{conf:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn settings_provider_reads_checked_in_config() {
        let conf = SettingsEmailConfiguration
            .email_configuration()
            .await
            .expect("config/base.yaml should provide an email section");
        assert!(!conf.host.is_empty());
        assert!(!conf.from_address.is_empty());
    }
}
