//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error, From};
use secrecy::SecretString;
use serde::Deserialize;
use service::domain::user::activation;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Account activation configuration.
    pub activation: Activation,

    /// Mail configuration.
    pub mail: Mail,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Loads the [`Config`] from the file at the provided `path`, overridden
    /// by `CONF`-prefixed environment variables, `.`-separated by sections.
    ///
    /// The file is optional, and missing values fall back to defaults.
    ///
    /// # Errors
    ///
    /// If the file or the environment contains malformed values.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Account activation configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Activation {
    /// Lifetime of issued activation tokens.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,

    /// Version of the key new activation tokens are signed with.
    #[default(1)]
    pub current_key: u32,

    /// Trusted signing keys.
    ///
    /// Keep a retired key here until the tokens signed with it expire.
    pub keys: Vec<ActivationKey>,
}

/// Versioned signing key of activation tokens.
#[derive(Clone, Debug, Deserialize)]
pub struct ActivationKey {
    /// Version of this key.
    pub version: u32,

    /// Secret of this key.
    pub secret: SecretString,
}

impl TryFrom<Activation> for service::Config {
    type Error = InvalidActivation;

    fn try_from(value: Activation) -> Result<Self, Self::Error> {
        let Activation {
            ttl,
            current_key,
            keys,
        } = value;

        let activation_codec = activation::Codec::new(
            current_key.into(),
            keys.into_iter().map(|k| activation::codec::Key {
                version: k.version.into(),
                secret: k.secret,
            }),
        )?;
        let activation_ttl =
            activation::Ttl::new(ttl).ok_or(InvalidActivation::Ttl)?;

        Ok(Self {
            activation_codec,
            activation_ttl,
        })
    }
}

/// Error of an invalid [`Activation`] configuration.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum InvalidActivation {
    /// Keys don't form a usable keyring.
    #[display("Invalid activation keys: {_0}")]
    Keyring(activation::codec::KeyringError),

    /// Tokens lifetime is shorter than a second or longer than
    /// [`activation::Ttl::MAX`].
    #[display(
        "Activation token TTL must be between 1 second and {} seconds",
        std::time::Duration::from(activation::Ttl::MAX).as_secs(),
    )]
    Ttl,
}

/// Mail configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Mail {
    /// Prefix of the activation link, the token is appended to it.
    #[default("http://localhost:8080/activate?token=".to_owned())]
    pub link_prefix: String,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Maximum level of logged events.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Everything, including per-step tracing.
    Trace,

    /// Diagnostics, like the causes of rejected activation tokens.
    Debug,

    /// Notable events, like activated accounts.
    #[default]
    Info,

    /// Recoverable failures only.
    Warn,

    /// Unrecoverable failures only.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::{Activation, ActivationKey, InvalidActivation};

    fn key(version: u32) -> ActivationKey {
        ActivationKey {
            version,
            secret: SecretString::from("k".repeat(32)),
        }
    }

    #[test]
    fn builds_service_config() {
        let config = service::Config::try_from(Activation {
            current_key: 2,
            keys: vec![key(1), key(2)],
            ..Activation::default()
        })
        .unwrap();

        assert_eq!(config.activation_codec.current_version(), 2_u32.into());
        assert_eq!(
            Duration::from(config.activation_ttl),
            Duration::from_secs(24 * 60 * 60),
        );
    }

    #[test]
    fn rejects_invalid_activation() {
        assert!(matches!(
            service::Config::try_from(Activation::default()),
            Err(InvalidActivation::Keyring(_)),
        ));
        assert!(matches!(
            service::Config::try_from(Activation {
                ttl: Duration::from_millis(500),
                keys: vec![key(1)],
                ..Activation::default()
            }),
            Err(InvalidActivation::Ttl),
        ));
        assert!(matches!(
            service::Config::try_from(Activation {
                ttl: Duration::from_secs(400_000 * 365 * 24 * 60 * 60),
                keys: vec![key(1)],
                ..Activation::default()
            }),
            Err(InvalidActivation::Ttl),
        ));
    }
}
