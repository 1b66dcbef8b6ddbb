//! Configuration manager for Wanderlog.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8888;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    /// Listening port.
    pub port: Option<u16>,
    /// Allowed CORS origin. Any origin when missing.
    pub cors_origin: Option<String>,
    #[serde(default)]
    pub(crate) version: String,
    #[serde(skip)]
    pub(crate) path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Related to transactional mail sending.
    #[serde(skip_serializing)]
    pub mail: Option<Mail>,
    /// Related to one-time password configuration.
    #[serde(skip_serializing)]
    pub otp: Option<Otp>,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024, // 19 MiB.
            iterations: 2,
            parallelism: 1,
            hash_length: 32,
        }
    }
}

/// Brevo transactional mail configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    /// Transactional email endpoint.
    pub endpoint: Option<String>,
    /// API key. `BREVO_API_KEY` takes precedence.
    pub api_key: Option<String>,
    /// Address used as sender.
    pub sender: String,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

/// One-time password configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Otp {
    /// Seconds a code remains valid after issuance.
    pub validity: u64,
}

impl Default for Otp {
    fn default() -> Self {
        Self { validity: 10 * 60 }
    }
}

/// Json Web Token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HMAC secret. `JWT_SECRET` takes precedence.
    pub secret: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Port to listen on.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Self, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(self.error(err));
                        },
                    };

                config.version = VERSION.to_owned();
                if !config.url.is_empty() {
                    config.url = self.normalize_url(&config.url)?;
                }

                Ok(config)
            },
            Err(err) => Ok(self.error(err)),
        }
    }

    /// Apply secrets supplied through the process environment.
    ///
    /// Only called once at startup; components receive the resulting values.
    pub fn with_env_secrets(
        mut self,
        jwt_secret: Option<String>,
        mail_api_key: Option<String>,
    ) -> Self {
        if let Some(secret) = jwt_secret.filter(|s| !s.is_empty()) {
            self.token.get_or_insert_with(Token::default).secret = Some(secret);
        }

        if let Some(key) = mail_api_key.filter(|k| !k.is_empty()) {
            if let Some(mail) = self.mail.as_mut() {
                mail.api_key = Some(key);
            }
        }

        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        let config = Configuration::default();
        assert_eq!(
            config.normalize_url("wanderlog.app").unwrap(),
            "https://wanderlog.app/"
        );
        assert_eq!(
            config.normalize_url("http://localhost:8888").unwrap(),
            "http://localhost:8888/"
        );
    }

    #[test]
    fn test_env_secrets_override_file() {
        let config = Configuration {
            token: Some(Token {
                secret: Some("from-file".into()),
            }),
            mail: Some(Mail {
                sender: "noreply@wanderlog.app".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
        .with_env_secrets(Some("from-env".into()), Some("key".into()));

        assert_eq!(
            config.token.and_then(|t| t.secret).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            config.mail.and_then(|m| m.api_key).as_deref(),
            Some("key")
        );
    }

    #[test]
    fn test_empty_env_keeps_file_values() {
        let config = Configuration {
            token: Some(Token {
                secret: Some("from-file".into()),
            }),
            ..Default::default()
        }
        .with_env_secrets(Some(String::new()), None);

        assert_eq!(
            config.token.and_then(|t| t.secret).as_deref(),
            Some("from-file")
        );
        assert_eq!(Configuration::default().port(), DEFAULT_PORT);
    }
}
