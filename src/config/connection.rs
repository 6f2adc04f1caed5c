use crate::error::Error;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Password sent when IAM auth is on and no token was supplied.
pub const PLACEHOLDER_IAM_TOKEN: &str = "PLACEHOLDER_IAM_TOKEN";

pub const DEFAULT_PORT: u16 = 5432;

/// Transport security mode, named as libpq names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    #[default]
    Require,
    VerifyCa,
    VerifyFull,
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mode = match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        };
        write!(f, "{}", mode)
    }
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(Error::config(format!("invalid ssl mode `{}`", other))),
        }
    }
}

/// Where and how to connect.
/// The connecting user needs CREATEROLE and the right to grant on the target databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    pub ssl_mode: SslMode,
    pub iam_auth: bool,
    pub region: Option<String>,
    pub token: Option<String>,
}

/// Password and transport mode actually used to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub password: String,
    pub ssl_mode: SslMode,
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: None,
            ssl_mode: SslMode::default(),
            iam_auth: false,
            region: None,
            token: None,
        }
    }
}

impl ConnectionParameters {
    /// Read the parameters from `POSTGRES_*` and `AWS_REGION` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| {
            if envmnt::exists(key) {
                Some(envmnt::get_or(key, ""))
            } else {
                None
            }
        })
    }

    /// Build the parameters from an arbitrary variable lookup and validate them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match var("POSTGRES_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| Error::config(format!("invalid POSTGRES_PORT: {}", port)))?,
            None => defaults.port,
        };
        let ssl_mode = match var("POSTGRES_SSLMODE") {
            Some(mode) => mode.parse()?,
            None => defaults.ssl_mode,
        };

        let params = Self {
            host: var("POSTGRES_HOST").unwrap_or(defaults.host),
            port,
            database: var("POSTGRES_DB").unwrap_or(defaults.database),
            username: var("POSTGRES_USER").unwrap_or(defaults.username),
            password: var("POSTGRES_PASSWORD"),
            ssl_mode,
            iam_auth: var("POSTGRES_IAM_AUTH").as_deref() == Some("true"),
            region: var("AWS_REGION"),
            token: var("POSTGRES_IAM_TOKEN"),
        };
        params.validate()?;

        debug!(
            "Connection: host={} port={} database={} user={} sslmode={} iam_auth={}",
            params.host,
            params.port,
            params.database,
            params.username,
            params.ssl_mode,
            params.iam_auth
        );

        Ok(params)
    }

    /// Check the fields required by the selected authentication mode.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.is_empty() {
            return Err(Error::config("database host is empty"));
        }

        if self.iam_auth {
            if self.region.as_deref().map_or(true, str::is_empty) {
                return Err(Error::config(
                    "AWS_REGION is required for IAM authentication",
                ));
            }
        } else if self.password.as_deref().map_or(true, str::is_empty) {
            return Err(Error::config(
                "POSTGRES_PASSWORD is required for password authentication",
            ));
        }

        Ok(())
    }

    /// Resolve the password and transport mode to connect with.
    ///
    /// IAM connections use the supplied token, or a placeholder when none was
    /// given, and never run without TLS.
    pub fn credentials(&self) -> Result<Credentials, Error> {
        self.validate()?;

        if !self.iam_auth {
            return Ok(Credentials {
                password: self.password.clone().unwrap_or_default(),
                ssl_mode: self.ssl_mode,
            });
        }

        let password = match self.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                warn!("IAM token not provided, connecting with a placeholder token");
                PLACEHOLDER_IAM_TOKEN.to_string()
            }
        };

        let ssl_mode = if self.ssl_mode == SslMode::Disable {
            warn!("Forcing ssl mode to 'require' for IAM authentication");
            SslMode::Require
        } else {
            self.ssl_mode
        };

        Ok(Credentials { password, ssl_mode })
    }
}
