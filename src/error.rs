use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an invocation before or while connecting.
///
/// Failures on individual users or groups never surface here, they are
/// collected into a [`SyncResult`](crate::sync::SyncResult) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not read config file `{}`", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write config file `{}`", path.display())]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: postgres::Error,
    },

    #[error("connection error: {0}")]
    Tls(#[from] native_tls::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Terminal errors caused by the configuration rather than the server.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::ReadConfig { .. }
                | Error::ParseJson(_)
                | Error::ParseYaml(_)
        )
    }
}
