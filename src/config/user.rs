use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// How a user authenticates against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Static password. `None` creates the user without a password clause.
    Password { password: Option<String> },
    /// RDS IAM token authentication. The role ARN is informational only.
    Iam { role: Option<String> },
}

impl Default for AuthMethod {
    fn default() -> Self {
        AuthMethod::Password { password: None }
    }
}

impl AuthMethod {
    pub fn kind(&self) -> AuthMethodKind {
        match self {
            AuthMethod::Password { .. } => AuthMethodKind::Password,
            AuthMethod::Iam { .. } => AuthMethodKind::Iam,
        }
    }
}

/// The `auth_method` field as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethodKind {
    #[default]
    Password,
    Iam,
}

impl fmt::Display for AuthMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthMethodKind::Password => write!(f, "password"),
            AuthMethodKind::Iam => write!(f, "iam"),
        }
    }
}

impl FromStr for AuthMethodKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "password" => Ok(AuthMethodKind::Password),
            "iam" => Ok(AuthMethodKind::Iam),
            other => Err(anyhow!(
                "invalid auth method `{}`, expected `password` or `iam`",
                other
            )),
        }
    }
}

/// Per-user connection cap. Stored in files as `0`, `-1` or a positive number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionLimit {
    /// Leave the server default in place.
    #[default]
    Default,
    Unlimited,
    Limited(u32),
}

impl TryFrom<i32> for ConnectionLimit {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(ConnectionLimit::Default),
            -1 => Ok(ConnectionLimit::Unlimited),
            n if n > 0 => Ok(ConnectionLimit::Limited(n as u32)),
            n => Err(anyhow!(
                "invalid connection_limit {}, expected -1, 0 or a positive number",
                n
            )),
        }
    }
}

impl From<ConnectionLimit> for i32 {
    fn from(limit: ConnectionLimit) -> Self {
        match limit {
            ConnectionLimit::Default => 0,
            ConnectionLimit::Unlimited => -1,
            ConnectionLimit::Limited(n) => n as i32,
        }
    }
}

/// A desired database user.
///
/// For example:
///
/// ```json
/// {
///   "username": "alice",
///   "auth_method": "password",
///   "password": "p@ss",
///   "groups": ["app_group"],
///   "privileges": ["CONNECT"],
///   "databases": ["app"],
///   "connection_limit": 10,
///   "enabled": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserFile", into = "UserFile")]
pub struct User {
    pub username: String,
    pub auth: AuthMethod,
    pub can_login: bool,
    pub connection_limit: ConnectionLimit,
    pub groups: Vec<String>,
    pub privileges: Vec<String>,
    pub databases: Vec<String>,
    pub enabled: bool,
    pub description: Option<String>,
}

impl User {
    /// A login-enabled password user with no memberships or privileges.
    pub fn new(username: &str, password: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            auth: AuthMethod::Password {
                password: password.map(str::to_string),
            },
            can_login: true,
            connection_limit: ConnectionLimit::Default,
            groups: vec![],
            privileges: vec![],
            databases: vec![],
            enabled: true,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(anyhow!("user name is empty"));
        }

        if self.enabled {
            if let AuthMethod::Password { password: None } = self.auth {
                return Err(anyhow!(
                    "user {} uses password authentication but has no password",
                    self.username
                ));
            }
        }

        Ok(())
    }

    pub fn password(&self) -> Option<&str> {
        match &self.auth {
            AuthMethod::Password { password } => password.as_deref(),
            AuthMethod::Iam { .. } => None,
        }
    }

    pub fn is_iam(&self) -> bool {
        matches!(self.auth, AuthMethod::Iam { .. })
    }
}

fn default_true() -> bool {
    true
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

// On-disk shape of a user, flat like the JSON documents it is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserFile {
    username: String,
    #[serde(default)]
    auth_method: AuthMethodKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iam_role: Option<String>,
    #[serde(default = "default_true")]
    can_login: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    connection_limit: i32,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    privileges: Vec<String>,
    #[serde(default)]
    databases: Vec<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TryFrom<UserFile> for User {
    type Error = anyhow::Error;

    fn try_from(file: UserFile) -> Result<Self> {
        let password = file.password.filter(|p| !p.is_empty());
        let iam_role = file.iam_role.filter(|r| !r.is_empty());

        let auth = match file.auth_method {
            AuthMethodKind::Password => {
                if iam_role.is_some() {
                    warn!(
                        "user {}: iam_role is ignored for password authentication",
                        file.username
                    );
                }
                AuthMethod::Password { password }
            }
            AuthMethodKind::Iam => {
                if password.is_some() {
                    warn!(
                        "user {}: password is ignored for IAM authentication",
                        file.username
                    );
                }
                AuthMethod::Iam { role: iam_role }
            }
        };

        Ok(User {
            connection_limit: ConnectionLimit::try_from(file.connection_limit)
                .map_err(|e| anyhow!("user {}: {}", file.username, e))?,
            username: file.username,
            auth,
            can_login: file.can_login,
            groups: file.groups,
            privileges: file.privileges,
            databases: file.databases,
            enabled: file.enabled,
            description: file.description,
        })
    }
}

impl From<User> for UserFile {
    fn from(user: User) -> Self {
        let auth_method = user.auth.kind();
        let (password, iam_role) = match user.auth {
            AuthMethod::Password { password } => (password, None),
            AuthMethod::Iam { role } => (None, role),
        };

        UserFile {
            username: user.username,
            auth_method,
            password,
            iam_role,
            can_login: user.can_login,
            connection_limit: user.connection_limit.into(),
            groups: user.groups,
            privileges: user.privileges,
            databases: user.databases,
            enabled: user.enabled,
            description: user.description,
        }
    }
}
