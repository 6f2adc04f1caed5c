use crate::error::Error;
use crate::statement::Privilege;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::{fmt, fs};

pub use super::group::Group;
pub use super::user::User;

/// Config file format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yaml`/`.yml` is YAML, `.json` is JSON, anything else is sniffed.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml") | Some("yml") => Some(Format::Yaml),
            _ => None,
        }
    }

    fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            Format::Json
        } else {
            Format::Yaml
        }
    }
}

/// Declared users and groups.
///  - `groups`: role-groups, created before any user so memberships resolve.
///  - `users`: login users with their memberships and database privileges.
///
/// For example:
///
/// ```json
/// {
///   "groups": [
///     { "name": "app_group", "inherit": true, "privileges": ["CONNECT"], "databases": ["app"] }
///   ],
///   "users": [
///     { "username": "alice", "password": "p@ss", "groups": ["app_group"], "enabled": true },
///     { "username": "bob", "enabled": false }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_yaml::to_string(&self.redacted()) {
            Ok(yaml) => write!(f, "{}", yaml),
            Err(_) => write!(f, "{:?}", self.redacted()),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let config = Self::parse(s, Format::sniff(s))?;
        config.validate()?;

        Ok(config)
    }
}

impl Config {
    /// Read and validate a config file.
    pub fn new(config_path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {}", config_path.display());

        let content = fs::read_to_string(config_path).map_err(|source| Error::ReadConfig {
            path: config_path.to_path_buf(),
            source,
        })?;
        let format = Format::from_path(config_path).unwrap_or_else(|| Format::sniff(&content));
        let config = Self::parse(&content, format)?;

        config.validate()?;

        debug!(
            "Loaded {} user(s) and {} group(s)",
            config.users.len(),
            config.groups.len()
        );

        Ok(config)
    }

    /// Write the config, as YAML for `.yaml`/`.yml` paths and pretty JSON otherwise.
    pub fn save(&self, config_path: &Path) -> Result<(), Error> {
        let content = match Format::from_path(config_path).unwrap_or(Format::Json) {
            Format::Json => serde_json::to_string_pretty(self)? + "\n",
            Format::Yaml => serde_yaml::to_string(self)?,
        };

        fs::write(config_path, content).map_err(|source| Error::WriteConfig {
            path: config_path.to_path_buf(),
            source,
        })?;
        debug!("Saved configuration to {}", config_path.display());

        Ok(())
    }

    fn parse(content: &str, format: Format) -> Result<Self, Error> {
        let config = match format {
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        // Validate groups, unique by name
        let mut group_names = HashSet::new();
        for group in &self.groups {
            group.validate().map_err(|e| Error::config(e.to_string()))?;
            if !group_names.insert(group.name.as_str()) {
                return Err(Error::config(format!("duplicated group: {}", group.name)));
            }
            check_privileges(&group.name, &group.privileges, &group.databases);
        }

        // Validate users, unique by name
        let mut user_names = HashSet::new();
        for user in &self.users {
            user.validate().map_err(|e| Error::config(e.to_string()))?;
            if !user_names.insert(user.username.as_str()) {
                return Err(Error::config(format!("duplicated user: {}", user.username)));
            }
            if group_names.contains(user.username.as_str()) {
                return Err(Error::config(format!(
                    "{} is declared as both a user and a group",
                    user.username
                )));
            }
            check_privileges(&user.username, &user.privileges, &user.databases);

            // Memberships are left for the server to resolve, the group may
            // exist there without being declared here.
            for group in &user.groups {
                if !group_names.contains(group.as_str()) {
                    warn!(
                        "user {} references group {} which is not declared in this file",
                        user.username, group
                    );
                }
            }
        }

        Ok(())
    }

    // Copy with passwords masked, for logging
    fn redacted(&self) -> Self {
        let mut config = self.clone();
        for user in &mut config.users {
            if let super::AuthMethod::Password {
                password: Some(password),
            } = &mut user.auth
            {
                *password = "********".to_string();
            }
        }
        config
    }
}

fn check_privileges(target: &str, privileges: &[String], databases: &[String]) {
    for privilege in privileges {
        if !Privilege::parse(privilege).is_known() {
            warn!(
                "{}: `{}` is not a database-level privilege, the server will likely reject it",
                target, privilege
            );
        }
    }

    if !privileges.is_empty() && databases.is_empty() {
        warn!("{}: privileges are declared without any database", target);
    }
}
