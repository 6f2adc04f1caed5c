use crate::config::{
    AuthMethod, AuthMethodKind, Config, ConnectionLimit, ConnectionParameters, User,
};
use crate::connection::DbConnection;
use crate::manager::{Manager, Outcome};
use crate::sync::{synchronize, SyncResult};
use ansi_term::Colour::{Green, Red, Yellow};
use anyhow::{bail, Result};
use log::{debug, error, info, warn};
use std::path::Path;

/// Read the config from the given path and synchronize it with the database
/// described by the environment. If the dry_run flag is set, nothing is
/// changed.
pub fn sync(config_path: &Path, dry_run: bool, json: bool) -> Result<()> {
    if config_path.is_dir() {
        bail!(
            "directory is not supported, expected a config file ({})",
            config_path.display()
        );
    }

    let config = Config::new(config_path)?;
    debug!("Applying configuration:\n{}", config);

    let params = ConnectionParameters::from_env()?;
    let result = synchronize(&config, &params, dry_run)?;

    report(&result, json)?;

    if !result.is_success() {
        bail!("sync completed with {} error(s)", result.errors.len());
    }

    Ok(())
}

fn report(result: &SyncResult, json: bool) -> Result<()> {
    for err in &result.errors {
        error!("{}: {}", Red.paint("Error"), err);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        info!("Summary:\n{}", result.summary());
    }

    Ok(())
}

/// Options of a single `create-user` invocation.
#[derive(Debug, Clone, Default)]
pub struct CreateUserOptions {
    pub username: String,
    pub password: Option<String>,
    pub groups: Vec<String>,
    pub privileges: Vec<String>,
    pub databases: Vec<String>,
    pub auth_method: AuthMethodKind,
    pub iam_role: Option<String>,
    pub nologin: bool,
    pub connection_limit: ConnectionLimit,
    pub description: Option<String>,
}

impl CreateUserOptions {
    /// Build the user the options describe.
    pub fn to_user(&self) -> Result<User> {
        let auth = match self.auth_method {
            AuthMethodKind::Password => AuthMethod::Password {
                password: self.password.clone().filter(|p| !p.is_empty()),
            },
            AuthMethodKind::Iam => {
                if self.password.is_some() {
                    warn!("Password is ignored for IAM user {}", self.username);
                }
                AuthMethod::Iam {
                    role: self.iam_role.clone(),
                }
            }
        };

        let user = User {
            username: self.username.clone(),
            auth,
            can_login: !self.nologin,
            connection_limit: self.connection_limit,
            groups: self.groups.clone(),
            privileges: self.privileges.clone(),
            databases: self.databases.clone(),
            enabled: true,
            description: self.description.clone(),
        };
        user.validate()?;

        Ok(user)
    }
}

/// Create one user, then add its memberships and privileges.
///
/// Only the creation itself fails the command; membership and privilege
/// failures are logged as warnings.
pub fn create_user(options: &CreateUserOptions, dry_run: bool) -> Result<()> {
    let user = options.to_user()?;
    let params = ConnectionParameters::from_env()?;
    let conn = DbConnection::connect(&params, dry_run)?;
    let mut manager = Manager::new(conn, dry_run);

    match manager.create_user(&user)? {
        Outcome::Applied => info!("{}: user {} created", Green.paint("Success"), user.username),
        Outcome::Skipped => info!("User {} already exists", user.username),
    }

    for group in &user.groups {
        if let Err(err) = manager.add_user_to_group(&user.username, group) {
            warn!(
                "{}: could not add {} to group {}: {:#}",
                Yellow.paint("Warning"),
                user.username,
                group,
                err
            );
        }
    }

    if let Err(err) =
        manager.grant_privileges(&user.username, &user.privileges, &user.databases)
    {
        warn!(
            "{}: could not grant privileges to {}: {:#}",
            Yellow.paint("Warning"),
            user.username,
            err
        );
    }

    manager.into_inner().close()?;
    Ok(())
}

/// Drop one user if it exists.
pub fn drop_user(username: &str, dry_run: bool) -> Result<()> {
    let params = ConnectionParameters::from_env()?;
    let conn = DbConnection::connect(&params, dry_run)?;
    let mut manager = Manager::new(conn, dry_run);

    match manager.drop_user(username)? {
        Outcome::Applied => info!("{}: user {} dropped", Green.paint("Success"), username),
        Outcome::Skipped => info!("User {} does not exist", username),
    }

    manager.into_inner().close()?;
    Ok(())
}
