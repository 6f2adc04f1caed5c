use crate::config::{Config, ConnectionParameters};
use crate::connection::DbConnection;
use crate::database::Database;
use crate::error::Error;
use crate::manager::{Manager, Outcome};
use ansi_term::Colour::{Green, Red, Yellow};
use ascii_table::AsciiTable;
use log::{debug, info};
use serde::Serialize;
use std::fmt;

/// Step of a sync that failed for one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    CreateGroup,
    GrantGroupPrivileges,
    CreateUser,
    AddUserToGroup { group: String },
    GrantUserPrivileges,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::CreateGroup => write!(f, "create group"),
            Operation::GrantGroupPrivileges => write!(f, "grant privileges to group"),
            Operation::CreateUser => write!(f, "create user"),
            Operation::AddUserToGroup { group } => write!(f, "add to group {}", group),
            Operation::GrantUserPrivileges => write!(f, "grant privileges to user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncError {
    pub operation: Operation,
    /// User or group name the operation ran for.
    pub target: String,
    pub message: String,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.target, self.message)
    }
}

/// Everything a sync did, accumulated as it walks the config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub users_created: Vec<String>,
    /// Users that already existed; their memberships and grants were still applied.
    pub users_existing: Vec<String>,
    pub groups_created: Vec<String>,
    pub groups_existing: Vec<String>,
    pub errors: Vec<SyncError>,
    /// Statements that dry-run mode skipped.
    pub statements: Vec<String>,
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record_error(&mut self, operation: Operation, target: &str, err: anyhow::Error) {
        self.errors.push(SyncError {
            operation,
            target: target.to_string(),
            message: format!("{:#}", err),
        });
    }

    /// Summary of principals and failures as printable tables.
    pub fn summary(&self) -> String {
        let mut rows = vec![vec![
            "Principal".to_string(),
            "Kind".to_string(),
            "Action".to_string(),
        ]];
        rows.push(vec!["---".to_string(), "---".to_string(), "---".to_string()]);

        let entries = [
            (&self.groups_created, "group", Green.paint("created").to_string()),
            (&self.groups_existing, "group", "no action (already exists)".to_string()),
            (&self.users_created, "user", Green.paint("created").to_string()),
            (&self.users_existing, "user", "no action (already exists)".to_string()),
        ];
        for (names, kind, action) in entries.iter() {
            for name in names.iter() {
                rows.push(vec![name.clone(), kind.to_string(), action.clone()]);
            }
        }

        let table = AsciiTable::default();
        let mut summary = table.format(rows);

        if !self.errors.is_empty() {
            let mut rows = vec![vec![
                "Target".to_string(),
                "Operation".to_string(),
                "Error".to_string(),
            ]];
            rows.push(vec!["---".to_string(), "---".to_string(), "---".to_string()]);
            for error in &self.errors {
                rows.push(vec![
                    error.target.clone(),
                    error.operation.to_string(),
                    Red.paint(&error.message).to_string(),
                ]);
            }
            summary.push('\n');
            summary += &table.format(rows);
        }

        summary
    }
}

impl<D: Database> Manager<D> {
    /// Bring the server in line with `config`: groups first, then enabled users.
    ///
    /// Failures are recorded per principal and the walk goes on. Each
    /// statement commits on its own, so a user may end up created without
    /// all of its memberships or privileges.
    pub fn sync_configuration(&mut self, config: &Config) -> SyncResult {
        debug!("Starting configuration synchronization");
        let mut result = SyncResult::default();

        for group in &config.groups {
            match self.create_group(group) {
                Ok(Outcome::Applied) => result.groups_created.push(group.name.clone()),
                Ok(Outcome::Skipped) => result.groups_existing.push(group.name.clone()),
                Err(err) => {
                    result.record_error(Operation::CreateGroup, &group.name, err);
                    continue;
                }
            }

            if let Err(err) =
                self.grant_privileges(&group.name, &group.privileges, &group.databases)
            {
                result.record_error(Operation::GrantGroupPrivileges, &group.name, err);
            }
        }

        for user in &config.users {
            if !user.enabled {
                debug!("User {} is disabled, skipping", user.username);
                continue;
            }

            match self.create_user(user) {
                Ok(Outcome::Applied) => result.users_created.push(user.username.clone()),
                Ok(Outcome::Skipped) => result.users_existing.push(user.username.clone()),
                Err(err) => {
                    result.record_error(Operation::CreateUser, &user.username, err);
                    continue;
                }
            }

            for group in &user.groups {
                if let Err(err) = self.add_user_to_group(&user.username, group) {
                    result.record_error(
                        Operation::AddUserToGroup {
                            group: group.clone(),
                        },
                        &user.username,
                        err,
                    );
                }
            }

            if let Err(err) =
                self.grant_privileges(&user.username, &user.privileges, &user.databases)
            {
                result.record_error(Operation::GrantUserPrivileges, &user.username, err);
            }
        }

        result.statements = self.take_planned();

        let errors = if result.errors.is_empty() {
            Green.paint("0").to_string()
        } else {
            Yellow.paint(result.errors.len().to_string()).to_string()
        };
        info!(
            "Configuration synchronization completed: users_created={} groups_created={} errors={}",
            result.users_created.len(),
            result.groups_created.len(),
            errors
        );

        result
    }
}

/// Connect with `params` and sync `config`.
///
/// Only configuration and connection problems are returned as errors;
/// per-principal failures are in the result.
pub fn synchronize(
    config: &Config,
    params: &ConnectionParameters,
    dry_run: bool,
) -> Result<SyncResult, Error> {
    let conn = DbConnection::connect(params, dry_run)?;
    let mut manager = Manager::new(conn, dry_run);

    Ok(manager.sync_configuration(config))
}
