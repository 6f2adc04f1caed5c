use crate::config::{Group, User};
use crate::database::Database;
use crate::manager::{Manager, Outcome};
use crate::statement::{Privilege, Statement, MANAGED_AUTH_ROLE};
use anyhow::{Context, Result};
use log::debug;

impl<D: Database> Manager<D> {
    /// Create a user unless a role with that name already exists.
    ///
    /// IAM users get no password and are granted the managed auth role
    /// right after creation; a failure there fails the whole call.
    pub fn create_user(&mut self, user: &User) -> Result<Outcome> {
        debug!("Creating user {} (auth method: {})", user.username, user.auth.kind());

        if self.user_exists(&user.username)? {
            debug!("User {} already exists, skipping creation", user.username);
            return Ok(Outcome::Skipped);
        }

        self.run(Statement::CreateUser {
            name: user.username.clone(),
            password: user.password().map(str::to_string),
            can_login: user.can_login,
            connection_limit: user.connection_limit,
        })
        .with_context(|| format!("failed to create user {}", user.username))?;

        if user.is_iam() {
            debug!("Granting {} to {}", MANAGED_AUTH_ROLE, user.username);
            self.run(Statement::AddMember {
                group: MANAGED_AUTH_ROLE.to_string(),
                member: user.username.clone(),
            })
            .with_context(|| {
                format!(
                    "failed to grant {} role to user {}",
                    MANAGED_AUTH_ROLE, user.username
                )
            })?;
        }

        debug!("User {} created", user.username);
        Ok(Outcome::Applied)
    }

    /// Drop a user, doing nothing if it does not exist.
    pub fn drop_user(&mut self, username: &str) -> Result<Outcome> {
        debug!("Dropping user {}", username);

        if !self.user_exists(username)? {
            debug!("User {} does not exist, skipping deletion", username);
            return Ok(Outcome::Skipped);
        }

        self.run(Statement::DropUser {
            name: username.to_string(),
        })
        .with_context(|| format!("failed to drop user {}", username))?;

        debug!("User {} dropped", username);
        Ok(Outcome::Applied)
    }

    /// Create a group role unless it already exists.
    pub fn create_group(&mut self, group: &Group) -> Result<Outcome> {
        debug!("Creating group {}", group.name);

        if self.group_exists(&group.name)? {
            debug!("Group {} already exists, skipping creation", group.name);
            return Ok(Outcome::Skipped);
        }

        self.run(Statement::CreateRole {
            name: group.name.clone(),
            inherit: group.inherit,
        })
        .with_context(|| format!("failed to create group {}", group.name))?;

        debug!("Group {} created", group.name);
        Ok(Outcome::Applied)
    }

    /// Grant every privilege on every database to `target`, a user or a group.
    ///
    /// Stops at the first failing pair; earlier grants stay in place.
    pub fn grant_privileges(
        &mut self,
        target: &str,
        privileges: &[String],
        databases: &[String],
    ) -> Result<()> {
        if privileges.is_empty() || databases.is_empty() {
            return Ok(());
        }
        debug!("Granting {:?} on {:?} to {}", privileges, databases, target);

        for database in databases {
            for privilege in privileges {
                self.run(Statement::Grant {
                    privilege: Privilege::parse(privilege),
                    database: database.clone(),
                    grantee: target.to_string(),
                })
                .with_context(|| {
                    format!("failed to grant {} on {} to {}", privilege, database, target)
                })?;
            }
        }

        Ok(())
    }

    /// Revoke every privilege on every database from `target`.
    ///
    /// Stops at the first failing pair.
    pub fn revoke_privileges(
        &mut self,
        target: &str,
        privileges: &[String],
        databases: &[String],
    ) -> Result<()> {
        if privileges.is_empty() || databases.is_empty() {
            return Ok(());
        }
        debug!("Revoking {:?} on {:?} from {}", privileges, databases, target);

        for database in databases {
            for privilege in privileges {
                self.run(Statement::Revoke {
                    privilege: Privilege::parse(privilege),
                    database: database.clone(),
                    grantee: target.to_string(),
                })
                .with_context(|| {
                    format!(
                        "failed to revoke {} on {} from {}",
                        privilege, database, target
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Grant group membership. Not checked beforehand: a missing group or
    /// user is reported by the server.
    pub fn add_user_to_group(&mut self, username: &str, group: &str) -> Result<()> {
        debug!("Adding user {} to group {}", username, group);

        self.run(Statement::AddMember {
            group: group.to_string(),
            member: username.to_string(),
        })
        .with_context(|| format!("failed to add user {} to group {}", username, group))
    }

    pub fn remove_user_from_group(&mut self, username: &str, group: &str) -> Result<()> {
        debug!("Removing user {} from group {}", username, group);

        self.run(Statement::RemoveMember {
            group: group.to_string(),
            member: username.to_string(),
        })
        .with_context(|| format!("failed to remove user {} from group {}", username, group))
    }
}
