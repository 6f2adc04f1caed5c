//! In-memory stand-in for a PostgreSQL server, for unit tests.

use super::{Database, RoleInfo};
use crate::statement::{Privilege, Statement};
use anyhow::{anyhow, bail, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRole {
    pub can_login: bool,
    pub inherit: bool,
    pub connection_limit: i32,
    pub password: Option<String>,
    pub member_of: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub roles: BTreeMap<String, MemoryRole>,
    pub databases: BTreeSet<String>,
    /// (database, privilege, grantee)
    pub grants: BTreeSet<(String, Privilege, String)>,
    /// SQL of every statement that was applied.
    pub executed: Vec<String>,
    pub reads: usize,
    /// Names whose CREATE USER / CREATE ROLE is rejected.
    pub deny_create: BTreeSet<String>,
}

impl MemoryDatabase {
    pub fn with_databases(databases: &[&str]) -> Self {
        Self {
            databases: databases.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn add_role(&mut self, name: &str, can_login: bool) {
        self.roles.insert(
            name.to_string(),
            MemoryRole {
                can_login,
                inherit: true,
                connection_limit: -1,
                password: None,
                member_of: BTreeSet::new(),
            },
        );
    }

    pub fn has_grant(&self, database: &str, privilege: Privilege, grantee: &str) -> bool {
        self.grants
            .contains(&(database.to_string(), privilege, grantee.to_string()))
    }

    pub fn is_member(&self, user: &str, group: &str) -> bool {
        self.roles
            .get(user)
            .map_or(false, |r| r.member_of.contains(group))
    }

    fn require_role(&self, name: &str) -> Result<()> {
        if self.roles.contains_key(name) {
            Ok(())
        } else {
            Err(anyhow!("role \"{}\" does not exist", name))
        }
    }

    fn check_grant(&self, privilege: &Privilege, database: &str, grantee: &str) -> Result<()> {
        if let Privilege::Other(keyword) = privilege {
            bail!("syntax error at or near \"{}\"", keyword);
        }
        if !self.databases.contains(database) {
            bail!("database \"{}\" does not exist", database);
        }
        self.require_role(grantee)
    }

    fn apply(&mut self, statement: &Statement) -> Result<()> {
        if let Statement::CreateUser { name, .. } | Statement::CreateRole { name, .. } = statement {
            if self.deny_create.contains(name) {
                bail!("permission denied to create role \"{}\"", name);
            }
        }

        match statement {
            Statement::CreateUser {
                name,
                password,
                can_login,
                connection_limit,
            } => {
                if self.roles.contains_key(name) {
                    bail!("role \"{}\" already exists", name);
                }
                self.roles.insert(
                    name.clone(),
                    MemoryRole {
                        can_login: *can_login,
                        inherit: true,
                        connection_limit: (*connection_limit).into(),
                        password: password.clone(),
                        member_of: BTreeSet::new(),
                    },
                );
            }
            Statement::DropUser { name } => {
                self.require_role(name)?;
                self.roles.remove(name);
                for role in self.roles.values_mut() {
                    role.member_of.remove(name);
                }
                self.grants.retain(|(_, _, grantee)| grantee != name);
            }
            Statement::CreateRole { name, inherit } => {
                if self.roles.contains_key(name) {
                    bail!("role \"{}\" already exists", name);
                }
                self.roles.insert(
                    name.clone(),
                    MemoryRole {
                        can_login: false,
                        inherit: *inherit,
                        connection_limit: -1,
                        password: None,
                        member_of: BTreeSet::new(),
                    },
                );
            }
            Statement::Grant {
                privilege,
                database,
                grantee,
            } => {
                self.check_grant(privilege, database, grantee)?;
                self.grants
                    .insert((database.clone(), privilege.clone(), grantee.clone()));
            }
            Statement::Revoke {
                privilege,
                database,
                grantee,
            } => {
                self.check_grant(privilege, database, grantee)?;
                self.grants
                    .remove(&(database.clone(), privilege.clone(), grantee.clone()));
            }
            Statement::AddMember { group, member } => {
                self.require_role(group)?;
                self.require_role(member)?;
                if let Some(role) = self.roles.get_mut(member) {
                    role.member_of.insert(group.clone());
                }
            }
            Statement::RemoveMember { group, member } => {
                self.require_role(group)?;
                self.require_role(member)?;
                if let Some(role) = self.roles.get_mut(member) {
                    role.member_of.remove(group);
                }
            }
        }

        Ok(())
    }
}

impl Database for MemoryDatabase {
    fn role_exists(&mut self, name: &str) -> Result<bool> {
        self.reads += 1;
        Ok(self.roles.contains_key(name))
    }

    fn user_groups(&mut self, user: &str) -> Result<Vec<String>> {
        self.reads += 1;
        Ok(self
            .roles
            .get(user)
            .map(|r| r.member_of.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn group_members(&mut self, group: &str) -> Result<Vec<String>> {
        self.reads += 1;
        Ok(self
            .roles
            .iter()
            .filter(|(_, r)| r.member_of.contains(group))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn list_roles(&mut self) -> Result<Vec<RoleInfo>> {
        self.reads += 1;
        Ok(self
            .roles
            .iter()
            .map(|(name, r)| RoleInfo {
                name: name.clone(),
                superuser: false,
                can_login: r.can_login,
                inherit: r.inherit,
                connection_limit: r.connection_limit,
                groups: r.member_of.iter().cloned().collect(),
            })
            .collect())
    }

    fn execute(&mut self, statement: &Statement) -> Result<()> {
        self.apply(statement)?;
        self.executed.push(statement.to_sql());
        Ok(())
    }
}
