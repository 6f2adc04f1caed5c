use crate::statement::Statement;
use anyhow::Result;
use serde::Serialize;

#[cfg(test)]
pub(crate) mod memory;

/// What the manager needs from a server: catalog reads and statement execution.
///
/// Implemented by [`DbConnection`](crate::connection::DbConnection) for a live
/// PostgreSQL server.
pub trait Database {
    /// Whether any role with this name exists.
    fn role_exists(&mut self, name: &str) -> Result<bool>;

    /// Groups `user` is a direct member of.
    fn user_groups(&mut self, user: &str) -> Result<Vec<String>>;

    /// Direct members of `group`.
    fn group_members(&mut self, group: &str) -> Result<Vec<String>>;

    /// Every non-system role with its attributes.
    fn list_roles(&mut self) -> Result<Vec<RoleInfo>>;

    fn execute(&mut self, statement: &Statement) -> Result<()>;
}

impl<D: Database + ?Sized> Database for &mut D {
    fn role_exists(&mut self, name: &str) -> Result<bool> {
        (**self).role_exists(name)
    }

    fn user_groups(&mut self, user: &str) -> Result<Vec<String>> {
        (**self).user_groups(user)
    }

    fn group_members(&mut self, group: &str) -> Result<Vec<String>> {
        (**self).group_members(group)
    }

    fn list_roles(&mut self) -> Result<Vec<RoleInfo>> {
        (**self).list_roles()
    }

    fn execute(&mut self, statement: &Statement) -> Result<()> {
        (**self).execute(statement)
    }
}

/// A user as it currently exists on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveUser {
    pub username: String,
    pub exists: bool,
    pub groups: Vec<String>,
}

/// A group as it currently exists on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveGroup {
    pub name: String,
    pub exists: bool,
    pub members: Vec<String>,
}

/// Attributes of one role, as listed from `pg_roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleInfo {
    pub name: String,
    pub superuser: bool,
    pub can_login: bool,
    pub inherit: bool,
    /// `-1` when unlimited.
    pub connection_limit: i32,
    pub groups: Vec<String>,
}
