use crate::database::{Database, LiveGroup, LiveUser, RoleInfo};
use crate::statement::Statement;
use ansi_term::Colour::{Green, Purple};
use anyhow::{Context, Result};
use log::debug;

/// Result of an existence-guarded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The statement ran, or would have run in dry-run mode.
    Applied,
    /// Nothing to do, the server is already in the wanted state.
    Skipped,
}

/// Applies principal changes to one database.
///
/// In dry-run mode mutating statements are logged and recorded instead of
/// executed. Catalog reads always go to the server.
pub struct Manager<D: Database> {
    db: D,
    dry_run: bool,
    planned: Vec<String>,
}

impl<D: Database> Manager<D> {
    pub fn new(db: D, dry_run: bool) -> Self {
        Self {
            db,
            dry_run,
            planned: vec![],
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Statements skipped because of dry-run mode, passwords masked.
    pub fn planned_statements(&self) -> &[String] {
        &self.planned
    }

    pub(crate) fn take_planned(&mut self) -> Vec<String> {
        std::mem::take(&mut self.planned)
    }

    pub fn into_inner(self) -> D {
        self.db
    }

    /// Execute a mutating statement, or record it in dry-run mode.
    pub(crate) fn run(&mut self, statement: Statement) -> Result<()> {
        if self.dry_run {
            debug!("{}: {}", Purple.paint("Dry-run"), statement);
            self.planned.push(statement.to_string());
            return Ok(());
        }

        debug!("Executing for {}: {}", statement.target(), statement);
        self.db
            .execute(&statement)
            .with_context(|| format!("`{}` failed", statement))?;
        debug!("{}: {}", Green.paint("Success"), statement);

        Ok(())
    }

    pub fn user_exists(&mut self, username: &str) -> Result<bool> {
        self.db
            .role_exists(username)
            .with_context(|| format!("failed to check if user {} exists", username))
    }

    pub fn group_exists(&mut self, group: &str) -> Result<bool> {
        self.db
            .role_exists(group)
            .with_context(|| format!("failed to check if group {} exists", group))
    }

    /// Existence and current memberships of a user. A missing user is not an error.
    pub fn get_user_info(&mut self, username: &str) -> Result<LiveUser> {
        let exists = self.user_exists(username)?;
        let groups = if exists {
            self.db
                .user_groups(username)
                .with_context(|| format!("failed to get groups of user {}", username))?
        } else {
            vec![]
        };

        Ok(LiveUser {
            username: username.to_string(),
            exists,
            groups,
        })
    }

    /// Existence and current members of a group.
    pub fn get_group_info(&mut self, group: &str) -> Result<LiveGroup> {
        let exists = self.group_exists(group)?;
        let members = if exists {
            self.db
                .group_members(group)
                .with_context(|| format!("failed to get members of group {}", group))?
        } else {
            vec![]
        };

        Ok(LiveGroup {
            name: group.to_string(),
            exists,
            members,
        })
    }

    pub fn list_users(&mut self) -> Result<Vec<RoleInfo>> {
        self.db.list_roles().context("failed to list roles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDatabase;

    #[test]
    fn test_get_user_info_missing_user() {
        let mut db = MemoryDatabase::default();
        let mut manager = Manager::new(&mut db, false);

        let info = manager.get_user_info("nobody").unwrap();
        assert_eq!(
            info,
            LiveUser {
                username: "nobody".to_string(),
                exists: false,
                groups: vec![],
            }
        );
    }

    #[test]
    fn test_get_user_info_lists_groups() {
        let mut db = MemoryDatabase::default();
        db.add_role("readers", false);
        db.add_role("writers", false);
        db.add_role("alice", true);
        let alice = db.roles.get_mut("alice").unwrap();
        alice.member_of.insert("readers".to_string());
        alice.member_of.insert("writers".to_string());

        let mut manager = Manager::new(&mut db, false);
        let mut info = manager.get_user_info("alice").unwrap();
        info.groups.sort();

        assert!(info.exists);
        assert_eq!(info.groups, vec!["readers", "writers"]);

        let group = manager.get_group_info("readers").unwrap();
        assert!(group.exists);
        assert_eq!(group.members, vec!["alice"]);
    }

    #[test]
    fn test_reads_run_in_dry_run() {
        let mut db = MemoryDatabase::default();
        db.add_role("alice", true);

        let mut manager = Manager::new(&mut db, true);
        assert!(manager.user_exists("alice").unwrap());
        assert!(!manager.group_exists("readers").unwrap());
        assert!(manager.is_dry_run());
        drop(manager);

        assert_eq!(db.reads, 2);
    }

    #[test]
    fn test_run_records_in_dry_run() {
        let mut db = MemoryDatabase::default();
        let mut manager = Manager::new(&mut db, true);

        manager
            .run(Statement::CreateRole {
                name: "readers".to_string(),
                inherit: true,
            })
            .unwrap();

        assert_eq!(manager.planned_statements(), ["CREATE ROLE \"readers\" INHERIT"]);
        drop(manager);
        assert!(db.executed.is_empty());
        assert!(db.roles.is_empty());
    }

    #[test]
    fn test_run_wraps_errors() {
        let mut db = MemoryDatabase::default();
        let mut manager = Manager::new(&mut db, false);

        let err = manager
            .run(Statement::DropUser {
                name: "ghost".to_string(),
            })
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("`DROP USER \"ghost\"` failed"));
        assert!(message.contains("role \"ghost\" does not exist"));
    }
}
