use crate::config::ConnectionLimit;
use crate::quote::{escape_literal, quote_identifier};
use std::fmt;

/// Role granted to users that authenticate with RDS IAM tokens.
pub const MANAGED_AUTH_ROLE: &str = "rds_iam";

const PASSWORD_MASK: &str = "********";

/// Database-level privilege keyword.
///
/// Keywords outside the known set are kept verbatim and rendered as a quoted
/// identifier, so the server rejects them rather than parsing them as SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Privilege {
    Connect,
    Create,
    Temporary,
    All,
    Other(String),
}

impl Privilege {
    pub fn parse(keyword: &str) -> Self {
        match keyword.trim().to_uppercase().as_str() {
            "CONNECT" => Privilege::Connect,
            "CREATE" => Privilege::Create,
            "TEMP" | "TEMPORARY" => Privilege::Temporary,
            "ALL" | "ALL PRIVILEGES" => Privilege::All,
            _ => Privilege::Other(keyword.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Privilege::Other(_))
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Privilege::Connect => write!(f, "CONNECT"),
            Privilege::Create => write!(f, "CREATE"),
            Privilege::Temporary => write!(f, "TEMPORARY"),
            Privilege::All => write!(f, "ALL PRIVILEGES"),
            Privilege::Other(keyword) => write!(f, "{}", quote_identifier(keyword)),
        }
    }
}

/// A single mutating statement.
///
/// [`Statement::to_sql`] renders the text sent to the server. `Display`
/// renders the same text with any password masked and is what gets logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateUser {
        name: String,
        password: Option<String>,
        can_login: bool,
        connection_limit: ConnectionLimit,
    },
    DropUser {
        name: String,
    },
    CreateRole {
        name: String,
        inherit: bool,
    },
    Grant {
        privilege: Privilege,
        database: String,
        grantee: String,
    },
    Revoke {
        privilege: Privilege,
        database: String,
        grantee: String,
    },
    AddMember {
        group: String,
        member: String,
    },
    RemoveMember {
        group: String,
        member: String,
    },
}

impl Statement {
    /// Render the statement for execution.
    pub fn to_sql(&self) -> String {
        self.render(false)
    }

    /// Name of the principal the statement acts on.
    pub fn target(&self) -> &str {
        match self {
            Statement::CreateUser { name, .. }
            | Statement::DropUser { name }
            | Statement::CreateRole { name, .. } => name,
            Statement::Grant { grantee, .. } | Statement::Revoke { grantee, .. } => grantee,
            Statement::AddMember { member, .. } | Statement::RemoveMember { member, .. } => member,
        }
    }

    fn render(&self, mask: bool) -> String {
        match self {
            Statement::CreateUser {
                name,
                password,
                can_login,
                connection_limit,
            } => {
                let mut sql = format!("CREATE USER {}", quote_identifier(name));
                if let Some(password) = password.as_deref().filter(|p| !p.is_empty()) {
                    let literal = if mask {
                        PASSWORD_MASK.to_string()
                    } else {
                        escape_literal(password)
                    };
                    sql += &format!(" WITH PASSWORD '{}'", literal);
                }
                sql += if *can_login { " LOGIN" } else { " NOLOGIN" };
                match connection_limit {
                    ConnectionLimit::Default => {}
                    ConnectionLimit::Unlimited => sql += " CONNECTION LIMIT -1",
                    ConnectionLimit::Limited(n) => sql += &format!(" CONNECTION LIMIT {}", n),
                }
                sql
            }
            Statement::DropUser { name } => format!("DROP USER {}", quote_identifier(name)),
            Statement::CreateRole { name, inherit } => format!(
                "CREATE ROLE {} {}",
                quote_identifier(name),
                if *inherit { "INHERIT" } else { "NOINHERIT" }
            ),
            Statement::Grant {
                privilege,
                database,
                grantee,
            } => format!(
                "GRANT {} ON DATABASE {} TO {}",
                privilege,
                quote_identifier(database),
                quote_identifier(grantee)
            ),
            Statement::Revoke {
                privilege,
                database,
                grantee,
            } => format!(
                "REVOKE {} ON DATABASE {} FROM {}",
                privilege,
                quote_identifier(database),
                quote_identifier(grantee)
            ),
            Statement::AddMember { group, member } => format!(
                "GRANT {} TO {}",
                quote_identifier(group),
                quote_identifier(member)
            ),
            Statement::RemoveMember { group, member } => format!(
                "REVOKE {} FROM {}",
                quote_identifier(group),
                quote_identifier(member)
            ),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(true))
    }
}
