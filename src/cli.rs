use crate::config::{AuthMethodKind, ConnectionLimit};
use std::convert::TryFrom;
use std::path::PathBuf;
use structopt::StructOpt;

/// Manage PostgreSQL users, groups and privileges from a config file.
///
/// The connection is read from POSTGRES_HOST, POSTGRES_PORT, POSTGRES_DB,
/// POSTGRES_USER, POSTGRES_PASSWORD and POSTGRES_SSLMODE. Set
/// POSTGRES_IAM_AUTH=true, AWS_REGION and optionally POSTGRES_IAM_TOKEN to
/// connect with RDS IAM authentication.
#[derive(Debug, StructOpt)]
#[structopt(name = "pg-user-manager")]
pub struct Cli {
    /// Path to the configuration file
    #[structopt(
        short,
        long,
        default_value = "./config.json",
        parse(from_os_str),
        global = true
    )]
    pub config: PathBuf,

    /// Show what would be done without executing it
    #[structopt(long, global = true)]
    pub dry_run: bool,

    /// Log every statement
    #[structopt(short, long, global = true)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Synchronize the database with the configuration file
    Sync {
        /// Print the result as JSON
        #[structopt(long)]
        json: bool,
    },

    /// Create a single user
    CreateUser {
        username: String,

        /// User password, ignored for IAM authentication
        #[structopt(short, long)]
        password: Option<String>,

        /// Groups to add the user to
        #[structopt(short, long, use_delimiter = true)]
        groups: Vec<String>,

        /// Privileges to grant
        #[structopt(long, use_delimiter = true)]
        privileges: Vec<String>,

        /// Databases to grant the privileges on
        #[structopt(long, use_delimiter = true)]
        databases: Vec<String>,

        /// Authentication method: password or iam
        #[structopt(long, default_value = "password")]
        auth_method: AuthMethodKind,

        /// IAM role ARN, informational only
        #[structopt(long)]
        iam_role: Option<String>,

        /// Create the user with NOLOGIN
        #[structopt(long)]
        nologin: bool,

        /// Maximum connections: 0 keeps the server default, -1 is unlimited
        #[structopt(
            long,
            default_value = "0",
            allow_hyphen_values = true,
            parse(try_from_str = parse_connection_limit)
        )]
        connection_limit: ConnectionLimit,

        /// User description, not stored in the database
        #[structopt(long)]
        description: Option<String>,
    },

    /// Drop a single user
    DropUser { username: String },

    /// List database users and their groups
    ListUsers,

    /// Validate a configuration file, or every config file under a directory
    Validate {
        /// The path to validate, defaults to --config
        #[structopt(short, long, parse(from_os_str))]
        file: Option<PathBuf>,
    },
}

fn parse_connection_limit(value: &str) -> anyhow::Result<ConnectionLimit> {
    let limit: i32 = value.parse()?;
    ConnectionLimit::try_from(limit)
}

// Parse the command line arguments
pub fn parse() -> Cli {
    Cli::from_args()
}
