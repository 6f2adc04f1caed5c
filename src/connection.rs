use crate::config::{ConnectionParameters, SslMode};
use crate::database::{Database, RoleInfo};
use crate::error::Error;
use crate::statement::Statement;
use anyhow::Result;
use indoc::indoc;
use log::debug;
use native_tls::TlsConnector;
use postgres::config::SslMode as PgSslMode;
use postgres::{Client, Config as PgConfig, NoTls};
use postgres_native_tls::MakeTlsConnector;

const APPLICATION_NAME: &str = "pg-user-manager";

/// A single blocking connection, used for every read and statement of a run.
///
/// In dry-run mode the login is deferred to the first catalog read, so a
/// placeholder token or an unreachable server only fails the reads.
pub struct DbConnection {
    connection_info: String,
    config: PgConfig,
    tls: Option<MakeTlsConnector>,
    client: Option<Client>,
}

impl DbConnection {
    /// Validate `params` and open a connection.
    ///
    /// Outside dry-run mode the server is contacted right away and checked
    /// with `SELECT 1`.
    pub fn connect(params: &ConnectionParameters, dry_run: bool) -> Result<Self, Error> {
        let credentials = params.credentials()?;
        let connection_info = format!(
            "postgres://{}@{}:{}/{}?sslmode={}",
            params.username, params.host, params.port, params.database, credentials.ssl_mode
        );

        if params.iam_auth {
            debug!("Connecting with IAM authentication to {}", connection_info);
        } else {
            debug!("Connecting with password authentication to {}", connection_info);
        }

        let mut config = PgConfig::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.username)
            .password(&credentials.password)
            .application_name(APPLICATION_NAME)
            .ssl_mode(driver_ssl_mode(credentials.ssl_mode));

        let tls = match credentials.ssl_mode {
            SslMode::Disable => None,
            mode => Some(MakeTlsConnector::new(tls_connector(mode)?)),
        };

        let mut conn = Self {
            connection_info,
            config,
            tls,
            client: None,
        };

        if dry_run {
            debug!("Deferring connection to {} in dry-run mode", conn.connection_info);
        } else {
            conn.ping()?;
            debug!("Connected to database: {}", conn.connection_info);
        }

        Ok(conn)
    }

    /// Connection target, without the password.
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Whether the server has been logged in to yet.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Ping the database
    pub fn ping(&mut self) -> Result<(), Error> {
        let result = self.client()?.query_one("SELECT 1", &[]);
        result.map_err(|source| Error::Connection {
            message: format!("health check failed on {}", self.connection_info),
            source,
        })?;

        Ok(())
    }

    pub fn close(self) -> Result<(), Error> {
        let connection_info = self.connection_info;
        match self.client {
            Some(client) => client.close().map_err(|source| Error::Connection {
                message: format!("failed to close connection to {}", connection_info),
                source,
            }),
            None => Ok(()),
        }
    }

    // Log in on first use
    fn client(&mut self) -> Result<&mut Client, Error> {
        let client = match self.client.take() {
            Some(client) => client,
            None => self.open()?,
        };

        Ok(self.client.insert(client))
    }

    fn open(&self) -> Result<Client, Error> {
        let connected = match &self.tls {
            None => self.config.connect(NoTls),
            Some(tls) => self.config.connect(tls.clone()),
        };

        connected.map_err(|source| Error::Connection {
            message: format!("could not connect to {}", self.connection_info),
            source,
        })
    }
}

impl Database for DbConnection {
    fn role_exists(&mut self, name: &str) -> Result<bool> {
        let row = self
            .client()?
            .query_opt("SELECT 1 FROM pg_roles WHERE rolname = $1", &[&name])?;

        Ok(row.is_some())
    }

    fn user_groups(&mut self, user: &str) -> Result<Vec<String>> {
        let sql = indoc! {"
            SELECT r.rolname::text
            FROM pg_auth_members m
              JOIN pg_roles r ON m.roleid = r.oid
              JOIN pg_roles u ON m.member = u.oid
            WHERE u.rolname = $1
        "};

        let groups = self
            .client()?
            .query(sql, &[&user])?
            .iter()
            .map(|row| row.get::<_, String>(0))
            .collect::<Vec<String>>();
        debug!("user_groups({}): {:?}", user, groups);

        Ok(groups)
    }

    fn group_members(&mut self, group: &str) -> Result<Vec<String>> {
        let sql = indoc! {"
            SELECT u.rolname::text
            FROM pg_auth_members m
              JOIN pg_roles r ON m.roleid = r.oid
              JOIN pg_roles u ON m.member = u.oid
            WHERE r.rolname = $1
        "};

        let members = self
            .client()?
            .query(sql, &[&group])?
            .iter()
            .map(|row| row.get::<_, String>(0))
            .collect::<Vec<String>>();
        debug!("group_members({}): {:?}", group, members);

        Ok(members)
    }

    fn list_roles(&mut self) -> Result<Vec<RoleInfo>> {
        let sql = indoc! {"
            SELECT
              u.rolname::text,
              u.rolsuper,
              u.rolcanlogin,
              u.rolinherit,
              u.rolconnlimit,
              ARRAY(
                SELECT r.rolname::text
                FROM pg_auth_members m
                  JOIN pg_roles r ON m.roleid = r.oid
                WHERE m.member = u.oid
                ORDER BY r.rolname
              ) AS groups
            FROM pg_roles u
            WHERE u.rolname !~ '^pg_'
            ORDER BY u.rolname
        "};

        let roles = self
            .client()?
            .query(sql, &[])?
            .iter()
            .map(|row| RoleInfo {
                name: row.get(0),
                superuser: row.get(1),
                can_login: row.get(2),
                inherit: row.get(3),
                connection_limit: row.get(4),
                groups: row.get(5),
            })
            .collect::<Vec<_>>();
        debug!("list_roles: {:#?}", roles);

        Ok(roles)
    }

    fn execute(&mut self, statement: &Statement) -> Result<()> {
        self.client()?.batch_execute(&statement.to_sql())?;
        Ok(())
    }
}

fn driver_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow | SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
    }
}

// Certificate checks follow libpq: only the verify-* modes look at the chain,
// and only verify-full looks at the host name.
fn tls_connector(mode: SslMode) -> Result<TlsConnector, Error> {
    let verify_chain = matches!(mode, SslMode::VerifyCa | SslMode::VerifyFull);
    let verify_host = mode == SslMode::VerifyFull;

    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(!verify_chain)
        .danger_accept_invalid_hostnames(!verify_host)
        .build()?;

    Ok(connector)
}
