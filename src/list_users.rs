use crate::config::ConnectionParameters;
use crate::connection::DbConnection;
use crate::database::{Database, RoleInfo};
use crate::manager::Manager;
use anyhow::Result;
use ascii_table::AsciiTable;
use log::info;

/// Print the roles of the server described by the environment.
pub fn list_users() -> Result<()> {
    let params = ConnectionParameters::from_env()?;
    let conn = DbConnection::connect(&params, false)?;
    let connection_info = conn.connection_info().to_string();

    let mut manager = Manager::new(conn, false);
    let table = render(&mut manager)?;
    info!("Current users in {}:\n{}", connection_info, table);

    manager.into_inner().close()?;
    Ok(())
}

fn render<D: Database>(manager: &mut Manager<D>) -> Result<String> {
    let roles = manager.list_users()?;

    let mut table = AsciiTable::default();
    table.set_max_width(table_width(term_size::dimensions().map(|(w, _)| w)));

    Ok(table.format(rows(&roles)))
}

// Terminal width minus a margin, 120 columns when not attached to a terminal
fn table_width(terminal: Option<usize>) -> usize {
    terminal.unwrap_or(120).saturating_sub(5)
}

fn rows(roles: &[RoleInfo]) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec![
            "User".to_string(),
            "Super".to_string(),
            "Login".to_string(),
            "Inherit".to_string(),
            "Conn Limit".to_string(),
            "Groups".to_string(),
        ],
        vec![
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
        ],
    ];

    for role in roles {
        let limit = match role.connection_limit {
            -1 => "unlimited".to_string(),
            n => n.to_string(),
        };

        rows.push(vec![
            role.name.clone(),
            role.superuser.to_string(),
            role.can_login.to_string(),
            role.inherit.to_string(),
            limit,
            role.groups.join(", "),
        ]);
    }

    rows
}
