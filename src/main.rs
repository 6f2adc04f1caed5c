use anyhow::Result;
use env_logger::Env;
use pg_user_manager::apply::{self, CreateUserOptions};
use pg_user_manager::cli::{self, Command};
use pg_user_manager::list_users::list_users;
use pg_user_manager::validate::validate_target;

fn main() -> Result<()> {
    let args = cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match args.cmd {
        Command::Sync { json } => apply::sync(&args.config, args.dry_run, json)?,

        Command::CreateUser {
            username,
            password,
            groups,
            privileges,
            databases,
            auth_method,
            iam_role,
            nologin,
            connection_limit,
            description,
        } => {
            let options = CreateUserOptions {
                username,
                password,
                groups,
                privileges,
                databases,
                auth_method,
                iam_role,
                nologin,
                connection_limit,
                description,
            };
            apply::create_user(&options, args.dry_run)?
        }

        Command::DropUser { username } => apply::drop_user(&username, args.dry_run)?,

        Command::ListUsers => list_users()?,

        Command::Validate { file } => validate_target(&file.unwrap_or(args.config))?,
    }

    Ok(())
}
