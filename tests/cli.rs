use assert_cmd::prelude::*; // Add methods on commands
use indoc::indoc;
use predicates::prelude::*; // Used for writing assertions
use std::fs;
use std::process::Command; // Run programs

const ENV_VARS: [&str; 9] = [
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "POSTGRES_DB",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_SSLMODE",
    "POSTGRES_IAM_AUTH",
    "POSTGRES_IAM_TOKEN",
    "AWS_REGION",
];

/// The binary with a clean connection environment.
fn command() -> Command {
    let mut cmd = Command::cargo_bin("pg-user-manager").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Nothing listens on port 1, so every catalog read fails
fn unreachable_server(cmd: &mut Command) -> &mut Command {
    cmd.env("POSTGRES_HOST", "127.0.0.1")
        .env("POSTGRES_PORT", "1")
        .env("POSTGRES_PASSWORD", "secret")
        .env("POSTGRES_SSLMODE", "disable")
}

fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        indoc! {"
            groups:
              - name: app_group
                privileges: [CONNECT]
                databases: [app]
            users:
              - username: alice
                password: secret
                groups: [app_group]
        "},
    )
    .unwrap();
    path
}

#[test]
fn missing_arguments() {
    let mut cmd = command();
    cmd.assert().failure();
}

#[test]
/// `pg-user-manager drop-user` must have a username
fn drop_user_missing_arguments() {
    let mut cmd = command();
    cmd.arg("drop-user")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<username>"));
}

#[test]
fn sync_config_file_not_found() {
    let mut cmd = command();
    cmd.arg("--config")
        .arg("/tmp/pg-user-manager-not-found.json")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read config file"));
}

#[test]
fn sync_requires_postgres_password() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    cmd.arg("-c")
        .arg(&config)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "POSTGRES_PASSWORD is required for password authentication",
        ));
}

#[test]
fn sync_iam_requires_region() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    cmd.env("POSTGRES_IAM_AUTH", "true")
        .arg("-c")
        .arg(&config)
        .arg("--dry-run")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("AWS_REGION is required"));
}

#[test]
fn sync_invalid_port() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    cmd.env("POSTGRES_PASSWORD", "secret")
        .env("POSTGRES_PORT", "not-a-port")
        .arg("-c")
        .arg(&config)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid POSTGRES_PORT: not-a-port"));
}

#[test]
fn sync_invalid_sslmode() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    cmd.env("POSTGRES_PASSWORD", "secret")
        .env("POSTGRES_SSLMODE", "sometimes")
        .arg("-c")
        .arg(&config)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn sync_target_is_directory() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = command();
    cmd.arg("-c")
        .arg(dir.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("directory is not supported"));
}

#[test]
fn create_user_invalid_auth_method() {
    let mut cmd = command();
    cmd.arg("create-user")
        .arg("alice")
        .arg("--auth-method")
        .arg("ldap")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid auth method `ldap`"));
}

#[test]
fn create_user_invalid_connection_limit() {
    let mut cmd = command();
    cmd.arg("create-user")
        .arg("alice")
        .arg("--password")
        .arg("secret")
        .arg("--connection-limit")
        .arg("-5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid connection_limit -5"));
}

#[test]
/// A password user needs a password before any connection is attempted
fn create_user_without_password() {
    let mut cmd = command();
    cmd.env("POSTGRES_PASSWORD", "secret")
        .arg("create-user")
        .arg("alice")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no password"));
}

#[test]
fn list_users_requires_postgres_password() {
    let mut cmd = command();
    cmd.arg("list-users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("POSTGRES_PASSWORD"));
}

#[test]
/// A dry run does not log in up front; failed reads are per-entity errors
fn sync_dry_run_unreachable_server() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    unreachable_server(&mut cmd)
        .arg("-c")
        .arg(&config)
        .arg("--dry-run")
        .arg("sync")
        .arg("--json")
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""kind": "create_group""#))
        .stdout(predicate::str::contains(r#""kind": "create_user""#))
        .stderr(predicate::str::contains("sync completed with 2 error(s)"));
}

#[test]
fn sync_logs_only_summary_and_errors_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    unreachable_server(&mut cmd)
        .arg("-c")
        .arg(&config)
        .arg("--dry-run")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Summary"))
        .stderr(predicate::str::contains("could not connect to"))
        .stderr(predicate::str::contains("Creating group app_group").not())
        .stderr(predicate::str::contains("Loading configuration").not());
}

#[test]
fn sync_verbose_logs_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir);

    let mut cmd = command();
    unreachable_server(&mut cmd)
        .arg("-c")
        .arg(&config)
        .arg("--dry-run")
        .arg("--verbose")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Loading configuration"))
        .stderr(predicate::str::contains("Creating group app_group"))
        .stderr(predicate::str::contains("Creating user alice"))
        .stderr(predicate::str::contains("Summary"));
}
