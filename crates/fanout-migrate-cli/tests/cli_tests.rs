//! CLI integration tests for fanout-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for configuration errors. None of them needs a database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the fanout-migrate binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("fanout-migrate").unwrap();
    for key in [
        "MYSQL_HOST",
        "MYSQL_PORT",
        "MYSQL_USER",
        "MYSQL_PASSWORD",
        "MYSQL_DATABASE",
        "MONGO_HOST",
        "CASSANDRA_HOSTS",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list-tables"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--destinations"))
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--include"))
        .stdout(predicate::str::contains("--exclude"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fanout-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--shutdown-timeout"))
        .stdout(predicate::str::contains("[default: 60]"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_output_json_and_from_env_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--from-env"));
}

#[test]
fn test_config_conflicts_with_from_env() {
    cmd()
        .args(["--config", "x.yaml", "--from-env", "list-tables"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let file = config_file("source:\n  type: mysql\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_wrong_source_type_exits_with_code_2() {
    let file = config_file(
        "source:\n  type: postgres\n  host: localhost\n  database: shop\n  user: root\nfile: {}\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "list-tables"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("source.type must be 'mysql'"));
}

#[test]
fn test_zero_workers_override_exits_with_code_2() {
    let file = config_file("source:\n  host: localhost\n  database: shop\n  user: root\nfile: {}\n");

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--workers",
            "0",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("table_workers"));
}

#[test]
fn test_from_env_requires_mysql_variables() {
    cmd()
        .args(["--from-env", "list-tables"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MYSQL_HOST"));
}

#[test]
fn test_unknown_destination_is_rejected() {
    cmd()
        .args(["run", "--destinations", "file,redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown destination"));
}

#[test]
fn test_unknown_verbosity_exits_with_code_2() {
    cmd()
        .args(["--verbosity", "chatty", "list-tables"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown verbosity"));
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test source and destination connections"));
}

#[test]
fn test_list_tables_command_exists() {
    cmd()
        .args(["list-tables", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("List the source tables"));
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
