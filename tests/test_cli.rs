/// End-to-end tests of the agent-manager binary.
///
/// HOME points at an empty temp dir so a developer's ~/.agent-manager.toml
/// never leaks in.
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn agent_manager(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agent-manager"));
    cmd.env("HOME", home.path())
        .env_remove("AGENT_MANAGER_TIMEOUT")
        .env_remove("AGENT_MANAGER_SHELL")
        .env_remove("AGENT_MANAGER_CATALOG")
        .env_remove("AGENT_MANAGER_LOG")
        .env_remove("RUST_LOG");
    cmd
}

const DEMO_CATALOG: &str = r#"
[[agents]]
id = "demo"
name = "Demo Agent"

[agents.detection]
executables = ["agent-manager-demo-not-on-path"]
version_cmd = "echo demo version 3.1.4"

[agents.install_methods.native]
method = "native"
command = "echo installing demo"
platforms = ["darwin", "linux", "windows"]
"#;

fn write_catalog(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("catalog.toml");
    fs::write(&path, DEMO_CATALOG).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("satisfies"));
}

#[test]
fn test_hint_for_eacces() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["hint", "npm", "install", "npm ERR! code EACCES"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Permission denied"));
}

#[test]
fn test_hint_reads_stdin() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["hint", "brew", "install"])
        .write_stdin("Error: No available formula with the name \"nope\".\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("brew tap"));
}

#[test]
fn test_hint_prints_nothing_without_match() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["hint", "npm", "install", "unrelated message"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_compare() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["compare", "1.0.0-alpha", "1.0.0"])
        .assert()
        .success()
        .stdout("1.0.0-alpha < 1.0.0\n");
}

#[test]
fn test_compare_rejects_garbage() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["compare", "banana", "1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version format"));
}

#[test]
fn test_satisfies_exit_status() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["satisfies", "0.2.5", "^0.2.3"])
        .assert()
        .success();
    agent_manager(&home)
        .args(["satisfies", "0.3.0", "^0.2.3"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("does not satisfy"));
}

#[test]
fn test_unknown_agent() {
    let home = TempDir::new().unwrap();
    agent_manager(&home)
        .args(["install", "no-such-agent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown agent: no-such-agent"));
}

#[test]
fn test_list_custom_catalog() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    agent_manager(&home)
        .arg("list")
        .arg("--catalog")
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("Demo Agent"))
        .stdout(predicate::str::contains("native"));
}

#[test]
fn test_catalog_from_config_file() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    fs::write(
        home.path().join(".agent-manager.toml"),
        format!("[catalog]\npath = {:?}\n", catalog.display().to_string()),
    )
    .unwrap();

    agent_manager(&home)
        .args(["methods", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo Agent"));
}

#[test]
fn test_latest_not_supported_for_native() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    agent_manager(&home)
        .args(["latest", "demo", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not supported"));
}

#[cfg(unix)]
#[test]
fn test_install_native_agent() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    agent_manager(&home)
        .args(["install", "demo", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed Demo Agent 3.1.4"));
}

#[test]
fn test_update_not_installed() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    agent_manager(&home)
        .args(["update", "demo", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not installed"));
}

#[test]
fn test_update_all_skips_agents_not_installed() {
    let home = TempDir::new().unwrap();
    let catalog = write_catalog(&home);
    agent_manager(&home)
        .args(["update", "--all", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 updated, 0 already current, 0 failed"));
}

#[test]
fn test_version_commands_ignore_broken_config() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(".agent-manager.toml"), "[exec\n").unwrap();

    agent_manager(&home)
        .args(["compare", "1.2.0", "1.10.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<"));

    agent_manager(&home)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config parse error"));
}
