//! Integration tests for the mission-control CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a mission-control Command isolated from the caller's
/// environment.
fn mission_control(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("mission-control");
    cmd.current_dir(dir.path())
        .env_remove("MC_PORT")
        .env_remove("MC_HOST")
        .env_remove("MC_DATA_DIR")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

const KANBAN: &str = "# Board

## Backlog
### Errands
- [ ] **Renew passport**: photos first
- [ ] Book dentist

## In Progress
- [ ] Write newsletter

## Completed
- [x] File taxes
";

fn read_tasks(dir: &TempDir) -> Vec<serde_json::Value> {
    let raw = fs::read_to_string(dir.path().join("data/tasks.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("migrate"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir).arg("explode").assert().failure();
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_show_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 3333"))
            .stdout(predicate::str::contains("task_prefix = \"MC\""))
            .stdout(predicate::str::contains("api_key = <missing>"));
    }

    #[test]
    fn test_show_applies_env_overrides() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir)
            .env("MC_PORT", "4100")
            .env("ANTHROPIC_API_KEY", "your-api-key-here")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 4100"))
            .stdout(predicate::str::contains("api_key = <missing>"));
    }

    #[test]
    fn test_init_writes_file_once() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let written = fs::read_to_string(dir.path().join("mission-control.toml")).unwrap();
        assert!(written.contains("[server]"));
        assert!(written.contains("port = 3333"));

        mission_control(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("mission-control.toml"),
            "[board]\ntask_prefix = \"\"\n",
        )
        .unwrap();
        mission_control(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("task_prefix"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mission-control.toml"), "[server\nport = 1").unwrap();
        mission_control(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("mission-control.toml"));
    }
}

// =============================================================================
// Migrate Command Tests
// =============================================================================

mod migrate_command {
    use super::*;

    #[test]
    fn test_migrate_imports_tasks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("KANBAN.md"), KANBAN).unwrap();

        mission_control(&dir)
            .args(["migrate", "KANBAN.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Migrated 4 tasks"));

        let tasks = read_tasks(&dir);
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0]["title"], "Renew passport");
        assert_eq!(tasks[0]["description"], "photos first");
        assert_eq!(tasks[0]["labels"][0], "errands");
        assert_eq!(tasks[0]["taskNumber"], "MC-1");
        assert_eq!(tasks[2]["status"], "in-progress");
        assert_eq!(tasks[3]["status"], "done");
        assert!(dir.path().join("data/meta.json").exists());
    }

    #[test]
    fn test_migrate_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("KANBAN.md"), KANBAN).unwrap();
        mission_control(&dir)
            .args(["migrate", "KANBAN.md"])
            .assert()
            .success();

        mission_control(&dir)
            .args(["migrate", "KANBAN.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--force"));

        mission_control(&dir)
            .args(["migrate", "KANBAN.md", "--force"])
            .assert()
            .success();

        // Display numbers keep increasing across imports.
        let tasks = read_tasks(&dir);
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0]["taskNumber"], "MC-5");
    }

    #[test]
    fn test_migrate_honours_data_dir_flag_and_prefix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("KANBAN.md"), KANBAN).unwrap();
        fs::write(
            dir.path().join("mission-control.toml"),
            "[board]\ntask_prefix = \"HOME\"\n",
        )
        .unwrap();

        mission_control(&dir)
            .args(["migrate", "KANBAN.md", "--data-dir", "board-data"])
            .assert()
            .success();

        let raw = fs::read_to_string(dir.path().join("board-data/tasks.json")).unwrap();
        let tasks: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(tasks[0]["taskNumber"], "HOME-1");
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_migrate_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        mission_control(&dir)
            .args(["migrate", "NOPE.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("NOPE.md"));
    }
}
