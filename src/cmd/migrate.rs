//! Markdown import command: `mission-control migrate`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mission_control::board::events::NoopBroadcaster;
use mission_control::board::migrate::parse_kanban;
use mission_control::board::store::DataDirLock;
use mission_control::board::tasks::TaskStore;
use mission_control::config::MissionConfig;

pub fn cmd_migrate(
    config: &MissionConfig,
    file: &Path,
    data_dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| config.storage.data_dir.clone());
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let drafts = parse_kanban(&content);

    let _lock = DataDirLock::acquire(&data_dir)?;
    let store = TaskStore::open(&data_dir, &config.board.task_prefix, Arc::new(NoopBroadcaster))?;

    // `list` also snapshots today's backup before a --force replace.
    let existing = store.list(None)?.len();
    if existing > 0 && !force {
        anyhow::bail!(
            "{} already holds {} tasks. Re-run with --force to replace them.",
            data_dir.display(),
            existing
        );
    }

    let imported = store.replace_all(drafts)?;
    tracing::info!(count = imported.len(), source = %file.display(), "imported tasks");
    println!(
        "Migrated {} tasks from {} into {}",
        imported.len(),
        file.display(),
        data_dir.display()
    );
    Ok(())
}
