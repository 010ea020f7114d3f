use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::events::{Broadcaster, EventKind};
use super::json_file::JsonTable;
use super::models::*;
use crate::errors::{BoardError, BoardResult};

/// Upper bound on upgrades holding an active status at the same time.
pub const MAX_ACTIVE_UPGRADES: usize = 10;

pub const UPGRADES_FILE: &str = "upgrades.json";

/// File-backed store of improvement suggestions.
pub struct UpgradeStore {
    upgrades: JsonTable<Vec<Upgrade>>,
    events: Arc<dyn Broadcaster>,
}

fn active_count(upgrades: &[Upgrade]) -> usize {
    upgrades.iter().filter(|u| u.status.is_active()).count()
}

impl UpgradeStore {
    pub fn open(data_dir: &Path, events: Arc<dyn Broadcaster>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            upgrades: JsonTable::open(data_dir.join(UPGRADES_FILE))?,
            events,
        })
    }

    pub fn list(&self, status: Option<UpgradeStatus>) -> BoardResult<Vec<Upgrade>> {
        self.upgrades.read(|upgrades| {
            upgrades
                .iter()
                .filter(|u| status.is_none_or(|s| u.status == s))
                .cloned()
                .collect()
        })
    }

    pub fn get(&self, id: &str) -> BoardResult<Upgrade> {
        self.upgrades
            .read(|upgrades| upgrades.iter().find(|u| u.id == id).cloned())?
            .ok_or_else(|| BoardError::upgrade_not_found(id))
    }

    /// Active upgrades in file order.
    pub fn active(&self) -> BoardResult<Vec<Upgrade>> {
        self.upgrades.read(|upgrades| {
            upgrades
                .iter()
                .filter(|u| u.status.is_active())
                .cloned()
                .collect()
        })
    }

    pub fn active_count(&self) -> BoardResult<usize> {
        self.upgrades.read(|upgrades| active_count(upgrades))
    }

    fn build(fields: NewUpgrade, default_rank: i64) -> Upgrade {
        let now = Utc::now();
        Upgrade {
            id: Uuid::new_v4().to_string(),
            title: fields
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled Upgrade".to_string()),
            description: fields.description.unwrap_or_default(),
            category: fields
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "feature".to_string()),
            status: fields.status.unwrap_or_default(),
            rank: fields.rank.unwrap_or(default_rank),
            estimated_impact: fields.estimated_impact.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn create(&self, fields: NewUpgrade) -> BoardResult<Upgrade> {
        let upgrade = self.upgrades.mutate(|upgrades| {
            let upgrade = Self::build(fields, upgrades.len() as i64 + 1);
            if upgrade.status.is_active() && active_count(upgrades) >= MAX_ACTIVE_UPGRADES {
                return Err(BoardError::Capacity {
                    max: MAX_ACTIVE_UPGRADES,
                });
            }
            upgrades.push(upgrade.clone());
            Ok(upgrade)
        })?;
        self.events.broadcast(EventKind::UpgradeCreated, json!(upgrade));
        Ok(upgrade)
    }

    /// Create proposed upgrades from validated suggestions in one write,
    /// stopping once the active cap is reached.
    pub fn create_proposed(&self, drafts: Vec<NewUpgrade>) -> BoardResult<Vec<Upgrade>> {
        let created = self.upgrades.mutate(|upgrades| {
            let room = MAX_ACTIVE_UPGRADES.saturating_sub(active_count(upgrades));
            if room == 0 {
                return Err(BoardError::Capacity {
                    max: MAX_ACTIVE_UPGRADES,
                });
            }
            let mut created = Vec::new();
            for draft in drafts.into_iter().take(room) {
                let fields = NewUpgrade {
                    status: Some(UpgradeStatus::Proposed),
                    ..draft
                };
                let upgrade = Self::build(fields, upgrades.len() as i64 + 1);
                upgrades.push(upgrade.clone());
                created.push(upgrade);
            }
            Ok(created)
        })?;
        for upgrade in &created {
            self.events.broadcast(EventKind::UpgradeCreated, json!(upgrade));
        }
        Ok(created)
    }

    pub fn update(&self, id: &str, patch: UpgradePatch) -> BoardResult<Upgrade> {
        let upgrade = self.upgrades.mutate(|upgrades| {
            let activating = {
                let current = upgrades
                    .iter()
                    .find(|u| u.id == id)
                    .ok_or_else(|| BoardError::upgrade_not_found(id))?;
                patch
                    .status
                    .is_some_and(|s| s.is_active() && !current.status.is_active())
            };
            if activating && active_count(upgrades) >= MAX_ACTIVE_UPGRADES {
                return Err(BoardError::Capacity {
                    max: MAX_ACTIVE_UPGRADES,
                });
            }

            let Some(upgrade) = upgrades.iter_mut().find(|u| u.id == id) else {
                return Err(BoardError::upgrade_not_found(id));
            };
            if let Some(title) = patch.title {
                upgrade.title = title;
            }
            if let Some(description) = patch.description {
                upgrade.description = description;
            }
            if let Some(category) = patch.category {
                upgrade.category = category;
            }
            if let Some(status) = patch.status {
                upgrade.status = status;
            }
            if let Some(rank) = patch.rank {
                upgrade.rank = rank;
            }
            if let Some(impact) = patch.estimated_impact {
                upgrade.estimated_impact = impact;
            }
            upgrade.updated_at = Utc::now();
            Ok(upgrade.clone())
        })?;
        self.events.broadcast(EventKind::UpgradeUpdated, json!(upgrade));
        Ok(upgrade)
    }

    pub fn delete(&self, id: &str) -> BoardResult<()> {
        let upgrade = self.upgrades.mutate(|upgrades| {
            let idx = upgrades
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| BoardError::upgrade_not_found(id))?;
            Ok(upgrades.remove(idx))
        })?;
        self.events.broadcast(
            EventKind::UpgradeDeleted,
            json!({"id": upgrade.id, "title": upgrade.title}),
        );
        Ok(())
    }

    /// Assign `rank = position + 1` following `ranking`, whose entries are
    /// 1-based indices into `candidates`. Out-of-range indices and ids that
    /// vanished since the candidates were read are skipped.
    pub fn apply_ranking(&self, candidates: &[Upgrade], ranking: &[i64]) -> BoardResult<usize> {
        let now = Utc::now();
        let ranked = self.upgrades.mutate(|upgrades| {
            let mut ranked = 0;
            for (position, &index) in ranking.iter().enumerate() {
                let Some(candidate) = usize::try_from(index)
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| candidates.get(i))
                else {
                    continue;
                };
                if let Some(upgrade) = upgrades.iter_mut().find(|u| u.id == candidate.id) {
                    upgrade.rank = position as i64 + 1;
                    upgrade.updated_at = now;
                    ranked += 1;
                }
            }
            Ok(ranked)
        })?;
        self.events
            .broadcast(EventKind::UpgradesReranked, json!({"rerank": true}));
        Ok(ranked)
    }
}
