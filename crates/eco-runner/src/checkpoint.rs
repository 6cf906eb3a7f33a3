//! Checkpoint and restore functionality.

use eco_core::{Error, Result};
use eco_world::{Ecosystem, WorldState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub timestamp: i64,
    pub state: WorldState,
}

pub struct CheckpointManager {
    checkpoint_dir: PathBuf,
    keep_count: usize,
}

impl CheckpointManager {
    pub fn new(checkpoint_dir: PathBuf, keep_count: usize) -> Self {
        Self {
            checkpoint_dir,
            keep_count,
        }
    }

    /// Write the full world state, then prune old checkpoints
    pub async fn create_checkpoint(&self, ecosystem: &Ecosystem) -> Result<PathBuf> {
        fs::create_dir_all(&self.checkpoint_dir).await?;

        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            state: ecosystem.to_state(),
        };
        let bytes = bincode::serialize(&checkpoint)
            .map_err(|e| Error::Serialization(format!("Failed to serialize checkpoint: {}", e)))?;

        let checkpoint_path = self
            .checkpoint_dir
            .join(format!("checkpoint_{}.bin", ecosystem.tick()));
        fs::write(&checkpoint_path, &bytes).await?;
        info!(tick = ecosystem.tick(), path = %checkpoint_path.display(), "Checkpoint created");

        self.cleanup_old_checkpoints().await?;
        Ok(checkpoint_path)
    }

    /// Rebuild the ecosystem from the most recent checkpoint
    pub async fn restore_latest(&self) -> Result<Ecosystem> {
        let Some((path, tick)) = self.list_checkpoints().await?.into_iter().next() else {
            return Err(Error::NotFound(format!(
                "no checkpoint files in {}",
                self.checkpoint_dir.display()
            )));
        };

        let bytes = fs::read(&path).await?;
        let checkpoint: Checkpoint = bincode::deserialize(&bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize checkpoint: {}", e)))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(Error::InvalidState(format!(
                "unsupported checkpoint version {}",
                checkpoint.version
            )));
        }

        let ecosystem = Ecosystem::from_state(checkpoint.state)?;
        info!(tick, path = %path.display(), "Restored from checkpoint");
        Ok(ecosystem)
    }

    /// Checkpoint files, newest tick first
    async fn list_checkpoints(&self) -> Result<Vec<(PathBuf, u64)>> {
        if !self.checkpoint_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.checkpoint_dir).await?;
        let mut checkpoints = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let tick = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| name.strip_prefix("checkpoint_"))
                .and_then(|s| s.strip_suffix(".bin"))
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(tick) = tick {
                checkpoints.push((path, tick));
            }
        }

        checkpoints.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(checkpoints)
    }

    /// Remove all but the most recent `keep_count` checkpoints
    async fn cleanup_old_checkpoints(&self) -> Result<()> {
        for (path, _) in self.list_checkpoints().await?.iter().skip(self.keep_count) {
            if let Err(e) = fs::remove_file(path).await {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {:?}", path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{EcosystemConfig, SpeciesTable, WorldConfig};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ecosim-checkpoints-{}", uuid::Uuid::new_v4()))
    }

    fn ecosystem() -> Ecosystem {
        let mut config = EcosystemConfig::default();
        config.seed = 17;
        config.world = WorldConfig {
            width: 12,
            height: 12,
        };
        config.species.initial_count = SpeciesTable::new(30, 10, 4);
        Ecosystem::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_checkpoint_roundtrip() {
        let dir = temp_dir();
        let manager = CheckpointManager::new(dir.clone(), 3);
        let mut original = ecosystem();
        original.run(4).unwrap();

        let path = manager.create_checkpoint(&original).await.unwrap();
        assert_eq!(path, dir.join("checkpoint_4.bin"));

        let mut restored = manager.restore_latest().await.unwrap();
        assert_eq!(restored.tick(), 4);

        original.run(6).unwrap();
        restored.run(6).unwrap();
        assert_eq!(
            original.occupancy().collect::<Vec<_>>(),
            restored.occupancy().collect::<Vec<_>>()
        );

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_keeps_only_recent_checkpoints() {
        let dir = temp_dir();
        let manager = CheckpointManager::new(dir.clone(), 2);
        let mut ecosystem = ecosystem();

        for _ in 0..4 {
            ecosystem.evolve().unwrap();
            manager.create_checkpoint(&ecosystem).await.unwrap();
        }

        let ticks: Vec<u64> = manager
            .list_checkpoints()
            .await
            .unwrap()
            .into_iter()
            .map(|(_, tick)| tick)
            .collect();
        assert_eq!(ticks, vec![4, 3]);
        assert_eq!(manager.restore_latest().await.unwrap().tick(), 4);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_restore_without_checkpoints() {
        let manager = CheckpointManager::new(temp_dir(), 2);
        assert!(matches!(manager.restore_latest().await, Err(Error::NotFound(_))));
    }
}
