//! Per-tick occupancy snapshots on disk.

use chrono::{DateTime, Utc};
use eco_core::{EcosystemConfig, Result, RunId};
use eco_world::Ecosystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, trace};

/// Settings written once at the start of an experiment
#[derive(Debug, Serialize, Deserialize)]
pub struct ExperimentManifest {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub config: EcosystemConfig,
}

/// Writes one JSON file per tick mapping `"(x, y)"` to a species code.
///
/// Files are grouped in folders of a thousand ticks:
/// `<dst>/2000_to_2999/2417.json`.
pub struct SnapshotExporter {
    dst_folder: PathBuf,
}

impl SnapshotExporter {
    /// Prepare the destination folder and write the experiment settings
    pub async fn create(dst_folder: &Path, config: &EcosystemConfig, run_id: RunId) -> Result<Self> {
        let settings_folder = dst_folder.join("settings");
        fs::create_dir_all(&settings_folder).await?;

        let manifest = ExperimentManifest {
            run_id,
            started_at: Utc::now(),
            config: config.clone(),
        };
        let settings_path = settings_folder.join(format!("{}.json", experiment_name(dst_folder)));
        fs::write(&settings_path, serde_json::to_vec_pretty(&manifest)?).await?;

        info!(path = %settings_path.display(), "Experiment settings exported");
        Ok(Self {
            dst_folder: dst_folder.to_path_buf(),
        })
    }

    pub fn slice_path(&self, tick: u64) -> PathBuf {
        let thousands = tick / 1000 * 1000;
        self.dst_folder
            .join(format!("{}_to_{}", thousands, thousands + 999))
            .join(format!("{}.json", tick))
    }

    /// Write the occupancy of the current tick
    pub async fn export_time_slice(&self, ecosystem: &Ecosystem) -> Result<PathBuf> {
        let path = self.slice_path(ecosystem.tick());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, serde_json::to_vec(&occupancy_map(ecosystem))?).await?;
        trace!(tick = ecosystem.tick(), path = %path.display(), "Time slice exported");
        Ok(path)
    }
}

/// Occupied cells keyed by `"(x, y)"`, valued by species code
pub fn occupancy_map(ecosystem: &Ecosystem) -> BTreeMap<String, u8> {
    ecosystem
        .occupancy()
        .map(|(pos, species)| (pos.to_string(), species.code()))
        .collect()
}

fn experiment_name(dst_folder: &Path) -> String {
    dst_folder
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("experiment")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{Position, Species, SpeciesTable, WorldConfig};
    use eco_world::Organism;

    fn temp_folder(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ecosim-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    fn tiny_ecosystem() -> Ecosystem {
        let mut config = EcosystemConfig::default();
        config.world = WorldConfig {
            width: 6,
            height: 6,
        };
        config.species.initial_count = SpeciesTable::new(0, 0, 0);
        let mut ecosystem = Ecosystem::empty(config).unwrap();
        ecosystem
            .add_organism(Organism::new(Species::Plant, Position::new(0, 1), 10.0, 5))
            .unwrap();
        ecosystem
            .add_organism(Organism::new(Species::Carnivore, Position::new(3, 2), 10.0, 5))
            .unwrap();
        ecosystem
    }

    #[test]
    fn test_slice_path_groups_by_thousands() {
        let exporter = SnapshotExporter {
            dst_folder: PathBuf::from("/tmp/run"),
        };
        assert_eq!(exporter.slice_path(0), PathBuf::from("/tmp/run/0_to_999/0.json"));
        assert_eq!(exporter.slice_path(999), PathBuf::from("/tmp/run/0_to_999/999.json"));
        assert_eq!(
            exporter.slice_path(2417),
            PathBuf::from("/tmp/run/2000_to_2999/2417.json")
        );
    }

    #[test]
    fn test_occupancy_map() {
        let map = occupancy_map(&tiny_ecosystem());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("(0, 1)"), Some(&1));
        assert_eq!(map.get("(3, 2)"), Some(&3));
    }

    #[test]
    fn test_experiment_name() {
        assert_eq!(experiment_name(Path::new("/data/wolves")), "wolves");
        assert_eq!(experiment_name(Path::new("/")), "experiment");
    }

    #[tokio::test]
    async fn test_export_writes_settings_and_slices() {
        let folder = temp_folder("meadow");
        let ecosystem = tiny_ecosystem();

        let exporter = SnapshotExporter::create(&folder, ecosystem.config(), RunId::new())
            .await
            .unwrap();
        let settings = fs::read(folder.join("settings").join("meadow.json")).await.unwrap();
        let manifest: ExperimentManifest = serde_json::from_slice(&settings).unwrap();
        assert_eq!(&manifest.config, ecosystem.config());

        let path = exporter.export_time_slice(&ecosystem).await.unwrap();
        assert_eq!(path, folder.join("0_to_999").join("0.json"));

        let slice: BTreeMap<String, u8> =
            serde_json::from_slice(&fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(slice, occupancy_map(&ecosystem));

        let _ = fs::remove_dir_all(folder.parent().unwrap()).await;
    }
}
