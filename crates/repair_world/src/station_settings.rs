//! Per-station settings saved to and restored from JSON.

use anyhow::{ensure, Context, Result};
use repair_core::{GameState, StationId, StationSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub const SETTINGS_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSettingsFile {
    pub version: u32,
    /// RFC 3339 UTC timestamp.
    pub saved_at: String,
    pub stations: BTreeMap<StationId, StationSettings>,
}

impl StationSettingsFile {
    /// Snapshot the settings of every station in `state`.
    pub fn capture(state: &GameState) -> Self {
        Self {
            version: SETTINGS_FILE_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            stations: state
                .stations
                .values()
                .map(|station| (station.id.clone(), station.settings.clone()))
                .collect(),
        }
    }
}

pub fn save_station_settings(path: &Path, state: &GameState) -> Result<()> {
    let file = StationSettingsFile::capture(state);
    let json = serde_json::to_string_pretty(&file).context("serializing station settings")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), stations = file.stations.len(), "station settings saved");
    Ok(())
}

/// Read a settings file. Missing fields in each station take their defaults;
/// files written by a newer version are refused.
pub fn load_station_settings(path: &Path) -> Result<StationSettingsFile> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: StationSettingsFile =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    ensure!(
        file.version <= SETTINGS_FILE_VERSION,
        "station settings version {} is newer than supported version {}",
        file.version,
        SETTINGS_FILE_VERSION
    );
    Ok(file)
}

/// Copy loaded settings onto the matching stations, correcting out-of-range
/// values. Returns how many stations were updated.
pub fn apply_station_settings(state: &mut GameState, file: &StationSettingsFile) -> usize {
    let mut applied = 0;
    for (id, settings) in &file.stations {
        let Some(station) = state.stations.get_mut(id) else {
            warn!(station = %id, "saved settings for unknown station, skipped");
            continue;
        };
        station.settings = settings.clone();
        station.settings.sanitize();
        applied += 1;
    }
    applied
}
