//! Content loading, scenario setup and station settings persistence.

mod station_settings;

use anyhow::{ensure, Context, Result};
use rand::Rng;
use repair_core::inventory::next_item_id;
use repair_core::{
    AgentId, AgentState, CellId, Counters, GameContent, GameState, ItemState, MapDef, MetaState,
    Position, PowerState, RegionId, RepairSettings, Reservations, ResourceMode, StationId,
    StationState, StorageCellState, ThingCategory, ThingDef, ThingDefId, ThingFilter,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

pub use station_settings::{
    apply_station_settings, load_station_settings, save_station_settings, StationSettingsFile,
    SETTINGS_FILE_VERSION,
};

#[derive(Deserialize)]
struct ThingDefsFile {
    content_version: String,
    thing_defs: Vec<ThingDef>,
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a map edge pointing at an unknown region, a build
/// cost naming something that is not a resource, or a kit def that does not
/// exist while a kit mode is selected.
pub fn validate_content(content: &GameContent) {
    let mut region_ids: HashSet<&RegionId> = HashSet::new();
    for region in &content.map.regions {
        assert!(
            region_ids.insert(&region.id),
            "region '{}' is defined twice",
            region.id,
        );
        assert!(
            region.bounds.min.x <= region.bounds.max.x && region.bounds.min.y <= region.bounds.max.y,
            "region '{}' has inverted bounds",
            region.id,
        );
    }

    for (from, to) in &content.map.edges {
        assert!(
            region_ids.contains(from),
            "map edge references unknown region '{from}'",
        );
        assert!(
            region_ids.contains(to),
            "map edge references unknown region '{to}'",
        );
    }

    for def in content.thing_defs.values() {
        assert!(def.stack_limit >= 1, "thing '{}' has a zero stack limit", def.id);
        for (resource, _) in &def.build_cost {
            assert!(
                is_resource(content, resource),
                "thing '{}' build cost '{}' is not a known resource",
                def.id,
                resource,
            );
        }
    }

    if matches!(
        content.settings.resource_mode,
        ResourceMode::FixedKit | ResourceMode::PercentageKit
    ) {
        assert!(
            is_resource(content, &content.settings.kit_def),
            "kit def '{}' is not a known resource",
            content.settings.kit_def,
        );
    }
}

fn is_resource(content: &GameContent, id: &ThingDefId) -> bool {
    content
        .def(id)
        .is_some_and(|def| def.category == ThingCategory::Resource)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let name = path.display();
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {name}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {name}"))
}

/// Load `thing_defs.json`, `map.json` and the optional `settings.json` from
/// `content_dir`. Settings out of range are corrected, not rejected.
pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let defs_file: ThingDefsFile = read_json(&dir.join("thing_defs.json"))?;
    let map: MapDef = read_json(&dir.join("map.json"))?;
    let settings_path = dir.join("settings.json");
    let mut settings: RepairSettings = if settings_path.exists() {
        read_json(&settings_path)?
    } else {
        RepairSettings::default()
    };
    let corrected = settings.sanitize();

    let content = GameContent {
        content_version: defs_file.content_version,
        thing_defs: defs_file
            .thing_defs
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect(),
        map,
        settings,
    };
    validate_content(&content);
    info!(
        version = %content.content_version,
        defs = content.thing_defs.len(),
        regions = content.map.regions.len(),
        corrected,
        "content loaded"
    );
    Ok(content)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn default_move_speed() -> f32 {
    1.0
}

fn default_carry_capacity() -> u32 {
    75
}

fn default_work_speed() -> f32 {
    1.0
}

fn default_max_hit_points() -> u32 {
    100
}

fn default_stack_count() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpawn {
    pub id: AgentId,
    pub position: Position,
    pub region: RegionId,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_carry_capacity")]
    pub carry_capacity: u32,
    #[serde(default = "default_work_speed")]
    pub work_speed: f32,
    #[serde(default)]
    pub max_danger: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpawn {
    pub id: StationId,
    pub position: Position,
    pub region: RegionId,
    pub interaction_point: Position,
    #[serde(default)]
    pub cells: Vec<Position>,
    #[serde(default)]
    pub power: Option<PowerState>,
    #[serde(default)]
    pub facility_speed_offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSpawn {
    pub id: CellId,
    pub position: Position,
    pub region: RegionId,
    #[serde(default)]
    pub priority: u8,
    #[serde(default = "ThingFilter::allow_all")]
    pub filter: ThingFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpawn {
    pub def: ThingDefId,
    pub position: Position,
    pub region: RegionId,
    /// Defaults to undamaged.
    #[serde(default)]
    pub hit_points: Option<u32>,
    #[serde(default = "default_max_hit_points")]
    pub max_hit_points: u32,
    #[serde(default = "default_stack_count")]
    pub stack_count: u32,
}

/// Single items of `def` dropped at random spots in `region`, with hit points
/// drawn from `hit_points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterDef {
    pub def: ThingDefId,
    pub region: RegionId,
    pub count: u32,
    pub hit_points: (u32, u32),
    #[serde(default = "default_max_hit_points")]
    pub max_hit_points: u32,
}

/// Initial placement of everything in the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDef {
    pub agents: Vec<AgentSpawn>,
    pub stations: Vec<StationSpawn>,
    pub storage: Vec<StorageSpawn>,
    pub items: Vec<ItemSpawn>,
    pub scatter: Vec<ScatterDef>,
}

pub fn load_scenario(path: &Path) -> Result<ScenarioDef> {
    let scenario: ScenarioDef = read_json(path)?;
    info!(
        path = %path.display(),
        agents = scenario.agents.len(),
        stations = scenario.stations.len(),
        items = scenario.items.len(),
        "scenario loaded"
    );
    Ok(scenario)
}

/// Check a scenario against content: known regions and defs, unique ids,
/// sensible hit points.
pub fn validate_scenario(content: &GameContent, scenario: &ScenarioDef) -> Result<()> {
    let known_region = |id: &RegionId| content.region(id).is_some();

    let mut agent_ids = HashSet::new();
    for agent in &scenario.agents {
        ensure!(agent_ids.insert(&agent.id), "agent '{}' is defined twice", agent.id);
        ensure!(
            known_region(&agent.region),
            "agent '{}' is in unknown region '{}'",
            agent.id,
            agent.region
        );
    }
    let mut station_ids = HashSet::new();
    for station in &scenario.stations {
        ensure!(
            station_ids.insert(&station.id),
            "station '{}' is defined twice",
            station.id
        );
        ensure!(
            known_region(&station.region),
            "station '{}' is in unknown region '{}'",
            station.id,
            station.region
        );
    }
    let mut cell_ids = HashSet::new();
    for cell in &scenario.storage {
        ensure!(cell_ids.insert(&cell.id), "storage cell '{}' is defined twice", cell.id);
        ensure!(
            known_region(&cell.region),
            "storage cell '{}' is in unknown region '{}'",
            cell.id,
            cell.region
        );
    }
    for item in &scenario.items {
        ensure!(content.def(&item.def).is_some(), "unknown thing def '{}'", item.def);
        ensure!(known_region(&item.region), "item '{}' is in unknown region '{}'", item.def, item.region);
        ensure!(
            item.hit_points.unwrap_or(item.max_hit_points) <= item.max_hit_points,
            "item '{}' has more hit points than its maximum",
            item.def
        );
        ensure!(item.stack_count >= 1, "item '{}' has an empty stack", item.def);
    }
    for scatter in &scenario.scatter {
        ensure!(content.def(&scatter.def).is_some(), "unknown thing def '{}'", scatter.def);
        ensure!(known_region(&scatter.region), "scatter region '{}' is unknown", scatter.region);
        let (low, high) = scatter.hit_points;
        ensure!(
            1 <= low && low <= high && high <= scatter.max_hit_points,
            "scatter of '{}' has invalid hit point range {low}..={high}",
            scatter.def
        );
    }
    Ok(())
}

fn spawn(state: &mut GameState, spawn: &ItemSpawn) {
    let id = next_item_id(state);
    state.items.insert(
        id.clone(),
        ItemState {
            id,
            def: spawn.def.clone(),
            position: spawn.position,
            region: spawn.region.clone(),
            hit_points: spawn.hit_points.unwrap_or(spawn.max_hit_points),
            max_hit_points: spawn.max_hit_points,
            stack_count: spawn.stack_count,
            spawned: true,
            forbidden: false,
            burning: false,
            holder: None,
        },
    );
}

fn scatter_items(
    state: &mut GameState,
    content: &GameContent,
    scatter: &ScatterDef,
    rng: &mut impl Rng,
) {
    let Some(region) = content.region(&scatter.region) else {
        return;
    };
    let bounds = region.bounds;
    let (low, high) = scatter.hit_points;
    for _ in 0..scatter.count {
        let position = Position::new(
            bounds.min.x + (bounds.max.x - bounds.min.x) * rng.gen::<f32>(),
            bounds.min.y + (bounds.max.y - bounds.min.y) * rng.gen::<f32>(),
        );
        let hit_points = if low >= high {
            low
        } else {
            rng.gen_range(low..=high)
        };
        spawn(
            state,
            &ItemSpawn {
                def: scatter.def.clone(),
                position,
                region: scatter.region.clone(),
                hit_points: Some(hit_points),
                max_hit_points: scatter.max_hit_points,
                stack_count: 1,
            },
        );
    }
}

/// Build the starting state for `scenario`. New stations take their settings
/// from the content defaults; scattered items are placed with `rng`.
pub fn build_initial_state(
    content: &GameContent,
    scenario: &ScenarioDef,
    seed: u64,
    rng: &mut impl Rng,
) -> GameState {
    let agents = scenario
        .agents
        .iter()
        .map(|a| {
            let agent = AgentState {
                id: a.id.clone(),
                position: a.position,
                region: a.region.clone(),
                move_speed: a.move_speed,
                carry_capacity: a.carry_capacity,
                work_speed: a.work_speed,
                max_danger: a.max_danger,
                crafting_xp: 0.0,
                carried: None,
                task: None,
            };
            (a.id.clone(), agent)
        })
        .collect();
    let stations = scenario
        .stations
        .iter()
        .map(|s| {
            let station = StationState {
                id: s.id.clone(),
                position: s.position,
                region: s.region.clone(),
                interaction_point: s.interaction_point,
                cells: s.cells.iter().copied().collect(),
                power: s.power,
                facility_speed_offset: s.facility_speed_offset,
                forbidden: false,
                burning: false,
                settings: content.settings.station_defaults(),
            };
            (s.id.clone(), station)
        })
        .collect();
    let storage = scenario
        .storage
        .iter()
        .map(|c| {
            let cell = StorageCellState {
                id: c.id.clone(),
                position: c.position,
                region: c.region.clone(),
                priority: c.priority,
                filter: c.filter.clone(),
                occupant: None,
            };
            (c.id.clone(), cell)
        })
        .collect();

    let mut state = GameState {
        meta: MetaState {
            tick: 0,
            seed,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        items: HashMap::new(),
        stations,
        agents,
        storage,
        reservations: Reservations::default(),
        counters: Counters::default(),
    };
    for item in &scenario.items {
        spawn(&mut state, item);
    }
    for scatter in &scenario.scatter {
        scatter_items(&mut state, content, scatter, rng);
    }
    state
}
