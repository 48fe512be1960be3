//! Shared test fixtures for repair_core and downstream crates.
//!
//! `base_content()` is a three-region map (a roofed home, an open yard and a
//! dangerous cellar) with kits, raw materials and repairable goods.
//! `base_state()` puts one agent, one station and one storage cell in the
//! home region.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::smallvec;

use crate::inventory::is_available;
use crate::{
    AgentId, AgentState, CellId, CommandEnvelope, CommandId, Counters, EventEnvelope, EventLevel,
    GameContent, GameState, ItemId, ItemState, MapDef, MetaState, Position, Rect, RegionDef,
    RegionId, RepairSettings, ResourceType, RepairTask, Reservations, StationId, StationState,
    StorageCellState, ThingCategory, ThingDef, ThingDefId, ThingFilter,
};

pub const AGENT: &str = "agent_0001";
pub const STATION: &str = "station_0001";
pub const CELL: &str = "cell_0001";
pub const HOME: &str = "region_home";
pub const YARD: &str = "region_yard";
pub const CELLAR: &str = "region_cellar";
pub const KIT: &str = "repair_kit";
pub const STEEL: &str = "steel";
pub const COMPONENT: &str = "component";
pub const RIFLE: &str = "rifle";
pub const UNFINISHED_RIFLE: &str = "unfinished_rifle";

/// Where the station's ingredients and target are staged.
pub const STATION_CELL: Position = Position::new(2.0, 2.0);
pub const INTERACTION_POINT: Position = Position::new(2.0, 3.0);

fn def(id: &str, category: ThingCategory, stack_limit: u32) -> ThingDef {
    ThingDef {
        id: ThingDefId(id.to_string()),
        label: id.replace('_', " "),
        category,
        stack_limit,
        build_cost: vec![],
    }
}

fn region(id: &str, min: Position, max: Position, roofed: bool, danger: u8) -> RegionDef {
    RegionDef {
        id: RegionId(id.to_string()),
        bounds: Rect { min, max },
        roofed,
        danger,
    }
}

pub fn base_content() -> GameContent {
    let mut rifle = def(RIFLE, ThingCategory::Weapon, 1);
    rifle.build_cost = vec![
        (ThingDefId(STEEL.to_string()), 50),
        (ThingDefId(COMPONENT.to_string()), 2),
    ];
    let defs = vec![
        def(KIT, ThingCategory::Resource, 75),
        def(STEEL, ThingCategory::Resource, 75),
        def(COMPONENT, ThingCategory::Resource, 25),
        rifle,
        def(UNFINISHED_RIFLE, ThingCategory::Unfinished, 1),
    ];

    GameContent {
        content_version: "test".to_string(),
        thing_defs: defs.into_iter().map(|d| (d.id.clone(), d)).collect(),
        map: MapDef {
            regions: vec![
                region(HOME, Position::new(0.0, 0.0), Position::new(20.0, 20.0), true, 0),
                region(YARD, Position::new(20.0, 0.0), Position::new(40.0, 20.0), false, 0),
                region(CELLAR, Position::new(0.0, 20.0), Position::new(20.0, 40.0), true, 5),
            ],
            edges: vec![
                (RegionId(HOME.to_string()), RegionId(YARD.to_string())),
                (RegionId(HOME.to_string()), RegionId(CELLAR.to_string())),
            ],
        },
        settings: RepairSettings::default(),
    }
}

/// One idle agent, one station without a power connection and one storage
/// cell. No items.
pub fn base_state(content: &GameContent) -> GameState {
    let home = RegionId(HOME.to_string());
    let agent_id = AgentId(AGENT.to_string());
    let station_id = StationId(STATION.to_string());
    let cell_id = CellId(CELL.to_string());

    GameState {
        meta: MetaState {
            tick: 0,
            seed: 42,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        items: HashMap::new(),
        stations: HashMap::from([(
            station_id.clone(),
            StationState {
                id: station_id,
                position: STATION_CELL,
                region: home.clone(),
                interaction_point: INTERACTION_POINT,
                cells: smallvec![STATION_CELL],
                power: None,
                facility_speed_offset: 0.0,
                forbidden: false,
                burning: false,
                settings: content.settings.station_defaults(),
            },
        )]),
        agents: HashMap::from([(
            agent_id.clone(),
            AgentState {
                id: agent_id,
                position: Position::new(5.0, 5.0),
                region: home.clone(),
                move_speed: 1.0,
                carry_capacity: 75,
                work_speed: 1.0,
                max_danger: 0,
                crafting_xp: 0.0,
                carried: None,
                task: None,
            },
        )]),
        storage: HashMap::from([(
            cell_id.clone(),
            StorageCellState {
                id: cell_id,
                position: Position::new(10.0, 10.0),
                region: home,
                priority: 1,
                filter: ThingFilter::allow_all(),
                occupant: None,
            },
        )]),
        reservations: Reservations::default(),
        counters: Counters::default(),
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Put a new item into the world and return its id.
pub fn spawn_item(
    state: &mut GameState,
    def: &str,
    position: Position,
    region: &str,
    hit_points: u32,
    max_hit_points: u32,
    stack_count: u32,
) -> ItemId {
    let id = crate::inventory::next_item_id(state);
    state.items.insert(
        id.clone(),
        ItemState {
            id: id.clone(),
            def: ThingDefId(def.to_string()),
            position,
            region: RegionId(region.to_string()),
            hit_points,
            max_hit_points,
            stack_count,
            spawned: true,
            forbidden: false,
            burning: false,
            holder: None,
        },
    );
    id
}

/// A single item in the home region with the given hit points.
pub fn damaged_item(
    state: &mut GameState,
    def: &str,
    position: Position,
    hit_points: u32,
    max_hit_points: u32,
) -> ItemId {
    spawn_item(state, def, position, HOME, hit_points, max_hit_points, 1)
}

/// An undamaged resource stack in the home region.
pub fn resource_stack(state: &mut GameState, def: &str, position: Position, count: u32) -> ItemId {
    spawn_item(state, def, position, HOME, 100, 100, count)
}

pub fn kit_stack(state: &mut GameState, position: Position, count: u32) -> ItemId {
    resource_stack(state, KIT, position, count)
}

pub fn assign_command(state: &GameState, task: RepairTask) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{:06}", state.counters.next_command_id)),
        issued_tick: state.meta.tick,
        execute_at_tick: state.meta.tick,
        command: crate::Command::AssignRepairTask {
            agent_id: AgentId(AGENT.to_string()),
            task: Box::new(task),
        },
    }
}

/// Run `ticks` ticks with no commands and collect every event.
pub fn run_ticks(
    state: &mut GameState,
    content: &GameContent,
    ticks: u64,
    level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(crate::tick(state, &[], content, level));
    }
    events
}

/// Units of `resource` lying on the given cells.
pub fn staged_count(
    state: &GameState,
    cells: &[Position],
    region: &RegionId,
    resource: &ResourceType,
) -> u32 {
    state
        .items
        .values()
        .filter(|item| {
            item.def == *resource
                && item.region == *region
                && is_available(item)
                && cells.iter().any(|cell| cell.same_spot(item.position))
        })
        .map(|item| item.stack_count)
        .sum()
}
