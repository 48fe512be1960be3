//! Type definitions for `repair_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the engine.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::settings::RepairSettings;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(ItemId);
string_id!(StationId);
string_id!(AgentId);
string_id!(RegionId);
string_id!(ThingDefId);
string_id!(CellId);
string_id!(CommandId);
string_id!(EventId);

/// Kind of consumable resource. Resource types are thing defs.
pub type ResourceType = ThingDefId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Position) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Same cell, allowing for float noise.
    pub fn same_spot(self, other: Position) -> bool {
        self.distance_sq(other) < 1e-4
    }
}

/// Axis-aligned bounds of a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Position,
    pub max: Position,
}

impl Rect {
    /// Squared distance from `point` to the nearest point of the rectangle.
    /// Zero when the point lies inside.
    pub fn distance_sq_to(&self, point: Position) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        dx * dx + dy * dy
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThingCategory {
    Weapon,
    Apparel,
    Item,
    Resource,
    Unfinished,
}

/// Allow-list over categories and individual defs. A def listed in `denied`
/// is refused even when its category is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThingFilter {
    #[serde(default)]
    pub categories: BTreeSet<ThingCategory>,
    #[serde(default)]
    pub defs: BTreeSet<ThingDefId>,
    #[serde(default)]
    pub denied: BTreeSet<ThingDefId>,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub items: HashMap<ItemId, ItemState>,
    pub stations: HashMap<StationId, StationState>,
    pub agents: HashMap<AgentId, AgentState>,
    pub storage: HashMap<CellId, StorageCellState>,
    pub reservations: Reservations,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_command_id: u64,
    pub next_item_id: u64,
}

/// A located thing: a damaged target or a resource stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemState {
    pub id: ItemId,
    pub def: ThingDefId,
    pub position: Position,
    pub region: RegionId,
    pub hit_points: u32,
    pub max_hit_points: u32,
    pub stack_count: u32,
    /// False while carried by an agent.
    pub spawned: bool,
    pub forbidden: bool,
    pub burning: bool,
    pub holder: Option<AgentId>,
}

impl ItemState {
    /// Damaged but not destroyed.
    pub fn is_damaged(&self) -> bool {
        self.hit_points > 0 && self.hit_points < self.max_hit_points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerState {
    pub powered: bool,
    /// Work speed while unpowered. Zero means the station needs power to work.
    pub unpowered_speed_factor: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationState {
    pub id: StationId,
    pub position: Position,
    pub region: RegionId,
    /// Where the agent stands to work.
    pub interaction_point: Position,
    /// Cells occupied by the station; hauled ingredients are staged here.
    pub cells: SmallVec<[Position; 2]>,
    /// `None` when the station has no power connection at all.
    pub power: Option<PowerState>,
    pub facility_speed_offset: f32,
    pub forbidden: bool,
    pub burning: bool,
    pub settings: StationSettings,
}

/// Per-station fields that survive save/load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSettings {
    #[serde(default = "default_search_radius")]
    pub search_radius: f32,
    #[serde(default = "default_true")]
    pub outside_items: bool,
    #[serde(default = "default_true")]
    pub haul_stockpile: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default = "ThingFilter::repairable_goods")]
    pub target_filter: ThingFilter,
    #[serde(default = "ThingFilter::allow_all")]
    pub ingredient_filter: ThingFilter,
}

pub const DEFAULT_SEARCH_RADIUS: f32 = 999.0;

fn default_search_radius() -> f32 {
    DEFAULT_SEARCH_RADIUS
}

fn default_true() -> bool {
    true
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS,
            outside_items: true,
            haul_stockpile: true,
            suspended: false,
            target_filter: ThingFilter::repairable_goods(),
            ingredient_filter: ThingFilter::allow_all(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageCellState {
    pub id: CellId,
    pub position: Position,
    pub region: RegionId,
    /// Higher is preferred.
    pub priority: u8,
    pub filter: ThingFilter,
    pub occupant: Option<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Position,
    pub region: RegionId,
    /// Distance covered per tick.
    pub move_speed: f32,
    /// Units of a single stack the agent can carry at once.
    pub carry_capacity: u32,
    /// Global work speed multiplier. Baseline 1.0.
    pub work_speed: f32,
    /// Highest region danger the agent will path through.
    pub max_danger: u8,
    pub crafting_xp: f32,
    pub carried: Option<ItemId>,
    pub task: Option<RepairTask>,
}

impl AgentState {
    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationTarget {
    Item(ItemId),
    Station(StationId),
    Cell(CellId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub target: ReservationTarget,
    pub agent: AgentId,
}

/// Exclusive claims, first come first served.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reservations {
    pub claims: Vec<Reservation>,
}

// ---------------------------------------------------------------------------
// Cost and allocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeededEntry {
    pub resource: ResourceType,
    pub count: u32,
}

/// One entry per distinct resource type; every count is non-zero.
pub type NeededQuantity = SmallVec<[NeededEntry; 4]>;

/// How a repair pays for the hit points it restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum ConsumptionPolicy {
    None,
    FixedKitCount { kit: ResourceType, kit_size: u32 },
    PercentageKitCount { kit: ResourceType, percentage: u32 },
    ProportionalIngredients { scaling: f32 },
}

/// A stack picked by the allocator and how much of it to take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedStack {
    pub item: ItemId,
    pub resource: ResourceType,
    pub take: u32,
}

/// Only valid for the tick it was computed in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Allocation {
    pub picks: Vec<AllocatedStack>,
}

// ---------------------------------------------------------------------------
// Task types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulEntry {
    pub item: ItemId,
    pub resource: ResourceType,
    /// Units still to bring to the station.
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairProgress {
    /// Work-speed-scaled counter toward the next hit point.
    pub work_counter: f32,
    pub repaired: u32,
    /// Hit points missing when the task was built.
    pub to_repair: u32,
    /// Units consumed so far, parallel to `RepairTask::needed`.
    pub consumed: SmallVec<[u32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    TargetGone,
    StationUnavailable,
    ReservationLost,
    Unreachable,
    Cancelled,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FailReason::TargetGone => "target gone",
            FailReason::StationUnavailable => "station unavailable",
            FailReason::ReservationLost => "reservation lost",
            FailReason::Unreachable => "unreachable",
            FailReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPhase {
    /// Initial: reservations not yet taken.
    Reserved,
    /// Travelling to and picking up `queue[index]`.
    GatheringIngredient { index: usize },
    CarryingToStation,
    Repairing,
    /// A consumption milestone was crossed on the previous tick.
    Consuming,
    /// Taking the repaired item to storage, or dropping it.
    Dropping { destination: Option<CellId> },
    /// Ended early: stock at the station ran out. The partial repair is kept.
    Completed,
    ReleasedAndDone,
    Failed { reason: FailReason },
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskPhase::Completed | TaskPhase::ReleasedAndDone | TaskPhase::Failed { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskPhase::Reserved => "Reserved",
            TaskPhase::GatheringIngredient { .. } => "GatheringIngredient",
            TaskPhase::CarryingToStation => "CarryingToStation",
            TaskPhase::Repairing => "Repairing",
            TaskPhase::Consuming => "Consuming",
            TaskPhase::Dropping { .. } => "Dropping",
            TaskPhase::Completed => "Completed",
            TaskPhase::ReleasedAndDone => "ReleasedAndDone",
            TaskPhase::Failed { .. } => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairTask {
    pub id: TaskId,
    pub station: StationId,
    pub target: ItemId,
    /// Damaged target first, then the allocated stacks in allocation order.
    pub queue: Vec<HaulEntry>,
    pub needed: NeededQuantity,
    pub policy: ConsumptionPolicy,
    pub haul_to_stockpile: bool,
    pub progress: RepairProgress,
    pub phase: TaskPhase,
    pub created_tick: u64,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    AssignRepairTask {
        agent_id: AgentId,
        task: Box<RepairTask>,
    },
    CancelTask {
        agent_id: AgentId,
    },
    UpdateStationSettings {
        station_id: StationId,
        settings: Box<StationSettings>,
    },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TaskAssigned {
        agent_id: AgentId,
        task_id: TaskId,
        station_id: StationId,
        target: ItemId,
    },
    TaskRejected {
        agent_id: AgentId,
        reason: String,
    },
    /// Only emitted at `EventLevel::Debug`.
    TaskPhaseChanged {
        agent_id: AgentId,
        task_id: TaskId,
        phase: String,
    },
    ItemPickedUp {
        agent_id: AgentId,
        item_id: ItemId,
        count: u32,
    },
    ItemStaged {
        agent_id: AgentId,
        station_id: StationId,
        item_id: ItemId,
    },
    /// Only emitted at `EventLevel::Debug`.
    HitPointRestored {
        item_id: ItemId,
        hit_points: u32,
    },
    ResourceConsumed {
        station_id: StationId,
        resource: ResourceType,
        count: u32,
    },
    RepairFinished {
        agent_id: AgentId,
        item_id: ItemId,
        hit_points: u32,
        max_hit_points: u32,
        partial: bool,
    },
    ItemStored {
        agent_id: AgentId,
        item_id: ItemId,
        cell_id: CellId,
    },
    ItemDropped {
        agent_id: AgentId,
        item_id: ItemId,
        position: Position,
    },
    TaskFailed {
        agent_id: AgentId,
        task_id: TaskId,
        reason: FailReason,
    },
    StationSettingsChanged {
        station_id: StationId,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub thing_defs: HashMap<ThingDefId, ThingDef>,
    pub map: MapDef,
    pub settings: RepairSettings,
}

impl GameContent {
    pub fn def(&self, id: &ThingDefId) -> Option<&ThingDef> {
        self.thing_defs.get(id)
    }

    pub fn region(&self, id: &RegionId) -> Option<&RegionDef> {
        self.map.regions.iter().find(|r| r.id == *id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingDef {
    pub id: ThingDefId,
    pub label: String,
    pub category: ThingCategory,
    #[serde(default = "default_stack_limit")]
    pub stack_limit: u32,
    /// Canonical build cost, used by the ingredients consumption mode.
    #[serde(default)]
    pub build_cost: Vec<(ResourceType, u32)>,
}

fn default_stack_limit() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDef {
    pub regions: Vec<RegionDef>,
    pub edges: Vec<(RegionId, RegionId)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDef {
    pub id: RegionId,
    pub bounds: Rect,
    pub roofed: bool,
    /// Zero is safe. Agents avoid regions above their `max_danger`.
    #[serde(default)]
    pub danger: u8,
}
