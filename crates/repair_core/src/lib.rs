//! `repair_core`: deterministic repair-work allocation and task execution.
//!
//! No IO, no network. All randomness via the passed-in Rng.

pub mod allocator;
pub mod cost;
mod driver;
mod eligibility;
mod engine;
mod errors;
mod filter;
pub mod graph;
mod id;
pub mod inventory;
mod planner;
mod reservation;
pub mod search;
pub mod settings;
mod station;
mod task;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use allocator::{allocate, AllocScratch, StackView};
pub use cost::{compute_cost, consumption_due, kit_size};
pub use eligibility::check_eligibility;
pub use engine::tick;
pub use errors::{AllocError, BuildError, Ineligible, PlanFailure};
pub use graph::{region_reachable, traverse_regions, TraversalScratch};
pub use id::{generate_task_id, generate_uuid};
pub use planner::{plan_repair, Cooldowns, PlanRequest, PlanScratch};
pub use settings::{RepairSettings, ResourceMode, TargetSearch};
pub use station::RepairStation;
pub use task::{build_task, WorkOrder};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
