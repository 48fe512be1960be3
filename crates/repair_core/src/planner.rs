//! Work giver: decides whether an agent can repair something at a station
//! and, if so, builds the task.
//!
//! Control flow: eligibility gate, damaged-target search, cost, ingredient
//! search and allocation, then the task builder. Failing to pay for a target
//! starts a randomized per-station cooldown unless the request was
//! interactive.

use std::collections::HashMap;

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allocator::{allocate, AllocScratch, StackView};
use crate::cost::compute_cost;
use crate::eligibility::check_eligibility;
use crate::graph::TraversalScratch;
use crate::id::generate_task_id;
use crate::search::{
    closest_candidate, find_candidates, repairable_target, usable_ingredient, SearchArea,
};
use crate::settings::TargetSearch;
use crate::task::{build_task, WorkOrder};
use crate::{
    AgentId, AllocError, GameContent, GameState, ItemId, ItemState, PlanFailure, RepairTask,
    StationId,
};

/// Ticks until which each station is left alone after a materials failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cooldowns {
    until: HashMap<StationId, u64>,
}

impl Cooldowns {
    /// The tick the cooldown ends, if one is still running at `now`.
    pub fn active(&self, station: &StationId, now: u64) -> Option<u64> {
        self.until.get(station).copied().filter(|until| *until > now)
    }

    /// Start a cooldown of a random length in `[min, max]` ticks.
    pub fn start(
        &mut self,
        station: &StationId,
        now: u64,
        (min, max): (u64, u64),
        rng: &mut impl Rng,
    ) -> u64 {
        let length = if min >= max {
            min
        } else {
            rng.gen_range(min..=max)
        };
        let until = now + length;
        self.until.insert(station.clone(), until);
        until
    }

    pub fn clear(&mut self, station: &StationId) {
        self.until.remove(station);
    }
}

/// Caller-owned buffers reused across planning calls, plus the items already
/// promised to tasks planned earlier in the same tick.
#[derive(Debug, Default)]
pub struct PlanScratch {
    pub traversal: TraversalScratch,
    pub alloc: AllocScratch,
    pub claimed: AHashSet<ItemId>,
}

impl PlanScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub agent: &'a AgentId,
    pub station: &'a StationId,
    /// Interactive request: ignores and never starts a cooldown.
    pub immediate: bool,
}

/// Plan a repair for `request.agent` at `request.station`.
///
/// On success the target and every allocated stack are added to
/// `scratch.claimed` so later plans in the same tick leave them alone.
pub fn plan_repair(
    state: &GameState,
    content: &GameContent,
    request: PlanRequest<'_>,
    cooldowns: &mut Cooldowns,
    rng: &mut impl Rng,
    scratch: &mut PlanScratch,
) -> Result<RepairTask, PlanFailure> {
    let now = state.meta.tick;
    if !request.immediate {
        if let Some(until) = cooldowns.active(request.station, now) {
            return Err(PlanFailure::CoolingDown { until });
        }
    }
    check_eligibility(
        state,
        content,
        request.agent,
        request.station,
        &mut scratch.traversal,
    )?;

    let targets = find_targets(state, content, request, scratch);
    if targets.is_empty() {
        debug!(station = %request.station, "no damaged items in range");
        return Err(PlanFailure::NoEligibleTarget);
    }

    let policy = content.settings.policy();
    let mut shortfall: Option<AllocError> = None;
    for target in targets {
        let build_cost = content
            .def(&target.def)
            .map(|def| def.build_cost.as_slice())
            .unwrap_or_default();
        let needed = compute_cost(target, build_cost, &policy);
        let stacks = find_ingredients(state, content, request, target, &needed, scratch);

        match allocate(&stacks, &needed, &mut scratch.alloc) {
            Ok(allocation) => {
                let order = WorkOrder {
                    station: request.station.clone(),
                    target: target.id.clone(),
                    needed,
                    policy: policy.clone(),
                };
                let claimed: Vec<ItemId> =
                    allocation.picks.iter().map(|p| p.item.clone()).collect();
                let task = build_task(state, order, allocation, generate_task_id(rng))?;
                scratch.claimed.insert(task.target.clone());
                scratch.claimed.extend(claimed);
                cooldowns.clear(request.station);
                return Ok(task);
            }
            Err(err) => {
                debug!(
                    station = %request.station,
                    target = %target.id,
                    %err,
                    "cannot pay for repair"
                );
                shortfall = Some(err);
            }
        }
    }

    let Some(err) = shortfall else {
        return Err(PlanFailure::NoEligibleTarget);
    };
    if !request.immediate {
        let until = cooldowns.start(
            request.station,
            now,
            (
                content.settings.retry_cooldown_min,
                content.settings.retry_cooldown_max,
            ),
            rng,
        );
        debug!(station = %request.station, until, "missing materials, cooling down");
    }
    Err(PlanFailure::MissingMaterials(err))
}

fn find_targets<'s>(
    state: &'s GameState,
    content: &GameContent,
    request: PlanRequest<'_>,
    scratch: &mut PlanScratch,
) -> Vec<&'s ItemState> {
    let (Some(agent), Some(station)) = (
        state.agents.get(request.agent),
        state.stations.get(request.station),
    ) else {
        return Vec::new();
    };
    let area = SearchArea {
        region: &station.region,
        origin: station.position,
        radius: station.settings.search_radius,
        requester: agent.position,
    };
    let repairable = repairable_target(state, content, request.agent, &station.settings);
    let claimed = &scratch.claimed;
    let predicate = |item: &ItemState| !claimed.contains(&item.id) && repairable(item);
    let can_enter = |region: &crate::RegionDef| region.danger <= agent.max_danger;

    match content.settings.target_search {
        TargetSearch::Exhaustive => find_candidates(
            &content.map,
            state.items.values(),
            area,
            &mut scratch.traversal,
            can_enter,
            predicate,
        ),
        TargetSearch::Nearest => closest_candidate(
            &content.map,
            state.items.values(),
            area,
            &mut scratch.traversal,
            can_enter,
            predicate,
        )
        .into_iter()
        .collect(),
    }
}

/// Stacks available for `target`'s repair, nearest to the station first.
fn find_ingredients(
    state: &GameState,
    content: &GameContent,
    request: PlanRequest<'_>,
    target: &ItemState,
    needed: &[crate::NeededEntry],
    scratch: &mut PlanScratch,
) -> Vec<StackView> {
    if needed.is_empty() {
        return Vec::new();
    }
    let (Some(agent), Some(station)) = (
        state.agents.get(request.agent),
        state.stations.get(request.station),
    ) else {
        return Vec::new();
    };
    let area = SearchArea {
        region: &station.region,
        origin: station.position,
        radius: station.settings.search_radius,
        requester: station.position,
    };
    let usable = usable_ingredient(state, content, request.agent, &station.settings, needed);
    let claimed = &scratch.claimed;

    find_candidates(
        &content.map,
        state.items.values(),
        area,
        &mut scratch.traversal,
        |region| region.danger <= agent.max_danger,
        |item: &ItemState| item.id != target.id && !claimed.contains(&item.id) && usable(item),
    )
    .into_iter()
    .map(|item| StackView {
        item: item.id.clone(),
        resource: item.def.clone(),
        count: item.stack_count,
    })
    .collect()
}
