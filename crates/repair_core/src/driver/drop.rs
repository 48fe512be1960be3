//! Delivering the repaired item: to the best storage cell, or on the floor.

use super::{StepCtx, Travel};
use crate::graph::region_reachable;
use crate::inventory::{pick_up, place_carried};
use crate::{CellId, Event, FailReason, ItemId, RepairTask, ReservationTarget, TaskPhase};

pub(super) fn deliver(
    ctx: &mut StepCtx<'_>,
    task: &RepairTask,
    destination: Option<CellId>,
) -> TaskPhase {
    if ctx.carried().as_ref() != Some(&task.target) {
        return collect_target(ctx, task, destination);
    }
    let Some(cell_id) = destination else {
        return drop_here(ctx);
    };

    let Some(cell) = ctx.state.storage.get(&cell_id) else {
        return drop_here(ctx);
    };
    if cell.occupant.is_some() || !ctx.holds(ReservationTarget::Cell(cell_id.clone())) {
        return drop_here(ctx);
    }
    let (position, region) = (cell.position, cell.region.clone());
    match ctx.travel_to(position, &region) {
        Travel::Arrived => {}
        Travel::Moving => {
            return TaskPhase::Dropping {
                destination: Some(cell_id),
            }
        }
        Travel::Blocked => return drop_here(ctx),
    }

    let Some(item_id) = place_carried(ctx.state, ctx.agent, position, &region) else {
        return TaskPhase::ReleasedAndDone;
    };
    if let Some(cell) = ctx.state.storage.get_mut(&cell_id) {
        cell.occupant = Some(item_id.clone());
    }
    ctx.emit(Event::ItemStored {
        agent_id: ctx.agent.clone(),
        item_id,
        cell_id,
    });
    TaskPhase::ReleasedAndDone
}

/// Pick the repaired item up from the station and choose where it goes.
fn collect_target(
    ctx: &mut StepCtx<'_>,
    task: &RepairTask,
    destination: Option<CellId>,
) -> TaskPhase {
    match ctx.travel_to_station(task) {
        Travel::Arrived => {}
        Travel::Moving => return TaskPhase::Dropping { destination },
        Travel::Blocked => {
            return TaskPhase::Failed {
                reason: FailReason::Unreachable,
            }
        }
    }
    let Some(item_id) = pick_up(ctx.state, ctx.content, ctx.agent, &task.target, 1) else {
        return TaskPhase::Failed {
            reason: FailReason::TargetGone,
        };
    };
    ctx.emit(Event::ItemPickedUp {
        agent_id: ctx.agent.clone(),
        item_id: item_id.clone(),
        count: 1,
    });

    let destination = if task.haul_to_stockpile {
        best_storage_cell(ctx, &item_id)
    } else {
        None
    };
    if let Some(cell_id) = &destination {
        ctx.state
            .reservations
            .reserve(ctx.agent, ReservationTarget::Cell(cell_id.clone()));
    }
    TaskPhase::Dropping { destination }
}

/// Highest-priority free cell that accepts the item and that the agent can
/// reach; ties go to the nearest, then the lowest id.
fn best_storage_cell(ctx: &mut StepCtx<'_>, item_id: &ItemId) -> Option<CellId> {
    let agent_id = ctx.agent;
    let state = &*ctx.state;
    let scratch = &mut *ctx.scratch;
    let content = ctx.content;
    let item = state.items.get(item_id)?;
    let agent = state.agents.get(agent_id)?;

    state
        .storage
        .values()
        .filter(|cell| {
            cell.occupant.is_none()
                && cell.filter.allows(item, content)
                && state
                    .reservations
                    .can_reserve(agent_id, &ReservationTarget::Cell(cell.id.clone()))
                && region_reachable(
                    &content.map,
                    &agent.region,
                    &cell.region,
                    agent.max_danger,
                    scratch,
                )
        })
        .min_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    agent
                        .position
                        .distance_sq(a.position)
                        .total_cmp(&agent.position.distance_sq(b.position))
                })
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|cell| cell.id.clone())
}

fn drop_here(ctx: &mut StepCtx<'_>) -> TaskPhase {
    ctx.drop_carried();
    TaskPhase::ReleasedAndDone
}
