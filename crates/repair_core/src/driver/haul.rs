//! Reserving, gathering and staging: everything before the repair starts.

use super::{after_staging, StepCtx, Travel};
use crate::inventory::{is_available, pick_up, place_carried};
use crate::station::RepairStation;
use crate::{Event, FailReason, ItemId, RepairTask, ReservationTarget, TaskPhase};

/// Lock the station and every queued item. The first claim that fails
/// aborts the task.
pub(super) fn reserve(ctx: &mut StepCtx<'_>, task: &RepairTask) -> TaskPhase {
    let targets = std::iter::once(ReservationTarget::Station(task.station.clone())).chain(
        task.queue
            .iter()
            .map(|entry| ReservationTarget::Item(entry.item.clone())),
    );
    for target in targets {
        if !ctx.state.reservations.reserve(ctx.agent, target) {
            return TaskPhase::Failed {
                reason: FailReason::ReservationLost,
            };
        }
    }
    after_staging(task)
}

pub(super) fn gather(ctx: &mut StepCtx<'_>, task: &mut RepairTask, index: usize) -> TaskPhase {
    let Some(entry) = task.queue.get(index).cloned() else {
        return TaskPhase::CarryingToStation;
    };
    let lost = TaskPhase::Failed {
        reason: FailReason::ReservationLost,
    };
    let Some(item) = ctx.state.items.get(&entry.item) else {
        return lost;
    };
    if item.forbidden || item.burning {
        return TaskPhase::Failed {
            reason: FailReason::TargetGone,
        };
    }
    if !is_available(item)
        || item.stack_count < entry.remaining
        || !ctx.holds(ReservationTarget::Item(entry.item.clone()))
    {
        return lost;
    }

    let (position, region) = (item.position, item.region.clone());
    match ctx.travel_to(position, &region) {
        Travel::Arrived => {}
        Travel::Moving => return TaskPhase::GatheringIngredient { index },
        Travel::Blocked => {
            return TaskPhase::Failed {
                reason: FailReason::Unreachable,
            }
        }
    }

    let capacity = ctx
        .agent_state()
        .map_or(1, |agent| agent.carry_capacity.max(1));
    let take = entry.remaining.min(capacity.saturating_sub(carried_count(ctx)));
    if take == 0 {
        return TaskPhase::CarryingToStation;
    }
    let Some(carried) = pick_up(ctx.state, ctx.content, ctx.agent, &entry.item, take) else {
        return lost;
    };
    ctx.emit(Event::ItemPickedUp {
        agent_id: ctx.agent.clone(),
        item_id: carried.clone(),
        count: take,
    });

    task.queue[index].remaining -= take;
    if task.queue[index].remaining == 0 {
        task.queue.remove(index);
        if carried != entry.item {
            // The leftover of a partially taken stack is free for others.
            ctx.state
                .reservations
                .release(ctx.agent, &ReservationTarget::Item(entry.item.clone()));
        }
    }

    match mergeable_entry(ctx, task, &carried) {
        Some(next) => TaskPhase::GatheringIngredient { index: next },
        None => TaskPhase::CarryingToStation,
    }
}

fn carried_count(ctx: &StepCtx<'_>) -> u32 {
    ctx.carried()
        .and_then(|id| ctx.state.items.get(&id))
        .map_or(0, |item| item.stack_count)
}

/// A queued stack of the carried resource close enough to fetch on the way,
/// whose whole remaining count still fits in the agent's hands.
fn mergeable_entry(ctx: &StepCtx<'_>, task: &RepairTask, carried: &ItemId) -> Option<usize> {
    let agent = ctx.agent_state()?;
    let held = ctx.state.items.get(carried)?;
    let radius_sq = ctx.content.settings.pickup_merge_radius.powi(2);
    let room = agent.carry_capacity.saturating_sub(held.stack_count);

    task.queue.iter().position(|entry| {
        entry.resource == held.def
            && entry.remaining <= room
            && ctx.state.items.get(&entry.item).is_some_and(|item| {
                is_available(item)
                    && item.region == agent.region
                    && item.position.distance_sq(agent.position) <= radius_sq
            })
    })
}

/// Take the carried stack to the station and stage it on the first cell.
pub(super) fn carry_to_station(ctx: &mut StepCtx<'_>, task: &RepairTask) -> TaskPhase {
    if ctx.carried().is_none() {
        return after_staging(task);
    }
    match ctx.travel_to_station(task) {
        Travel::Arrived => {}
        Travel::Moving => return TaskPhase::CarryingToStation,
        Travel::Blocked => {
            return TaskPhase::Failed {
                reason: FailReason::Unreachable,
            }
        }
    }

    let Some(station) = ctx.state.stations.get(&task.station) else {
        return TaskPhase::Failed {
            reason: FailReason::StationUnavailable,
        };
    };
    let (cell, region) = (station.staging_cell(), station.region().clone());
    let Some(staged) = place_carried(ctx.state, ctx.agent, cell, &region) else {
        return after_staging(task);
    };
    // Keep staged stacks out of other stations' searches.
    ctx.state
        .reservations
        .reserve(ctx.agent, ReservationTarget::Item(staged.clone()));
    ctx.emit(Event::ItemStaged {
        agent_id: ctx.agent.clone(),
        station_id: task.station.clone(),
        item_id: staged,
    });
    after_staging(task)
}
