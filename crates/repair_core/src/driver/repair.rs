//! Timed repair at the station and milestone consumption.

use tracing::{debug, info};

use super::StepCtx;
use crate::cost::consumption_due;
use crate::inventory::consume_at;
use crate::station::RepairStation;
use crate::{Event, Position, RepairTask, TaskPhase};

pub(super) fn work(ctx: &mut StepCtx<'_>, task: &mut RepairTask) -> TaskPhase {
    let factor = ctx
        .state
        .stations
        .get(&task.station)
        .map_or(0.0, RepairStation::work_speed_factor);
    let content = ctx.content;
    let settings = &content.settings;
    let Some(agent) = ctx.state.agents.get_mut(ctx.agent) else {
        return TaskPhase::Repairing;
    };
    agent.crafting_xp += settings.skill_gain;
    task.progress.work_counter += agent.work_speed * factor;
    if task.progress.work_counter < settings.repair_rate {
        return TaskPhase::Repairing;
    }
    task.progress.work_counter = 0.0;

    let Some(target) = ctx.state.items.get_mut(&task.target) else {
        return TaskPhase::Repairing;
    };
    if target.hit_points < target.max_hit_points {
        target.hit_points += 1;
        task.progress.repaired += 1;
    }
    let (hit_points, max_hit_points) = (target.hit_points, target.max_hit_points);
    ctx.emit_debug(Event::HitPointRestored {
        item_id: task.target.clone(),
        hit_points,
    });

    if owes_consumption(task, max_hit_points) {
        return TaskPhase::Consuming;
    }
    if hit_points >= max_hit_points {
        return repair_finished(ctx, task);
    }
    TaskPhase::Repairing
}

fn owes_consumption(task: &RepairTask, max_hit_points: u32) -> bool {
    consumption_due(&task.policy, &task.needed, &task.progress, max_hit_points)
        .iter()
        .zip(&task.progress.consumed)
        .any(|(due, consumed)| due > consumed)
}

/// Consume what the last milestone owes from stock staged at the station.
/// Running short ends the task early, keeping the partial repair.
pub(super) fn consume(ctx: &mut StepCtx<'_>, task: &mut RepairTask) -> TaskPhase {
    let Some(station) = ctx.state.stations.get(&task.station) else {
        return TaskPhase::Repairing;
    };
    let cells: Vec<Position> = if station.ingredient_cells().is_empty() {
        vec![station.staging_cell()]
    } else {
        station.ingredient_cells().to_vec()
    };
    let region = station.region().clone();
    let Some(target) = ctx.state.items.get(&task.target) else {
        return TaskPhase::Repairing;
    };
    let (hit_points, max_hit_points) = (target.hit_points, target.max_hit_points);

    let due = consumption_due(&task.policy, &task.needed, &task.progress, max_hit_points);
    let mut short = false;
    for (k, entry) in task.needed.iter().enumerate() {
        let owed = due[k].saturating_sub(task.progress.consumed[k]);
        if owed == 0 {
            continue;
        }
        let got = consume_at(ctx.state, &cells, &region, &entry.resource, owed);
        task.progress.consumed[k] += got;
        if got > 0 {
            debug!(station = %task.station, resource = %entry.resource, count = got, "consumed");
            ctx.emit(Event::ResourceConsumed {
                station_id: task.station.clone(),
                resource: entry.resource.clone(),
                count: got,
            });
        }
        short |= got < owed;
    }

    if short {
        info!(
            agent = %ctx.agent,
            item = %task.target,
            hit_points,
            max_hit_points,
            "stock ran out, repair left partial"
        );
        ctx.emit(Event::RepairFinished {
            agent_id: ctx.agent.clone(),
            item_id: task.target.clone(),
            hit_points,
            max_hit_points,
            partial: true,
        });
        return TaskPhase::Completed;
    }
    if hit_points >= max_hit_points {
        return repair_finished(ctx, task);
    }
    TaskPhase::Repairing
}

fn repair_finished(ctx: &mut StepCtx<'_>, task: &RepairTask) -> TaskPhase {
    let (hit_points, max_hit_points) = ctx
        .state
        .items
        .get(&task.target)
        .map_or((0, 0), |item| (item.hit_points, item.max_hit_points));
    info!(agent = %ctx.agent, item = %task.target, "repair finished");
    ctx.emit(Event::RepairFinished {
        agent_id: ctx.agent.clone(),
        item_id: task.target.clone(),
        hit_points,
        max_hit_points,
        partial: false,
    });
    TaskPhase::Dropping { destination: None }
}
