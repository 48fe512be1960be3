//! Task execution state machine.
//!
//! Each tick an agent's task advances by one transition or one timed step.
//! The task is taken out of the agent while it is stepped and put back
//! unless it reached a terminal phase. Liveness is re-checked before every
//! step; any failure moves the task to `Failed`.

mod drop;
mod haul;
mod repair;

use tracing::{debug, warn};

use crate::graph::{region_reachable, TraversalScratch};
use crate::inventory::place_carried;
use crate::station::RepairStation;
use crate::{
    AgentId, AgentState, Event, EventEnvelope, EventLevel, FailReason, GameContent, GameState,
    ItemId, Position, RegionId, RepairTask, ReservationTarget, TaskPhase,
};

pub(crate) struct StepCtx<'a> {
    pub state: &'a mut GameState,
    pub content: &'a GameContent,
    pub agent: &'a AgentId,
    pub level: EventLevel,
    pub events: &'a mut Vec<EventEnvelope>,
    pub scratch: &'a mut TraversalScratch,
}

pub(crate) enum Travel {
    Arrived,
    Moving,
    Blocked,
}

impl StepCtx<'_> {
    fn emit(&mut self, event: Event) {
        let tick = self.state.meta.tick;
        self.events
            .push(crate::emit(&mut self.state.counters, tick, event));
    }

    fn emit_debug(&mut self, event: Event) {
        if self.level == EventLevel::Debug {
            self.emit(event);
        }
    }

    fn agent_state(&self) -> Option<&AgentState> {
        self.state.agents.get(self.agent)
    }

    fn carried(&self) -> Option<ItemId> {
        self.agent_state().and_then(|agent| agent.carried.clone())
    }

    fn holds(&self, target: ReservationTarget) -> bool {
        self.state.reservations.is_held_by(self.agent, &target)
    }

    /// Move up to `move_speed` toward `destination`. Arrival snaps the agent
    /// onto the destination and into its region.
    fn travel_to(&mut self, destination: Position, region: &RegionId) -> Travel {
        let Some(agent) = self.state.agents.get(self.agent) else {
            return Travel::Blocked;
        };
        if agent.region == *region && agent.position.same_spot(destination) {
            return Travel::Arrived;
        }
        if agent.move_speed <= 0.0
            || !region_reachable(
                &self.content.map,
                &agent.region,
                region,
                agent.max_danger,
                self.scratch,
            )
        {
            return Travel::Blocked;
        }

        let Some(agent) = self.state.agents.get_mut(self.agent) else {
            return Travel::Blocked;
        };
        let distance = agent.position.distance(destination);
        if distance <= agent.move_speed {
            agent.position = destination;
            agent.region = region.clone();
            return Travel::Arrived;
        }
        let step = agent.move_speed / distance;
        agent.position = Position::new(
            agent.position.x + (destination.x - agent.position.x) * step,
            agent.position.y + (destination.y - agent.position.y) * step,
        );
        Travel::Moving
    }

    /// Travel to the station's interaction point.
    fn travel_to_station(&mut self, task: &RepairTask) -> Travel {
        let Some(station) = self.state.stations.get(&task.station) else {
            return Travel::Blocked;
        };
        let (point, region) = (station.interaction_point(), station.region().clone());
        self.travel_to(point, &region)
    }

    /// Put the carried stack down where the agent stands.
    fn drop_carried(&mut self) -> Option<ItemId> {
        let agent = self.agent_state()?;
        let (position, region) = (agent.position, agent.region.clone());
        let item_id = place_carried(self.state, self.agent, position, &region)?;
        self.emit(Event::ItemDropped {
            agent_id: self.agent.clone(),
            item_id: item_id.clone(),
            position,
        });
        Some(item_id)
    }
}

/// Where the task goes once the agent has nothing left to stage.
fn after_staging(task: &RepairTask) -> TaskPhase {
    if task.queue.is_empty() {
        TaskPhase::Repairing
    } else {
        TaskPhase::GatheringIngredient { index: 0 }
    }
}

/// Advance the agent's task by one step.
pub(crate) fn step_task(ctx: &mut StepCtx<'_>) {
    let Some(mut task) = ctx
        .state
        .agents
        .get_mut(ctx.agent)
        .and_then(|agent| agent.task.take())
    else {
        return;
    };

    let next = match liveness_failure(ctx, &task) {
        Some(reason) => TaskPhase::Failed { reason },
        None => advance(ctx, &mut task),
    };
    transition(ctx, &mut task, next);

    if task.phase.is_terminal() {
        finish(ctx, &task);
    } else if let Some(agent) = ctx.state.agents.get_mut(ctx.agent) {
        agent.task = Some(task);
    }
}

/// Fail the agent's task at once, e.g. on external cancellation. Returns
/// false when the agent had no task.
pub(crate) fn abort_task(ctx: &mut StepCtx<'_>, reason: FailReason) -> bool {
    let Some(mut task) = ctx
        .state
        .agents
        .get_mut(ctx.agent)
        .and_then(|agent| agent.task.take())
    else {
        return false;
    };
    transition(ctx, &mut task, TaskPhase::Failed { reason });
    finish(ctx, &task);
    true
}

fn advance(ctx: &mut StepCtx<'_>, task: &mut RepairTask) -> TaskPhase {
    match task.phase.clone() {
        TaskPhase::Reserved => haul::reserve(ctx, task),
        TaskPhase::GatheringIngredient { index } => haul::gather(ctx, task, index),
        TaskPhase::CarryingToStation => haul::carry_to_station(ctx, task),
        TaskPhase::Repairing => repair::work(ctx, task),
        TaskPhase::Consuming => repair::consume(ctx, task),
        TaskPhase::Dropping { destination } => drop::deliver(ctx, task, destination),
        terminal @ (TaskPhase::Completed
        | TaskPhase::ReleasedAndDone
        | TaskPhase::Failed { .. }) => terminal,
    }
}

fn transition(ctx: &mut StepCtx<'_>, task: &mut RepairTask, next: TaskPhase) {
    if next == task.phase {
        return;
    }
    debug!(
        agent = %ctx.agent,
        task = %task.id,
        from = task.phase.label(),
        to = next.label(),
        "task phase changed"
    );
    ctx.emit_debug(Event::TaskPhaseChanged {
        agent_id: ctx.agent.clone(),
        task_id: task.id,
        phase: next.label().to_string(),
    });
    task.phase = next;
}

/// First reason the task can no longer continue, if any.
fn liveness_failure(ctx: &StepCtx<'_>, task: &RepairTask) -> Option<FailReason> {
    let Some(station) = ctx.state.stations.get(&task.station) else {
        return Some(FailReason::StationUnavailable);
    };
    if station.forbidden || station.burning {
        return Some(FailReason::StationUnavailable);
    }
    if matches!(task.phase, TaskPhase::Repairing | TaskPhase::Consuming) && !station.usable_now() {
        return Some(FailReason::StationUnavailable);
    }
    match ctx.state.items.get(&task.target) {
        Some(target) if !target.burning && !target.forbidden => {}
        _ => return Some(FailReason::TargetGone),
    }
    if task.phase != TaskPhase::Reserved
        && !(ctx.holds(ReservationTarget::Station(task.station.clone()))
            && ctx.holds(ReservationTarget::Item(task.target.clone())))
    {
        return Some(FailReason::ReservationLost);
    }
    None
}

/// Release everything the task held. A failed task also drops whatever the
/// agent is carrying so it is not lost.
fn finish(ctx: &mut StepCtx<'_>, task: &RepairTask) {
    if ctx.carried().is_some() {
        ctx.drop_carried();
    }
    ctx.state.reservations.release_all(ctx.agent);

    if let TaskPhase::Failed { reason } = task.phase {
        warn!(agent = %ctx.agent, task = %task.id, %reason, "repair task failed");
        ctx.emit(Event::TaskFailed {
            agent_id: ctx.agent.clone(),
            task_id: task.id,
            reason,
        });
    }
}
