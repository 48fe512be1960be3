use tracing::warn;

use crate::driver::{abort_task, step_task, StepCtx};
use crate::graph::TraversalScratch;
use crate::{
    AgentId, Command, CommandEnvelope, Event, EventEnvelope, EventLevel, FailReason, GameContent,
    GameState, TaskPhase,
};

/// Advance the simulation by one tick.
///
/// Order of operations:
/// 1. Apply commands scheduled for this tick.
/// 2. Step every agent's task once, in agent id order.
/// 3. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let mut scratch = TraversalScratch::new();

    apply_commands(state, commands, content, event_level, &mut events, &mut scratch);
    step_agents(state, content, event_level, &mut events, &mut scratch);

    state.meta.tick += 1;
    events
}

fn apply_commands(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    level: EventLevel,
    events: &mut Vec<EventEnvelope>,
    scratch: &mut TraversalScratch,
) {
    let current_tick = state.meta.tick;

    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        match &envelope.command {
            Command::AssignRepairTask { agent_id, task } => {
                assign_task(state, agent_id, task.as_ref().clone(), events);
            }
            Command::CancelTask { agent_id } => {
                let mut ctx = StepCtx {
                    state: &mut *state,
                    content,
                    agent: agent_id,
                    level,
                    events: &mut *events,
                    scratch: &mut *scratch,
                };
                abort_task(&mut ctx, FailReason::Cancelled);
            }
            Command::UpdateStationSettings {
                station_id,
                settings,
            } => {
                let Some(station) = state.stations.get_mut(station_id) else {
                    continue;
                };
                station.settings = settings.as_ref().clone();
                station.settings.sanitize();
                events.push(crate::emit(
                    &mut state.counters,
                    current_tick,
                    Event::StationSettingsChanged {
                        station_id: station_id.clone(),
                    },
                ));
            }
        }
    }
}

fn assign_task(
    state: &mut GameState,
    agent_id: &AgentId,
    mut task: crate::RepairTask,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;
    let rejection = match state.agents.get(agent_id) {
        None => Some("unknown agent"),
        Some(agent) if !agent.is_idle() => Some("agent busy"),
        Some(_) if !state.stations.contains_key(&task.station) => Some("unknown station"),
        Some(_) => None,
    };
    if let Some(reason) = rejection {
        warn!(agent = %agent_id, reason, "repair task rejected");
        events.push(crate::emit(
            &mut state.counters,
            current_tick,
            Event::TaskRejected {
                agent_id: agent_id.clone(),
                reason: reason.to_string(),
            },
        ));
        return;
    }

    task.phase = TaskPhase::Reserved;
    let event = Event::TaskAssigned {
        agent_id: agent_id.clone(),
        task_id: task.id,
        station_id: task.station.clone(),
        target: task.target.clone(),
    };
    if let Some(agent) = state.agents.get_mut(agent_id) {
        agent.task = Some(task);
    }
    events.push(crate::emit(&mut state.counters, current_tick, event));
}

fn step_agents(
    state: &mut GameState,
    content: &GameContent,
    level: EventLevel,
    events: &mut Vec<EventEnvelope>,
    scratch: &mut TraversalScratch,
) {
    // Sorted for determinism.
    let mut agent_ids: Vec<AgentId> = state
        .agents
        .values()
        .filter(|agent| agent.task.is_some())
        .map(|agent| agent.id.clone())
        .collect();
    agent_ids.sort();

    for agent_id in &agent_ids {
        let mut ctx = StepCtx {
            state: &mut *state,
            content,
            agent: agent_id,
            level,
            events: &mut *events,
            scratch: &mut *scratch,
        };
        step_task(&mut ctx);
    }
}
