use super::*;
use crate::test_fixtures::{
    assign_command, base_content, base_state, damaged_item, kit_stack, make_rng, run_ticks, AGENT,
    RIFLE, STATION,
};


// --- Shared test helpers ------------------------------------------------

fn agent_id() -> AgentId {
    AgentId(AGENT.to_string())
}

fn station_id() -> StationId {
    StationId(STATION.to_string())
}

fn plan_with(
    state: &GameState,
    content: &GameContent,
    cooldowns: &mut Cooldowns,
    immediate: bool,
) -> Result<RepairTask, PlanFailure> {
    let agent = agent_id();
    let station = station_id();
    plan_repair(
        state,
        content,
        PlanRequest {
            agent: &agent,
            station: &station,
            immediate,
        },
        cooldowns,
        &mut make_rng(),
        &mut PlanScratch::new(),
    )
}

fn plan(state: &GameState, content: &GameContent) -> Result<RepairTask, PlanFailure> {
    plan_with(state, content, &mut Cooldowns::default(), false)
}

/// Rifle at 40/100 with a 20-kit stack nearby: costs 12 kits at 5 HP each.
fn kit_repair_state(content: &GameContent) -> (GameState, ItemId, ItemId) {
    let mut state = base_state(content);
    let rifle = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    let kits = kit_stack(&mut state, Position::new(6.0, 2.0), 20);
    (state, rifle, kits)
}

/// Plan for the default agent, assign the task and run `ticks` ticks.
fn assign_and_run(
    state: &mut GameState,
    content: &GameContent,
    ticks: u64,
    level: EventLevel,
) -> Vec<EventEnvelope> {
    let task = plan(state, content).unwrap();
    let command = assign_command(state, task);
    let mut events = tick(state, &[command], content, level);
    events.extend(run_ticks(state, content, ticks.saturating_sub(1), level));
    events
}

fn phases(events: &[EventEnvelope]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            Event::TaskPhaseChanged { phase, .. } => Some(phase.clone()),
            _ => None,
        })
        .collect()
}
