//! End-to-end: planning against a seeded world, then running the task to its
//! terminal phase.

use repair_core::test_fixtures::{
    base_content, base_state, damaged_item, kit_stack, make_rng, run_ticks, AGENT, KIT, RIFLE,
    STATION, STATION_CELL, INTERACTION_POINT,
};
use repair_core::*;
use smallvec::smallvec;

fn agent_id() -> AgentId {
    AgentId(AGENT.to_string())
}

fn station_id() -> StationId {
    StationId(STATION.to_string())
}

fn kit() -> ResourceType {
    ThingDefId(KIT.to_string())
}

fn plan(state: &GameState, content: &GameContent) -> Result<RepairTask, PlanFailure> {
    let (agent, station) = (agent_id(), station_id());
    plan_repair(
        state,
        content,
        PlanRequest {
            agent: &agent,
            station: &station,
            immediate: false,
        },
        &mut Cooldowns::default(),
        &mut make_rng(),
        &mut PlanScratch::new(),
    )
}

/// Put the target on the station, the agent at the interaction point and
/// hand it a task that is already repairing.
fn start_repairing(state: &mut GameState, order: WorkOrder) {
    let target = order.target.clone();
    let mut task = build_task(
        state,
        order,
        Allocation::default(),
        generate_task_id(&mut make_rng()),
    )
    .unwrap();
    task.queue.clear();
    task.phase = TaskPhase::Repairing;

    let item = state.items.get_mut(&target).unwrap();
    item.position = STATION_CELL;
    state
        .reservations
        .reserve(&agent_id(), ReservationTarget::Station(station_id()));
    state
        .reservations
        .reserve(&agent_id(), ReservationTarget::Item(target));
    let agent = state.agents.get_mut(&agent_id()).unwrap();
    agent.position = INTERACTION_POINT;
    agent.task = Some(task);
}

#[test]
fn short_kit_supply_reports_missing_materials() {
    let content = base_content();
    let mut state = base_state(&content);
    state
        .stations
        .get_mut(&station_id())
        .unwrap()
        .settings
        .search_radius = 50.0;
    damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    kit_stack(&mut state, Position::new(6.0, 2.0), 10);

    let err = plan(&state, &content).unwrap_err();

    assert_eq!(err.to_string(), "missing materials");
    assert!(state.agents[&agent_id()].is_idle());
}

#[test]
fn enough_kits_build_a_two_entry_queue() {
    let content = base_content();
    let mut state = base_state(&content);
    let rifle = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    let kits = kit_stack(&mut state, Position::new(6.0, 2.0), 20);

    let task = plan(&state, &content).unwrap();

    assert_eq!(
        task.needed.to_vec(),
        vec![NeededEntry {
            resource: kit(),
            count: 12
        }]
    );
    assert_eq!(
        task.queue,
        vec![
            HaulEntry {
                item: rifle,
                resource: ThingDefId(RIFLE.to_string()),
                remaining: 1,
            },
            HaulEntry {
                item: kits.clone(),
                resource: kit(),
                remaining: 12,
            },
        ]
    );

    // Running the task takes 12 and leaves 8 behind.
    let command = test_fixtures::assign_command(&state, task);
    tick(&mut state, &[command], &content, EventLevel::Normal);
    run_ticks(&mut state, &content, 60, EventLevel::Normal);
    assert_eq!(state.items[&kits].stack_count, 8);
}

#[test]
fn timed_repair_reaches_full_hit_points() {
    let content = base_content();
    let mut state = base_state(&content);
    let target = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 100, 200);
    start_repairing(
        &mut state,
        WorkOrder {
            station: station_id(),
            target: target.clone(),
            needed: NeededQuantity::new(),
            policy: ConsumptionPolicy::None,
        },
    );

    run_ticks(&mut state, &content, 60 * 100, EventLevel::Normal);

    let item = &state.items[&target];
    assert_eq!(item.hit_points, item.max_hit_points);
    let task = state.agents[&agent_id()].task.as_ref().unwrap();
    assert_eq!(task.phase, TaskPhase::Dropping { destination: None });
    assert_eq!(task.progress.repaired, 100);
}

#[test]
fn exhausted_stock_ends_with_partial_repair() {
    let mut content = base_content();
    content.settings.repair_rate = 1.0;
    let mut state = base_state(&content);
    let target = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    // Two kits staged where twelve were planned.
    kit_stack(&mut state, STATION_CELL, 2);
    start_repairing(
        &mut state,
        WorkOrder {
            station: station_id(),
            target: target.clone(),
            needed: smallvec![NeededEntry {
                resource: kit(),
                count: 12,
            }],
            policy: ConsumptionPolicy::FixedKitCount {
                kit: kit(),
                kit_size: 5,
            },
        },
    );

    let events = run_ticks(&mut state, &content, 50, EventLevel::Normal);

    let finished: Vec<(u32, bool)> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::RepairFinished {
                hit_points,
                partial,
                ..
            } => Some((*hit_points, *partial)),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![(55, true)]);
    assert_eq!(state.items[&target].hit_points, 55);
    assert!(!events
        .iter()
        .any(|e| matches!(e.event, Event::TaskFailed { .. })));
    assert!(state.agents[&agent_id()].is_idle());
    assert!(state.reservations.claims.is_empty());
    assert!(!state.items.values().any(|item| item.def == kit()));
}
