//! Scheduler and tick loop together: damaged goods get repaired without any
//! manual commands.

use repair_control::{CommandSource, RepairScheduler};
use repair_core::test_fixtures::{base_content, base_state, damaged_item, kit_stack, RIFLE};
use repair_core::*;

fn run(
    state: &mut GameState,
    content: &GameContent,
    scheduler: &mut RepairScheduler,
    ticks: u64,
) -> Vec<EventEnvelope> {
    let mut next_command_id = 0u64;
    let mut events = Vec::new();
    for _ in 0..ticks {
        let commands = scheduler.generate_commands(state, content, &mut next_command_id);
        events.extend(tick(state, &commands, content, EventLevel::Normal));
    }
    events
}

#[test]
fn scheduler_repairs_everything_it_can_pay_for() {
    let content = base_content();
    let mut state = base_state(&content);
    let first = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    let second = damaged_item(&mut state, RIFLE, Position::new(8.0, 3.0), 90, 100);
    kit_stack(&mut state, Position::new(6.0, 2.0), 20);

    let mut scheduler = RepairScheduler::new(42);
    let events = run(&mut state, &content, &mut scheduler, 10_000);

    assert_eq!(state.items[&first].hit_points, 100);
    assert_eq!(state.items[&second].hit_points, 100);
    let finished = events
        .iter()
        .filter(|e| matches!(e.event, Event::RepairFinished { partial: false, .. }))
        .count();
    assert_eq!(finished, 2);
    assert!(!events
        .iter()
        .any(|e| matches!(e.event, Event::TaskFailed { .. })));
    assert!(state.agents.values().all(AgentState::is_idle));
    assert!(state.reservations.claims.is_empty());
}

#[test]
fn station_waits_out_cooldown_before_retrying() {
    let content = base_content();
    let mut state = base_state(&content);
    let rifle = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
    let station = StationId("station_0001".to_string());

    let mut scheduler = RepairScheduler::new(42);
    run(&mut state, &content, &mut scheduler, 10);
    let until = scheduler.cooldowns().active(&station, state.meta.tick).unwrap();

    // Kits show up, but nothing happens until the cooldown ends.
    kit_stack(&mut state, Position::new(6.0, 2.0), 20);
    let waiting = until - state.meta.tick;
    let events = run(&mut state, &content, &mut scheduler, waiting);
    assert!(!events
        .iter()
        .any(|e| matches!(e.event, Event::TaskAssigned { .. })));

    let events = run(&mut state, &content, &mut scheduler, 5000);
    assert!(events.iter().any(|e| matches!(
        &e.event,
        Event::TaskAssigned { target, .. } if *target == rifle
    )));
    assert_eq!(state.items[&rifle].hit_points, 100);
}

#[test]
fn same_seed_same_history() {
    let content = base_content();
    let history = || {
        let mut state = base_state(&content);
        damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
        let mut scheduler = RepairScheduler::new(7);
        run(&mut state, &content, &mut scheduler, 700);
        kit_stack(&mut state, Position::new(6.0, 2.0), 20);
        let events = run(&mut state, &content, &mut scheduler, 600);
        serde_json::to_string(&events).unwrap()
    };
    assert_eq!(history(), history());
}
