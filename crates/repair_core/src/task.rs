//! Task builder: turns a chosen target and a fresh allocation into a
//! schedulable `RepairTask`.

use smallvec::smallvec;

use crate::station::RepairStation;
use crate::{
    Allocation, BuildError, ConsumptionPolicy, GameState, HaulEntry, ItemId, NeededQuantity,
    RepairProgress, RepairTask, ReservationTarget, StationId, TaskId, TaskPhase,
};

/// What the planner decided to repair, where, and at what cost.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrder {
    pub station: StationId,
    pub target: ItemId,
    pub needed: NeededQuantity,
    pub policy: ConsumptionPolicy,
}

/// Build a task from `order` and an allocation computed this tick.
///
/// The haul queue holds the target first, then every allocated stack in
/// allocation order. Progress starts at zero.
pub fn build_task(
    state: &GameState,
    order: WorkOrder,
    allocation: Allocation,
    id: TaskId,
) -> Result<RepairTask, BuildError> {
    let invalid = |reason| BuildError::InvalidStation {
        station: order.station.clone(),
        reason,
    };
    let station = state
        .stations
        .get(&order.station)
        .ok_or_else(|| invalid("missing"))?;
    if station.is_suspended() {
        return Err(invalid("suspended"));
    }
    if !station.usable_now() {
        return Err(invalid("unpowered"));
    }
    if station.forbidden || station.burning {
        return Err(invalid("unavailable"));
    }
    if state
        .reservations
        .holder(&ReservationTarget::Station(order.station.clone()))
        .is_some()
    {
        return Err(invalid("at capacity"));
    }

    let target = state
        .items
        .get(&order.target)
        .ok_or_else(|| BuildError::MissingTarget {
            item: order.target.clone(),
        })?;

    let mut queue = Vec::with_capacity(allocation.picks.len() + 1);
    queue.push(HaulEntry {
        item: target.id.clone(),
        resource: target.def.clone(),
        remaining: 1,
    });
    queue.extend(allocation.picks.into_iter().map(|pick| HaulEntry {
        item: pick.item,
        resource: pick.resource,
        remaining: pick.take,
    }));

    let progress = RepairProgress {
        work_counter: 0.0,
        repaired: 0,
        to_repair: target.max_hit_points.saturating_sub(target.hit_points),
        consumed: smallvec![0; order.needed.len()],
    };

    Ok(RepairTask {
        id,
        haul_to_stockpile: station.settings.haul_stockpile,
        station: order.station,
        target: order.target,
        queue,
        needed: order.needed,
        policy: order.policy,
        progress,
        phase: TaskPhase::Reserved,
        created_tick: state.meta.tick,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, damaged_item, kit_stack, RIFLE, STATION};
    use crate::{AgentId, AllocatedStack, NeededEntry, Position, ThingDefId};
    use uuid::Uuid;

    fn order(target: ItemId) -> WorkOrder {
        WorkOrder {
            station: StationId(STATION.to_string()),
            target,
            needed: smallvec![NeededEntry {
                resource: ThingDefId("repair_kit".to_string()),
                count: 12,
            }],
            policy: ConsumptionPolicy::FixedKitCount {
                kit: ThingDefId("repair_kit".to_string()),
                kit_size: 5,
            },
        }
    }

    #[test]
    fn queue_starts_with_target_then_allocation_order() {
        let content = base_content();
        let mut state = base_state(&content);
        let target = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
        let kits = kit_stack(&mut state, Position::new(6.0, 2.0), 20);
        let allocation = Allocation {
            picks: vec![AllocatedStack {
                item: kits.clone(),
                resource: ThingDefId("repair_kit".to_string()),
                take: 12,
            }],
        };

        let task = build_task(&state, order(target.clone()), allocation, TaskId(Uuid::nil())).unwrap();
        assert_eq!(task.queue.len(), 2);
        assert_eq!(task.queue[0].item, target);
        assert_eq!(task.queue[0].remaining, 1);
        assert_eq!(task.queue[1].item, kits);
        assert_eq!(task.queue[1].remaining, 12);
        assert_eq!(task.progress.to_repair, 60);
        assert_eq!(task.progress.consumed.as_slice(), &[0]);
        assert_eq!(task.phase, TaskPhase::Reserved);
    }

    #[test]
    fn suspended_station_fails_build() {
        let content = base_content();
        let mut state = base_state(&content);
        let target = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
        state
            .stations
            .get_mut(&StationId(STATION.to_string()))
            .unwrap()
            .settings
            .suspended = true;

        let err = build_task(&state, order(target), Allocation::default(), TaskId(Uuid::nil()))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidStation { reason: "suspended", .. }));
    }

    #[test]
    fn occupied_station_is_at_capacity() {
        let content = base_content();
        let mut state = base_state(&content);
        let target = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 40, 100);
        state.reservations.reserve(
            &AgentId("agent_other".to_string()),
            ReservationTarget::Station(StationId(STATION.to_string())),
        );

        let err = build_task(&state, order(target), Allocation::default(), TaskId(Uuid::nil()))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidStation { reason: "at capacity", .. }));
    }
}
