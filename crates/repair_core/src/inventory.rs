//! Item operations: splitting, merging, carrying, placing and consuming stacks.
//!
//! Every function re-reads the item from `GameState` and returns `None` or
//! zero when it has gone, so callers never act on a stale stack.

use crate::{
    AgentId, GameContent, GameState, ItemId, ItemState, Position, RegionId, ReservationTarget,
    ResourceType,
};

/// Allocate the next `item_NNNNN` id.
pub fn next_item_id(state: &mut GameState) -> ItemId {
    let id = ItemId(format!("item_{:05}", state.counters.next_item_id));
    state.counters.next_item_id += 1;
    id
}

/// Live, on the map, and not in anyone's hands.
pub fn is_available(item: &ItemState) -> bool {
    item.spawned && item.holder.is_none() && item.stack_count > 0
}

/// Both stacks hold the same undamaged resource and may be merged.
pub fn can_stack_with(a: &ItemState, b: &ItemState, content: &GameContent) -> bool {
    a.def == b.def
        && a.hit_points == a.max_hit_points
        && b.hit_points == b.max_hit_points
        && content.def(&a.def).is_some_and(|def| def.stack_limit > 1)
}

/// Split `count` units off `item_id` into a new stack at the same spot.
/// Taking the whole stack returns the original id.
pub fn split_off(state: &mut GameState, item_id: &ItemId, count: u32) -> Option<ItemId> {
    let item = state.items.get(item_id)?;
    if count == 0 {
        return None;
    }
    if count >= item.stack_count {
        return Some(item_id.clone());
    }
    let mut piece = item.clone();
    let new_id = next_item_id(state);
    piece.id = new_id.clone();
    piece.stack_count = count;
    if let Some(item) = state.items.get_mut(item_id) {
        item.stack_count -= count;
    }
    state.items.insert(new_id.clone(), piece);
    Some(new_id)
}

/// Remove an item from the world along with any claims on it.
pub fn destroy(state: &mut GameState, item_id: &ItemId) -> Option<ItemState> {
    let removed = state.items.remove(item_id)?;
    state
        .reservations
        .forget(&ReservationTarget::Item(item_id.clone()));
    for cell in state.storage.values_mut() {
        if cell.occupant.as_ref() == Some(item_id) {
            cell.occupant = None;
        }
    }
    for agent in state.agents.values_mut() {
        if agent.carried.as_ref() == Some(item_id) {
            agent.carried = None;
        }
    }
    Some(removed)
}

/// Merge `from` into `into`, destroying `from`.
pub fn absorb(state: &mut GameState, into: &ItemId, from: &ItemId) -> bool {
    let Some(count) = state.items.get(from).map(|item| item.stack_count) else {
        return false;
    };
    let Some(target) = state.items.get_mut(into) else {
        return false;
    };
    target.stack_count += count;
    destroy(state, from);
    true
}

/// Pick up `count` units of `item_id`. When the agent already carries a
/// compatible stack the new units are merged into it. Returns the id of the
/// carried stack.
pub fn pick_up(
    state: &mut GameState,
    content: &GameContent,
    agent_id: &AgentId,
    item_id: &ItemId,
    count: u32,
) -> Option<ItemId> {
    let carried = state.agents.get(agent_id)?.carried.clone();
    if let Some(carried_id) = &carried {
        let compatible = match (state.items.get(carried_id), state.items.get(item_id)) {
            (Some(held), Some(source)) => can_stack_with(held, source, content),
            _ => false,
        };
        if !compatible {
            return None;
        }
    }
    let piece = split_off(state, item_id, count)?;

    for cell in state.storage.values_mut() {
        if cell.occupant.as_ref() == Some(&piece) {
            cell.occupant = None;
        }
    }

    if let Some(carried_id) = carried {
        absorb(state, &carried_id, &piece);
        return Some(carried_id);
    }

    let item = state.items.get_mut(&piece)?;
    item.spawned = false;
    item.holder = Some(agent_id.clone());
    if let Some(agent) = state.agents.get_mut(agent_id) {
        agent.carried = Some(piece.clone());
    }
    Some(piece)
}

/// Put the carried stack down at `position`. Returns its id.
pub fn place_carried(
    state: &mut GameState,
    agent_id: &AgentId,
    position: Position,
    region: &RegionId,
) -> Option<ItemId> {
    let item_id = state.agents.get_mut(agent_id)?.carried.take()?;
    let item = state.items.get_mut(&item_id)?;
    item.spawned = true;
    item.holder = None;
    item.position = position;
    item.region = region.clone();
    Some(item_id)
}

/// Consume up to `units` of `resource` from stacks lying on any of `cells`
/// in `region`. Stacks are drawn in id order; a stack that runs out is
/// destroyed. Returns the number of units actually consumed.
pub fn consume_at(
    state: &mut GameState,
    cells: &[Position],
    region: &RegionId,
    resource: &ResourceType,
    units: u32,
) -> u32 {
    let mut stacks: Vec<ItemId> = state
        .items
        .values()
        .filter(|item| {
            item.def == *resource
                && item.region == *region
                && is_available(item)
                && cells.iter().any(|cell| cell.same_spot(item.position))
        })
        .map(|item| item.id.clone())
        .collect();
    stacks.sort();

    let mut remaining = units;
    for stack_id in stacks {
        if remaining == 0 {
            break;
        }
        let Some(count) = state.items.get(&stack_id).map(|item| item.stack_count) else {
            continue;
        };
        if count <= remaining {
            remaining -= count;
            destroy(state, &stack_id);
        } else if let Some(item) = state.items.get_mut(&stack_id) {
            item.stack_count -= remaining;
            remaining = 0;
        }
    }
    units - remaining
}
