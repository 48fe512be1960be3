//! Greedy no-mix allocation of resource stacks to a needed quantity.
//!
//! Each needed entry is filled only from stacks of its own resource type,
//! walking stacks in the order given. Callers sort by distance first when
//! nearer stacks should win. Either every entry is satisfied or nothing is
//! returned.

use ahash::{AHashMap, AHashSet};

use crate::{AllocError, AllocatedStack, Allocation, ItemId, NeededEntry, ResourceType};

/// A snapshot of one available stack, valid only for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackView {
    pub item: ItemId,
    pub resource: ResourceType,
    pub count: u32,
}

/// Caller-owned working buffers, cleared on every call.
#[derive(Debug, Default)]
pub struct AllocScratch {
    totals: AHashMap<ResourceType, u32>,
    used: AHashSet<ItemId>,
}

impl AllocScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn allocate(
    available: &[StackView],
    needed: &[NeededEntry],
    scratch: &mut AllocScratch,
) -> Result<Allocation, AllocError> {
    scratch.totals.clear();
    scratch.used.clear();
    for stack in available {
        *scratch.totals.entry(stack.resource.clone()).or_insert(0) += stack.count;
    }

    let mut picks = Vec::new();
    for entry in needed {
        let total = scratch.totals.get(&entry.resource).copied().unwrap_or(0);
        if total < entry.count {
            return Err(AllocError::InsufficientResources {
                resource: entry.resource.clone(),
                needed: entry.count,
                available: total,
            });
        }

        let mut remaining = entry.count;
        let mut spent = 0;
        for stack in available {
            if remaining == 0 {
                break;
            }
            if stack.resource != entry.resource || stack.count == 0 {
                continue;
            }
            if !scratch.used.insert(stack.item.clone()) {
                continue;
            }
            let take = remaining.min(stack.count);
            remaining -= take;
            spent += stack.count;
            picks.push(AllocatedStack {
                item: stack.item.clone(),
                resource: stack.resource.clone(),
                take,
            });
        }

        // A duplicate stack id in the input can leave the walk short even
        // though the aggregate looked sufficient.
        if remaining > 0 {
            return Err(AllocError::InsufficientResources {
                resource: entry.resource.clone(),
                needed: entry.count,
                available: entry.count - remaining,
            });
        }
        if let Some(total) = scratch.totals.get_mut(&entry.resource) {
            *total = total.saturating_sub(spent);
        }
    }

    Ok(Allocation { picks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThingDefId;

    fn res(id: &str) -> ResourceType {
        ThingDefId(id.to_string())
    }

    fn stack(id: &str, resource: &str, count: u32) -> StackView {
        StackView {
            item: ItemId(id.to_string()),
            resource: res(resource),
            count,
        }
    }

    fn need(resource: &str, count: u32) -> NeededEntry {
        NeededEntry {
            resource: res(resource),
            count,
        }
    }

    #[test]
    fn takes_from_nearest_stacks_first() {
        let available = [stack("a", "kit", 5), stack("b", "kit", 10), stack("c", "kit", 10)];
        let allocation =
            allocate(&available, &[need("kit", 12)], &mut AllocScratch::new()).unwrap();
        let takes: Vec<(&str, u32)> = allocation
            .picks
            .iter()
            .map(|p| (p.item.0.as_str(), p.take))
            .collect();
        assert_eq!(takes, vec![("a", 5), ("b", 7)]);
    }

    #[test]
    fn insufficient_total_fails_without_picks() {
        let available = [stack("a", "kit", 10)];
        let err = allocate(&available, &[need("kit", 12)], &mut AllocScratch::new()).unwrap_err();
        assert_eq!(
            err,
            AllocError::InsufficientResources {
                resource: res("kit"),
                needed: 12,
                available: 10,
            }
        );
    }

    #[test]
    fn later_entry_failure_discards_earlier_picks() {
        let available = [stack("a", "steel", 50), stack("b", "component", 1)];
        let result = allocate(
            &available,
            &[need("steel", 15), need("component", 2)],
            &mut AllocScratch::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn never_substitutes_across_types() {
        let available = [stack("a", "steel", 100), stack("b", "plasteel", 100)];
        let allocation = allocate(
            &available,
            &[need("plasteel", 3)],
            &mut AllocScratch::new(),
        )
        .unwrap();
        assert_eq!(allocation.picks.len(), 1);
        assert_eq!(allocation.picks[0].item, ItemId("b".to_string()));
    }

    #[test]
    fn empty_need_allocates_nothing() {
        let allocation = allocate(&[stack("a", "kit", 3)], &[], &mut AllocScratch::new()).unwrap();
        assert!(allocation.picks.is_empty());
    }

    #[test]
    fn duplicate_stack_ids_are_counted_once() {
        let available = [stack("a", "kit", 5), stack("a", "kit", 5)];
        let result = allocate(&available, &[need("kit", 8)], &mut AllocScratch::new());
        assert!(result.is_err());
    }

    #[test]
    fn scratch_reuse_does_not_leak_between_calls() {
        let mut scratch = AllocScratch::new();
        let available = [stack("a", "kit", 5)];
        let first = allocate(&available, &[need("kit", 5)], &mut scratch).unwrap();
        let second = allocate(&available, &[need("kit", 5)], &mut scratch).unwrap();
        assert_eq!(first, second);
    }
}
