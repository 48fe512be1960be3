use std::collections::VecDeque;
use std::ops::ControlFlow;

use ahash::AHashSet;

use crate::{MapDef, RegionDef, RegionId};

/// Reusable buffers for region traversal. Owned by the caller so repeated
/// searches don't share hidden state.
#[derive(Debug, Default)]
pub struct TraversalScratch {
    visited: AHashSet<RegionId>,
    queue: VecDeque<RegionId>,
}

impl TraversalScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.visited.clear();
        self.queue.clear();
    }
}

/// Breadth-first walk of the region graph starting at `start`.
///
/// The start region is always visited. A neighbour is entered only when
/// `can_enter` accepts it. `visit` may stop the walk early by returning
/// `ControlFlow::Break`, which is passed back to the caller.
pub fn traverse_regions(
    map: &MapDef,
    start: &RegionId,
    scratch: &mut TraversalScratch,
    mut can_enter: impl FnMut(&RegionDef) -> bool,
    mut visit: impl FnMut(&RegionDef) -> ControlFlow<()>,
) -> ControlFlow<()> {
    scratch.reset();
    if !map.regions.iter().any(|r| r.id == *start) {
        return ControlFlow::Continue(());
    }
    scratch.visited.insert(start.clone());
    scratch.queue.push_back(start.clone());

    while let Some(current) = scratch.queue.pop_front() {
        let Some(region) = map.regions.iter().find(|r| r.id == current) else {
            continue;
        };
        visit(region)?;

        for (a, b) in &map.edges {
            let neighbor = if *a == current {
                b
            } else if *b == current {
                a
            } else {
                continue;
            };
            if scratch.visited.contains(neighbor) {
                continue;
            }
            let Some(next) = map.regions.iter().find(|r| r.id == *neighbor) else {
                continue;
            };
            if can_enter(next) {
                scratch.visited.insert(neighbor.clone());
                scratch.queue.push_back(neighbor.clone());
            }
        }
    }
    ControlFlow::Continue(())
}

/// True when `to` can be reached from `from` through regions no more
/// dangerous than `max_danger`.
pub fn region_reachable(
    map: &MapDef,
    from: &RegionId,
    to: &RegionId,
    max_danger: u8,
    scratch: &mut TraversalScratch,
) -> bool {
    if from == to {
        return map.regions.iter().any(|r| r.id == *from);
    }
    traverse_regions(
        map,
        from,
        scratch,
        |region| region.danger <= max_danger,
        |region| {
            if region.id == *to {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        },
    )
    .is_break()
}
