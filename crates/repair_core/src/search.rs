//! Spatial candidate search over the region graph.
//!
//! Regions are walked breadth-first from the origin's region. A region is
//! entered only when the caller's `can_enter` accepts it and its bounds come
//! within the search radius of the origin.

use std::ops::ControlFlow;

use ahash::AHashSet;

use crate::graph::{traverse_regions, TraversalScratch};
use crate::{
    AgentId, CellId, GameContent, GameState, ItemId, ItemState, MapDef, NeededEntry, Position,
    RegionDef, RegionId, ReservationTarget, StationSettings, StorageCellState,
};

/// Anything with a place in the world that a search can return.
pub trait Locatable {
    type Id: Ord;

    fn id(&self) -> &Self::Id;
    fn position(&self) -> Position;
    fn region(&self) -> &RegionId;
}

impl Locatable for ItemState {
    type Id = ItemId;

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn region(&self) -> &RegionId {
        &self.region
    }
}

impl Locatable for StorageCellState {
    type Id = CellId;

    fn id(&self) -> &CellId {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn region(&self) -> &RegionId {
        &self.region
    }
}

/// Where to search and whom to sort for.
#[derive(Debug, Clone, Copy)]
pub struct SearchArea<'a> {
    pub region: &'a RegionId,
    pub origin: Position,
    pub radius: f32,
    /// Results are ordered by distance to this point.
    pub requester: Position,
}

impl SearchArea<'_> {
    fn radius_sq(&self) -> f32 {
        self.radius * self.radius
    }

    fn touches(&self, region: &RegionDef) -> bool {
        region.bounds.distance_sq_to(self.origin) <= self.radius_sq()
    }

    fn contains(&self, position: Position) -> bool {
        self.origin.distance_sq(position) <= self.radius_sq()
    }
}

fn by_requester_distance<T: Locatable>(
    requester: Position,
) -> impl Fn(&&T, &&T) -> std::cmp::Ordering {
    move |a: &&T, b: &&T| {
        requester
            .distance_sq(a.position())
            .total_cmp(&requester.distance_sq(b.position()))
            .then_with(|| a.id().cmp(b.id()))
    }
}

/// Every thing inside the area that passes `predicate`, nearest to the
/// requester first. Exhausts the bounded area; empty when nothing qualifies.
pub fn find_candidates<'s, T, I>(
    map: &MapDef,
    things: I,
    area: SearchArea<'_>,
    scratch: &mut TraversalScratch,
    mut can_enter: impl FnMut(&RegionDef) -> bool,
    mut predicate: impl FnMut(&T) -> bool,
) -> Vec<&'s T>
where
    T: Locatable + 's,
    I: IntoIterator<Item = &'s T>,
{
    let mut regions = AHashSet::new();
    let _ = traverse_regions(
        map,
        area.region,
        scratch,
        |region| area.touches(region) && can_enter(region),
        |region| {
            regions.insert(region.id.clone());
            ControlFlow::Continue(())
        },
    );

    let mut found: Vec<&T> = things
        .into_iter()
        .filter(|thing| {
            regions.contains(thing.region()) && area.contains(thing.position()) && predicate(thing)
        })
        .collect();
    found.sort_by(by_requester_distance(area.requester));
    found
}

/// Early-terminating variant: stops at the first region, in traversal order,
/// that holds a qualifying thing and returns the one nearest the requester.
pub fn closest_candidate<'s, T, I>(
    map: &MapDef,
    things: I,
    area: SearchArea<'_>,
    scratch: &mut TraversalScratch,
    mut can_enter: impl FnMut(&RegionDef) -> bool,
    mut predicate: impl FnMut(&T) -> bool,
) -> Option<&'s T>
where
    T: Locatable + 's,
    I: IntoIterator<Item = &'s T>,
    I::IntoIter: Clone,
{
    let things = things.into_iter();
    let order = by_requester_distance(area.requester);
    let mut best = None;
    let _ = traverse_regions(
        map,
        area.region,
        scratch,
        |region| area.touches(region) && can_enter(region),
        |region| {
            best = things
                .clone()
                .filter(|thing| {
                    *thing.region() == region.id
                        && area.contains(thing.position())
                        && predicate(thing)
                })
                .min_by(|a, b| order(a, b));
            if best.is_some() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        },
    );
    best
}

/// Damaged items `agent` could repair at a station with `settings`.
pub fn repairable_target<'a>(
    state: &'a GameState,
    content: &'a GameContent,
    agent: &'a AgentId,
    settings: &'a StationSettings,
) -> impl Fn(&ItemState) -> bool + 'a {
    move |item| {
        item.is_damaged()
            && item.spawned
            && item.holder.is_none()
            && !item.forbidden
            && !item.burning
            && settings.target_filter.allows(item, content)
            && state
                .reservations
                .can_reserve(agent, &ReservationTarget::Item(item.id.clone()))
            && (settings.outside_items
                || content.region(&item.region).is_some_and(|r| r.roofed))
    }
}

/// Undamaged stacks of any needed resource that `agent` may take.
pub fn usable_ingredient<'a>(
    state: &'a GameState,
    content: &'a GameContent,
    agent: &'a AgentId,
    settings: &'a StationSettings,
    needed: &'a [NeededEntry],
) -> impl Fn(&ItemState) -> bool + 'a {
    move |item| {
        needed.iter().any(|entry| entry.resource == item.def)
            && crate::inventory::is_available(item)
            && item.hit_points == item.max_hit_points
            && !item.forbidden
            && !item.burning
            && settings.ingredient_filter.allows(item, content)
            && state
                .reservations
                .can_reserve(agent, &ReservationTarget::Item(item.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        base_content, base_state, damaged_item, spawn_item, AGENT, HOME, RIFLE, STATION, YARD,
    };
    use crate::StationId;

    fn home_area(home: &RegionId, radius: f32) -> SearchArea<'_> {
        SearchArea {
            region: home,
            origin: Position::new(2.0, 2.0),
            radius,
            requester: Position::new(2.0, 2.0),
        }
    }

    #[test]
    fn results_are_sorted_by_distance() {
        let content = base_content();
        let mut state = base_state(&content);
        let far = damaged_item(&mut state, RIFLE, Position::new(15.0, 2.0), 50, 100);
        let near = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 50, 100);
        let home = RegionId(HOME.to_string());
        let mut scratch = TraversalScratch::new();

        let found = find_candidates(
            &content.map,
            state.items.values(),
            home_area(&home, 100.0),
            &mut scratch,
            |_| true,
            |item: &ItemState| item.is_damaged(),
        );
        let ids: Vec<&ItemId> = found.iter().map(|i| &i.id).collect();
        assert_eq!(ids, vec![&near, &far]);
    }

    #[test]
    fn items_beyond_radius_are_skipped() {
        let content = base_content();
        let mut state = base_state(&content);
        damaged_item(&mut state, RIFLE, Position::new(15.0, 2.0), 50, 100);
        let home = RegionId(HOME.to_string());
        let mut scratch = TraversalScratch::new();

        let found = find_candidates(
            &content.map,
            state.items.values(),
            home_area(&home, 5.0),
            &mut scratch,
            |_| true,
            |_: &ItemState| true,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn blocked_regions_are_pruned() {
        let content = base_content();
        let mut state = base_state(&content);
        damaged_item(&mut state, RIFLE, Position::new(25.0, 2.0), 50, 100);
        let home = RegionId(HOME.to_string());
        let mut scratch = TraversalScratch::new();

        let found = find_candidates(
            &content.map,
            state.items.values(),
            home_area(&home, 100.0),
            &mut scratch,
            |region| region.id.0 != YARD,
            |_: &ItemState| true,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn closest_stops_at_first_region_with_a_match() {
        let content = base_content();
        let mut state = base_state(&content);
        let inside = damaged_item(&mut state, RIFLE, Position::new(18.0, 2.0), 50, 100);
        spawn_item(&mut state, RIFLE, Position::new(21.0, 2.0), YARD, 50, 100, 1);
        let home = RegionId(HOME.to_string());
        let mut scratch = TraversalScratch::new();

        let found = closest_candidate(
            &content.map,
            state.items.values(),
            home_area(&home, 100.0),
            &mut scratch,
            |_| true,
            |item: &ItemState| item.is_damaged(),
        );
        assert_eq!(found.map(|i| &i.id), Some(&inside));
    }

    #[test]
    fn full_hit_point_items_are_never_targets() {
        let content = base_content();
        let mut state = base_state(&content);
        damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 100, 100);
        let station = state.stations[&StationId(STATION.to_string())].clone();
        let agent = AgentId(AGENT.to_string());
        let home = RegionId(HOME.to_string());
        let mut scratch = TraversalScratch::new();

        let found = find_candidates(
            &content.map,
            state.items.values(),
            home_area(&home, 100.0),
            &mut scratch,
            |_| true,
            repairable_target(&state, &content, &agent, &station.settings),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn outdoor_items_respect_station_setting() {
        let content = base_content();
        let mut state = base_state(&content);
        spawn_item(&mut state, RIFLE, Position::new(21.0, 2.0), YARD, 50, 100, 1);
        let mut settings = state.stations[&StationId(STATION.to_string())]
            .settings
            .clone();
        let agent = AgentId(AGENT.to_string());
        let item = state.items.values().next().unwrap().clone();

        assert!(repairable_target(&state, &content, &agent, &settings)(&item));
        settings.outside_items = false;
        assert!(!repairable_target(&state, &content, &agent, &settings)(&item));
    }

    #[test]
    fn reserved_and_forbidden_items_are_excluded() {
        let content = base_content();
        let mut state = base_state(&content);
        let a = damaged_item(&mut state, RIFLE, Position::new(4.0, 2.0), 50, 100);
        let b = damaged_item(&mut state, RIFLE, Position::new(5.0, 2.0), 50, 100);
        state.items.get_mut(&a).unwrap().forbidden = true;
        state.reservations.reserve(
            &AgentId("agent_other".to_string()),
            ReservationTarget::Item(b.clone()),
        );
        let settings = StationSettings::default();
        let agent = AgentId(AGENT.to_string());
        let check = repairable_target(&state, &content, &agent, &settings);
        assert!(!check(&state.items[&a]));
        assert!(!check(&state.items[&b]));
    }
}
