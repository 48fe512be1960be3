//! Resource cost of a repair and the consumption schedule that pays for it.
//!
//! Pure functions: the same target and policy always yield the same result.

use smallvec::SmallVec;
use tracing::warn;

use crate::{
    ConsumptionPolicy, ItemState, NeededEntry, NeededQuantity, RepairProgress, ResourceType,
};

/// Hit points restored per kit, or `None` for policies without kits.
/// Never returns zero.
pub fn kit_size(policy: &ConsumptionPolicy, max_hit_points: u32) -> Option<u32> {
    match policy {
        ConsumptionPolicy::FixedKitCount { kit_size, .. } => Some((*kit_size).max(1)),
        ConsumptionPolicy::PercentageKitCount { percentage, .. } => {
            Some(percentage_kit_size(max_hit_points, *percentage).max(1))
        }
        ConsumptionPolicy::None | ConsumptionPolicy::ProportionalIngredients { .. } => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn percentage_kit_size(max_hit_points: u32, percentage: u32) -> u32 {
    (u64::from(max_hit_points) * u64::from(percentage) / 100) as u32
}

/// Resources needed to bring `target` back to full hit points.
///
/// `build_cost` is the target's canonical build cost; only the ingredients
/// policy reads it. Zero-count entries are dropped and repeated resource
/// types are merged into one entry.
pub fn compute_cost(
    target: &ItemState,
    build_cost: &[(ResourceType, u32)],
    policy: &ConsumptionPolicy,
) -> NeededQuantity {
    let missing = target.max_hit_points.saturating_sub(target.hit_points);
    let mut needed = NeededQuantity::new();
    if missing == 0 {
        return needed;
    }

    match policy {
        ConsumptionPolicy::None => {}
        ConsumptionPolicy::FixedKitCount { kit, .. }
        | ConsumptionPolicy::PercentageKitCount { kit, .. } => {
            if let ConsumptionPolicy::PercentageKitCount { percentage, .. } = policy {
                if percentage_kit_size(target.max_hit_points, *percentage) == 0 {
                    warn!(
                        item = %target.id,
                        max_hit_points = target.max_hit_points,
                        percentage,
                        "percentage kit size rounds to zero, using 1 hit point per kit"
                    );
                }
            }
            let size = kit_size(policy, target.max_hit_points).unwrap_or(1);
            push_entry(&mut needed, kit, missing / size);
        }
        ConsumptionPolicy::ProportionalIngredients { scaling } => {
            for (resource, count) in build_cost {
                push_entry(
                    &mut needed,
                    resource,
                    scaled_count(*count, missing, target.max_hit_points, *scaling),
                );
            }
        }
    }
    needed
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_count(count: u32, missing: u32, max_hit_points: u32, scaling: f32) -> u32 {
    if max_hit_points == 0 || scaling <= 0.0 {
        return 0;
    }
    let exact =
        f64::from(count) * f64::from(missing) * f64::from(scaling) / f64::from(max_hit_points);
    exact.floor().min(f64::from(u32::MAX)) as u32
}

fn push_entry(needed: &mut NeededQuantity, resource: &ResourceType, count: u32) {
    if count == 0 {
        return;
    }
    if let Some(entry) = needed.iter_mut().find(|e| e.resource == *resource) {
        entry.count += count;
    } else {
        needed.push(NeededEntry {
            resource: resource.clone(),
            count,
        });
    }
}

/// Total units of each needed entry owed after `progress.repaired` points.
///
/// Kit policies owe one kit per `kit_size` points; the ingredients policy
/// owes `floor(count * repaired / to_repair)`. Neither ever exceeds the
/// entry's count.
pub fn consumption_due(
    policy: &ConsumptionPolicy,
    needed: &[NeededEntry],
    progress: &RepairProgress,
    max_hit_points: u32,
) -> SmallVec<[u32; 4]> {
    needed
        .iter()
        .map(|entry| {
            let owed = match policy {
                ConsumptionPolicy::None => 0,
                ConsumptionPolicy::FixedKitCount { .. }
                | ConsumptionPolicy::PercentageKitCount { .. } => {
                    progress.repaired / kit_size(policy, max_hit_points).unwrap_or(1)
                }
                ConsumptionPolicy::ProportionalIngredients { .. } => {
                    proportional_due(entry.count, progress.repaired, progress.to_repair)
                }
            };
            owed.min(entry.count)
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn proportional_due(count: u32, repaired: u32, to_repair: u32) -> u32 {
    if to_repair == 0 {
        return count;
    }
    (u64::from(count) * u64::from(repaired) / u64::from(to_repair)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemId, Position, RegionId, ThingDefId};
    use smallvec::smallvec;

    fn kit() -> ResourceType {
        ThingDefId("repair_kit".to_string())
    }

    fn item(hp: u32, max: u32) -> ItemState {
        ItemState {
            id: ItemId("item_test".to_string()),
            def: ThingDefId("rifle".to_string()),
            position: Position::default(),
            region: RegionId("region_home".to_string()),
            hit_points: hp,
            max_hit_points: max,
            stack_count: 1,
            spawned: true,
            forbidden: false,
            burning: false,
            holder: None,
        }
    }

    fn fixed(kit_size: u32) -> ConsumptionPolicy {
        ConsumptionPolicy::FixedKitCount { kit: kit(), kit_size }
    }

    fn progress(repaired: u32, to_repair: u32) -> RepairProgress {
        RepairProgress {
            work_counter: 0.0,
            repaired,
            to_repair,
            consumed: smallvec![0],
        }
    }

    #[test]
    fn fixed_kits_floor_missing_over_kit_size() {
        let needed = compute_cost(&item(70, 100), &[], &fixed(5));
        assert_eq!(needed.as_slice(), &[NeededEntry { resource: kit(), count: 6 }]);

        let needed = compute_cost(&item(40, 100), &[], &fixed(5));
        assert_eq!(needed[0].count, 12);
    }

    #[test]
    fn small_damage_needs_no_kits() {
        assert!(compute_cost(&item(98, 100), &[], &fixed(5)).is_empty());
    }

    #[test]
    fn full_hit_points_cost_nothing() {
        assert!(compute_cost(&item(100, 100), &[], &fixed(5)).is_empty());
    }

    #[test]
    fn none_policy_costs_nothing() {
        assert!(compute_cost(&item(10, 100), &[], &ConsumptionPolicy::None).is_empty());
    }

    #[test]
    fn percentage_kits_derive_size_from_max_hit_points() {
        let policy = ConsumptionPolicy::PercentageKitCount {
            kit: kit(),
            percentage: 10,
        };
        // 10% of 200 = 20 points per kit; 100 missing.
        let needed = compute_cost(&item(100, 200), &[], &policy);
        assert_eq!(needed[0].count, 5);
    }

    #[test]
    fn zero_percentage_kit_size_falls_back_to_one() {
        let policy = ConsumptionPolicy::PercentageKitCount {
            kit: kit(),
            percentage: 5,
        };
        // 5% of 10 rounds to zero.
        assert_eq!(kit_size(&policy, 10), Some(1));
        let needed = compute_cost(&item(7, 10), &[], &policy);
        assert_eq!(needed[0].count, 3);
    }

    #[test]
    fn ingredients_scale_by_damage_ratio() {
        let steel = ThingDefId("steel".to_string());
        let component = ThingDefId("component".to_string());
        let build_cost = vec![(steel.clone(), 50), (component, 2)];
        let policy = ConsumptionPolicy::ProportionalIngredients { scaling: 1.0 };

        let needed = compute_cost(&item(70, 100), &build_cost, &policy);
        // 2 * 0.3 floors to zero and is dropped.
        assert_eq!(needed.as_slice(), &[NeededEntry { resource: steel, count: 15 }]);
    }

    #[test]
    fn ingredient_scaling_applies() {
        let steel = ThingDefId("steel".to_string());
        let policy = ConsumptionPolicy::ProportionalIngredients { scaling: 0.5 };
        let needed = compute_cost(&item(40, 100), &[(steel, 50)], &policy);
        assert_eq!(needed[0].count, 15);
    }

    #[test]
    fn kit_due_follows_milestones() {
        let needed = [NeededEntry { resource: kit(), count: 6 }];
        let policy = fixed(5);
        assert_eq!(consumption_due(&policy, &needed, &progress(4, 30), 100)[0], 0);
        assert_eq!(consumption_due(&policy, &needed, &progress(5, 30), 100)[0], 1);
        assert_eq!(consumption_due(&policy, &needed, &progress(30, 30), 100)[0], 6);
        // Never more than was allocated.
        assert_eq!(consumption_due(&policy, &needed, &progress(40, 30), 100)[0], 6);
    }

    #[test]
    fn ingredient_due_is_proportional() {
        let needed = [NeededEntry {
            resource: ThingDefId("steel".to_string()),
            count: 15,
        }];
        let policy = ConsumptionPolicy::ProportionalIngredients { scaling: 1.0 };
        assert_eq!(consumption_due(&policy, &needed, &progress(1, 30), 100)[0], 0);
        assert_eq!(consumption_due(&policy, &needed, &progress(2, 30), 100)[0], 1);
        assert_eq!(consumption_due(&policy, &needed, &progress(15, 30), 100)[0], 7);
        assert_eq!(consumption_due(&policy, &needed, &progress(30, 30), 100)[0], 15);
    }
}
