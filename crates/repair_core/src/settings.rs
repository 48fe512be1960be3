//! Process-wide repair configuration.
//!
//! Every field has a serde default so partial settings files load. Values
//! outside their valid range are corrected by [`RepairSettings::sanitize`],
//! which logs each correction and never fails.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ConsumptionPolicy, StationSettings, ThingDefId};

pub const REPAIR_RATE_RANGE: (f32, f32) = (1.0, 1200.0);
pub const HP_PER_PACK_RANGE: (u32, u32) = (1, 200);
pub const SEARCH_RADIUS_RANGE: (f32, f32) = (3.0, 999.0);
pub const SKILL_GAIN_RANGE: (f32, f32) = (0.0, 1.0);
pub const INGREDIENT_SCALING_RANGE: (f32, f32) = (0.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceMode {
    None,
    FixedKit,
    PercentageKit,
    Ingredients,
}

/// Which damaged item a station offers when several qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSearch {
    /// Collect every candidate in range and try each, nearest first, until
    /// one has enough materials.
    Exhaustive,
    /// Take the first reachable candidate and give up if it cannot be paid for.
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSettings {
    pub resource_mode: ResourceMode,
    /// Work ticks per restored hit point at work speed 1.0.
    pub repair_rate: f32,
    pub hp_per_pack: u32,
    /// With `FixedKit`, treat `hp_per_pack` as a percentage of max hit points.
    pub hp_percentage: bool,
    pub kit_def: ThingDefId,
    pub ingredient_scaling: f32,
    /// Crafting XP per tick spent repairing.
    pub skill_gain: f32,
    pub haul_to_stockpile: bool,
    pub outside_items_allowed: bool,
    pub search_radius: f32,
    pub target_search: TargetSearch,
    pub retry_cooldown_min: u64,
    pub retry_cooldown_max: u64,
    /// How far an agent will detour to merge another queued stack of the
    /// same resource into its current carry.
    pub pickup_merge_radius: f32,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            resource_mode: ResourceMode::FixedKit,
            repair_rate: 60.0,
            hp_per_pack: 5,
            hp_percentage: false,
            kit_def: ThingDefId("repair_kit".to_string()),
            ingredient_scaling: 1.0,
            skill_gain: 0.55,
            haul_to_stockpile: true,
            outside_items_allowed: true,
            search_radius: crate::DEFAULT_SEARCH_RADIUS,
            target_search: TargetSearch::Exhaustive,
            retry_cooldown_min: 500,
            retry_cooldown_max: 600,
            pickup_merge_radius: 8.0,
        }
    }
}

fn clamp_f32(name: &str, value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    let corrected = if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    };
    if corrected.to_bits() != value.to_bits() {
        warn!(setting = name, value, corrected, "setting out of range, corrected");
    }
    corrected
}

impl RepairSettings {
    /// Clamp every field into its valid range. Returns the number of
    /// corrections made.
    pub fn sanitize(&mut self) -> usize {
        let before = self.clone();
        let defaults = Self::default();

        self.repair_rate = clamp_f32(
            "repair_rate",
            self.repair_rate,
            REPAIR_RATE_RANGE,
            defaults.repair_rate,
        );
        self.search_radius = clamp_f32(
            "search_radius",
            self.search_radius,
            SEARCH_RADIUS_RANGE,
            defaults.search_radius,
        );
        self.skill_gain = clamp_f32(
            "skill_gain",
            self.skill_gain,
            SKILL_GAIN_RANGE,
            defaults.skill_gain,
        );
        self.ingredient_scaling = clamp_f32(
            "ingredient_scaling",
            self.ingredient_scaling,
            INGREDIENT_SCALING_RANGE,
            defaults.ingredient_scaling,
        );
        self.pickup_merge_radius = clamp_f32(
            "pickup_merge_radius",
            self.pickup_merge_radius,
            (0.0, f32::MAX),
            defaults.pickup_merge_radius,
        );

        let pack = self.hp_per_pack.clamp(HP_PER_PACK_RANGE.0, HP_PER_PACK_RANGE.1);
        if pack != self.hp_per_pack {
            warn!(value = self.hp_per_pack, corrected = pack, "hp_per_pack out of range, corrected");
            self.hp_per_pack = pack;
        }

        if self.retry_cooldown_min > self.retry_cooldown_max {
            warn!(
                min = self.retry_cooldown_min,
                max = self.retry_cooldown_max,
                "retry cooldown range inverted, swapping"
            );
            std::mem::swap(&mut self.retry_cooldown_min, &mut self.retry_cooldown_max);
        }

        usize::from(before.repair_rate.to_bits() != self.repair_rate.to_bits())
            + usize::from(before.search_radius.to_bits() != self.search_radius.to_bits())
            + usize::from(before.skill_gain.to_bits() != self.skill_gain.to_bits())
            + usize::from(before.ingredient_scaling.to_bits() != self.ingredient_scaling.to_bits())
            + usize::from(
                before.pickup_merge_radius.to_bits() != self.pickup_merge_radius.to_bits(),
            )
            + usize::from(before.hp_per_pack != self.hp_per_pack)
            + usize::from(before.retry_cooldown_min != self.retry_cooldown_min)
    }

    /// Consumption policy for tasks built under these settings.
    pub fn policy(&self) -> ConsumptionPolicy {
        match self.resource_mode {
            ResourceMode::None => ConsumptionPolicy::None,
            ResourceMode::FixedKit if !self.hp_percentage => ConsumptionPolicy::FixedKitCount {
                kit: self.kit_def.clone(),
                kit_size: self.hp_per_pack,
            },
            ResourceMode::FixedKit | ResourceMode::PercentageKit => {
                ConsumptionPolicy::PercentageKitCount {
                    kit: self.kit_def.clone(),
                    percentage: self.hp_per_pack,
                }
            }
            ResourceMode::Ingredients => ConsumptionPolicy::ProportionalIngredients {
                scaling: self.ingredient_scaling,
            },
        }
    }

    /// Settings for a newly built station.
    pub fn station_defaults(&self) -> StationSettings {
        StationSettings {
            search_radius: self.search_radius,
            outside_items: self.outside_items_allowed,
            haul_stockpile: self.haul_to_stockpile,
            ..StationSettings::default()
        }
    }
}

impl StationSettings {
    /// Clamp the search radius into range. Returns true when it was corrected.
    pub fn sanitize(&mut self) -> bool {
        let corrected = clamp_f32(
            "station.search_radius",
            self.search_radius,
            SEARCH_RADIUS_RANGE,
            crate::DEFAULT_SEARCH_RADIUS,
        );
        let changed = corrected.to_bits() != self.search_radius.to_bits();
        self.search_radius = corrected;
        changed
    }
}
