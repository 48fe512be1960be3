//! Station capability interface. The engine never inspects concrete station
//! kinds; it asks these questions instead.

use crate::{Position, RegionId, StationState};

pub trait RepairStation {
    fn region(&self) -> &RegionId;
    /// Can host work this tick (power permitting).
    fn usable_now(&self) -> bool;
    /// Multiplier on the agent's work speed. Zero when unusable.
    fn work_speed_factor(&self) -> f32;
    /// Cells where hauled ingredients and the target are staged.
    fn ingredient_cells(&self) -> &[Position];
    fn interaction_point(&self) -> Position;
    fn is_suspended(&self) -> bool;

    /// Where hauled things are put down. Falls back to the interaction point
    /// for stations without cells.
    fn staging_cell(&self) -> Position {
        self.ingredient_cells()
            .first()
            .copied()
            .unwrap_or_else(|| self.interaction_point())
    }
}

impl RepairStation for StationState {
    fn region(&self) -> &RegionId {
        &self.region
    }

    fn usable_now(&self) -> bool {
        self.power
            .is_none_or(|power| power.powered || power.unpowered_speed_factor > 0.0)
    }

    fn work_speed_factor(&self) -> f32 {
        if !self.usable_now() {
            return 0.0;
        }
        let power_factor = match self.power {
            Some(power) if !power.powered => power.unpowered_speed_factor,
            _ => 1.0,
        };
        (power_factor + self.facility_speed_offset).max(0.0)
    }

    fn ingredient_cells(&self) -> &[Position] {
        &self.cells
    }

    fn interaction_point(&self) -> Position {
        self.interaction_point
    }

    fn is_suspended(&self) -> bool {
        self.settings.suspended
    }
}
