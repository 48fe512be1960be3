use thiserror::Error;

use crate::{ItemId, ResourceType, StationId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("insufficient {resource}: need {needed}, {available} available")]
    InsufficientResources {
        resource: ResourceType,
        needed: u32,
        available: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("station {station} cannot take work: {reason}")]
    InvalidStation {
        station: StationId,
        reason: &'static str,
    },
    #[error("repair target {item} no longer exists")]
    MissingTarget { item: ItemId },
}

/// Why an agent may not work at a station right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("unknown agent")]
    UnknownAgent,
    #[error("agent busy")]
    AgentBusy,
    #[error("unknown station")]
    UnknownStation,
    #[error("suspended")]
    Suspended,
    #[error("no power")]
    Unpowered,
    #[error("forbidden")]
    Forbidden,
    #[error("burning")]
    Burning,
    #[error("reserved by another worker")]
    StationReserved,
    #[error("no path")]
    Unreachable,
}

/// Result of a planning attempt that produced no task. None of these are
/// fatal; the scheduler simply tries again later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanFailure {
    #[error("no damaged items in range")]
    NoEligibleTarget,
    #[error("missing materials")]
    MissingMaterials(#[source] AllocError),
    #[error("waiting until tick {until}")]
    CoolingDown { until: u64 },
    #[error(transparent)]
    Ineligible(#[from] Ineligible),
    #[error(transparent)]
    InvalidStation(#[from] BuildError),
}
