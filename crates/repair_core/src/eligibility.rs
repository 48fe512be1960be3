use crate::graph::{region_reachable, TraversalScratch};
use crate::station::RepairStation;
use crate::{AgentId, GameContent, GameState, Ineligible, ReservationTarget, StationId};

/// Preconditions for `agent` to start work at `station`, checked before any
/// search runs. Stations host one worker at a time.
pub fn check_eligibility(
    state: &GameState,
    content: &GameContent,
    agent_id: &AgentId,
    station_id: &StationId,
    scratch: &mut TraversalScratch,
) -> Result<(), Ineligible> {
    let agent = state.agents.get(agent_id).ok_or(Ineligible::UnknownAgent)?;
    if !agent.is_idle() {
        return Err(Ineligible::AgentBusy);
    }
    let station = state
        .stations
        .get(station_id)
        .ok_or(Ineligible::UnknownStation)?;
    if station.is_suspended() {
        return Err(Ineligible::Suspended);
    }
    if !station.usable_now() {
        return Err(Ineligible::Unpowered);
    }
    if station.forbidden {
        return Err(Ineligible::Forbidden);
    }
    if station.burning {
        return Err(Ineligible::Burning);
    }
    if !state
        .reservations
        .can_reserve(agent_id, &ReservationTarget::Station(station_id.clone()))
    {
        return Err(Ineligible::StationReserved);
    }
    if !region_reachable(
        &content.map,
        &agent.region,
        &station.region,
        agent.max_danger,
        scratch,
    ) {
        return Err(Ineligible::Unreachable);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, AGENT, CELLAR, STATION};
    use crate::PowerState;

    fn ids() -> (AgentId, StationId) {
        (AgentId(AGENT.to_string()), StationId(STATION.to_string()))
    }

    fn check(state: &GameState, content: &GameContent) -> Result<(), Ineligible> {
        let (agent, station) = ids();
        check_eligibility(state, content, &agent, &station, &mut TraversalScratch::new())
    }

    #[test]
    fn idle_agent_at_working_station_is_eligible() {
        let content = base_content();
        let state = base_state(&content);
        assert_eq!(check(&state, &content), Ok(()));
    }

    #[test]
    fn suspended_station_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        let (_, station) = ids();
        state.stations.get_mut(&station).unwrap().settings.suspended = true;
        assert_eq!(check(&state, &content), Err(Ineligible::Suspended));
    }

    #[test]
    fn unpowered_station_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        let (_, station) = ids();
        state.stations.get_mut(&station).unwrap().power = Some(PowerState {
            powered: false,
            unpowered_speed_factor: 0.0,
        });
        assert_eq!(check(&state, &content), Err(Ineligible::Unpowered));
    }

    #[test]
    fn station_held_by_other_agent_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        let (_, station) = ids();
        state.reservations.reserve(
            &AgentId("agent_other".to_string()),
            ReservationTarget::Station(station),
        );
        assert_eq!(check(&state, &content), Err(Ineligible::StationReserved));
    }

    #[test]
    fn station_in_dangerous_region_is_unreachable() {
        let content = base_content();
        let mut state = base_state(&content);
        let (agent, station) = ids();
        state.stations.get_mut(&station).unwrap().region = crate::RegionId(CELLAR.to_string());
        assert_eq!(check(&state, &content), Err(Ineligible::Unreachable));

        state.agents.get_mut(&agent).unwrap().max_danger = 5;
        assert_eq!(check(&state, &content), Ok(()));
    }
}
