//! Reservation table: exclusive claims on items, stations and storage cells.

use crate::{AgentId, Reservation, ReservationTarget, Reservations};

impl Reservations {
    pub fn holder(&self, target: &ReservationTarget) -> Option<&AgentId> {
        self.claims
            .iter()
            .find(|claim| claim.target == *target)
            .map(|claim| &claim.agent)
    }

    /// True when nobody, or `agent` itself, holds `target`.
    pub fn can_reserve(&self, agent: &AgentId, target: &ReservationTarget) -> bool {
        self.holder(target).is_none_or(|holder| holder == agent)
    }

    pub fn is_held_by(&self, agent: &AgentId, target: &ReservationTarget) -> bool {
        self.holder(target) == Some(agent)
    }

    /// Claim `target` for `agent`. Returns false if another agent holds it.
    pub fn reserve(&mut self, agent: &AgentId, target: ReservationTarget) -> bool {
        match self.holder(&target) {
            Some(holder) => holder == agent,
            None => {
                self.claims.push(Reservation {
                    target,
                    agent: agent.clone(),
                });
                true
            }
        }
    }

    pub fn release(&mut self, agent: &AgentId, target: &ReservationTarget) {
        self.claims
            .retain(|claim| !(claim.agent == *agent && claim.target == *target));
    }

    pub fn release_all(&mut self, agent: &AgentId) {
        self.claims.retain(|claim| claim.agent != *agent);
    }

    /// Drop every claim on `target`, whoever holds it. Used when the
    /// target leaves the world.
    pub fn forget(&mut self, target: &ReservationTarget) {
        self.claims.retain(|claim| claim.target != *target);
    }
}
