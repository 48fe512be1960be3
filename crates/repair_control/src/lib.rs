use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use repair_core::{
    plan_repair, AgentId, Command, CommandEnvelope, CommandId, Cooldowns, GameContent, GameState,
    PlanFailure, PlanRequest, PlanScratch, RepairTask, StationId,
};
use serde::Serialize;
use tracing::{debug, info};

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

/// Hands out repair work:
/// 1. Every idle agent, in id order, looks at the stations nearest first.
/// 2. The first station that yields a plan gets the agent; one agent per
///    station per tick.
/// 3. Stations that ran out of materials cool down before the next attempt.
pub struct RepairScheduler {
    cooldowns: Cooldowns,
    rng: ChaCha8Rng,
    last_failure: HashMap<StationId, PlanFailure>,
    scratch: PlanScratch,
}

/// What a station is waiting on, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationStatus {
    pub station_id: StationId,
    pub last_failure: Option<String>,
    pub cooldown_until: Option<u64>,
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Allocates a command ID and builds a `CommandEnvelope`.
fn make_cmd(tick: u64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

fn assign_cmd(tick: u64, next_id: &mut u64, agent_id: AgentId, task: RepairTask) -> CommandEnvelope {
    make_cmd(
        tick,
        next_id,
        Command::AssignRepairTask {
            agent_id,
            task: Box::new(task),
        },
    )
}

/// Returns idle agents sorted by ID for determinism.
fn collect_idle_agents(state: &GameState) -> Vec<AgentId> {
    let mut agents: Vec<AgentId> = state
        .agents
        .values()
        .filter(|agent| agent.is_idle())
        .map(|agent| agent.id.clone())
        .collect();
    agents.sort();
    agents
}

/// Stations ordered by distance from the agent, then by ID.
fn stations_by_distance(state: &GameState, agent_id: &AgentId) -> Vec<StationId> {
    let Some(agent) = state.agents.get(agent_id) else {
        return Vec::new();
    };
    let mut stations: Vec<(f32, &StationId)> = state
        .stations
        .values()
        .map(|station| (agent.position.distance_sq(station.position), &station.id))
        .collect();
    stations.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    stations.into_iter().map(|(_, id)| id.clone()).collect()
}

// ---------------------------------------------------------------------------
// RepairScheduler
// ---------------------------------------------------------------------------

impl RepairScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            cooldowns: Cooldowns::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_failure: HashMap::new(),
            scratch: PlanScratch::new(),
        }
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    /// Why the station's last planning attempt produced nothing, if it did.
    pub fn last_failure(&self, station: &StationId) -> Option<&PlanFailure> {
        self.last_failure.get(station)
    }

    /// One entry per station, sorted by ID.
    pub fn station_status(&self, state: &GameState) -> Vec<StationStatus> {
        let mut status: Vec<StationStatus> = state
            .stations
            .keys()
            .map(|id| StationStatus {
                station_id: id.clone(),
                last_failure: self.last_failure.get(id).map(ToString::to_string),
                cooldown_until: self.cooldowns.active(id, state.meta.tick),
            })
            .collect();
        status.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        status
    }

    /// Plan right now for an explicit request, ignoring any cooldown.
    pub fn plan_immediate(
        &mut self,
        state: &GameState,
        content: &GameContent,
        agent_id: &AgentId,
        station_id: &StationId,
        next_command_id: &mut u64,
    ) -> Result<CommandEnvelope, PlanFailure> {
        self.scratch.claimed.clear();
        let request = PlanRequest {
            agent: agent_id,
            station: station_id,
            immediate: true,
        };
        let task = self.plan(state, content, request)?;
        Ok(assign_cmd(
            state.meta.tick,
            next_command_id,
            agent_id.clone(),
            task,
        ))
    }

    fn plan(
        &mut self,
        state: &GameState,
        content: &GameContent,
        request: PlanRequest<'_>,
    ) -> Result<RepairTask, PlanFailure> {
        let result = plan_repair(
            state,
            content,
            request,
            &mut self.cooldowns,
            &mut self.rng,
            &mut self.scratch,
        );
        match &result {
            Ok(task) => {
                info!(
                    agent = %request.agent,
                    station = %request.station,
                    target = %task.target,
                    "repair planned"
                );
                self.last_failure.remove(request.station);
            }
            // Keep the reason the cooldown started.
            Err(PlanFailure::CoolingDown { .. }) => {}
            Err(err) => {
                debug!(agent = %request.agent, station = %request.station, %err, "nothing to plan");
                self.last_failure
                    .insert(request.station.clone(), err.clone());
            }
        }
        result
    }
}

impl CommandSource for RepairScheduler {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let mut commands = Vec::new();
        let mut staffed: HashSet<StationId> = HashSet::new();
        self.scratch.claimed.clear();

        for agent_id in collect_idle_agents(state) {
            for station_id in stations_by_distance(state, &agent_id) {
                if staffed.contains(&station_id) {
                    continue;
                }
                let request = PlanRequest {
                    agent: &agent_id,
                    station: &station_id,
                    immediate: false,
                };
                if let Ok(task) = self.plan(state, content, request) {
                    commands.push(assign_cmd(
                        state.meta.tick,
                        next_command_id,
                        agent_id.clone(),
                        task,
                    ));
                    staffed.insert(station_id);
                    break;
                }
            }
        }

        commands
    }
}
