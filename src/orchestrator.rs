//! Drives the fleet through ticks, running the coordination phase every
//! `coordination_period` ticks and advancing every agent one sub-step every
//! tick (§4.6, §5).

use tracing::{debug, warn};

use crate::agent::Agent;
use crate::error::SimError;
use crate::geometry::Grid;
use crate::message::Message;

/// Sentinel recorded by [`ResultsSink`](crate::results::ResultsSink) when a
/// scenario's replan consensus never converges (§7, §8 results sink).
pub const CONSENSUS_FAILURE_SENTINEL_TICK: u64 = 50_000_000;

#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub coordination_period: u64,
    pub max_replan_attempts: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            coordination_period: 5,
            max_replan_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimOutcome {
    Succeeded { ticks: u64 },
    Failed { sentinel_tick: u64 },
}

pub struct Simulation {
    pub agents: Vec<Agent>,
    pub grid: Grid,
    pub tick: u64,
    pub config: SimulationConfig,
}

impl Simulation {
    pub fn new(agents: Vec<Agent>, grid: Grid, config: SimulationConfig) -> Self {
        Simulation {
            agents,
            grid,
            tick: 0,
            config,
        }
    }

    /// Run until every agent arrives or consensus fails (§4.6).
    pub fn run(&mut self) -> Result<SimOutcome, SimError> {
        loop {
            if self.agents.iter().all(|a| a.arrived) {
                return Ok(SimOutcome::Succeeded { ticks: self.tick });
            }
            if self.tick % self.config.coordination_period == 0 {
                if let Some(outcome) = self.coordination_phase()? {
                    return Ok(outcome);
                }
            }
            for agent in &mut self.agents {
                agent.step_motion()?;
            }
            self.tick += 1;
        }
    }

    /// Broadcast/fetch/prioritize/fetch/detect/replan, in that exact order
    /// (§5's phase-ordering rationale: the second fetch must see (c)'s
    /// priorities before (e) detects conflicts). Returns `Some(outcome)`
    /// only when the scenario is over — no collision found (`None`) means
    /// the tick loop should simply keep moving.
    fn coordination_phase(&mut self) -> Result<Option<SimOutcome>, SimError> {
        for agent in &mut self.agents {
            agent.broadcast();
        }
        self.fetch_all(false, None);

        for agent in &mut self.agents {
            agent.check_max_eta();
        }
        self.fetch_all(false, None);

        let collision = self.agents.iter().any(|a| !a.will_collide().is_empty());
        if !collision {
            return Ok(None);
        }

        let n = self.agents.len();
        let mut attempt = 0u32;
        loop {
            let mut all_okay = vec![false; n];
            for i in 0..n {
                all_okay[i] = self.agents[i].modify_path(&self.grid);
                let msg = self.agents[i]
                    .broadcast_msg
                    .clone()
                    .expect("modify_path always rebroadcasts");
                for j in 0..n {
                    if j != i {
                        self.agents[j].fetch(&msg, false);
                    }
                }
            }
            if all_okay.iter().all(|&ok| ok) {
                return Ok(None);
            }

            debug!(tick = self.tick, "dead end occurred, repairing via force priority");
            self.fetch_all(true, Some(&all_okay));
            attempt += 1;
            if attempt == self.config.max_replan_attempts {
                warn!(tick = self.tick, "replan consensus failed");
                return Ok(Some(SimOutcome::Failed {
                    sentinel_tick: CONSENSUS_FAILURE_SENTINEL_TICK,
                }));
            }
        }
    }

    /// Every agent fetches every other agent's current broadcast. Snapshots
    /// are cloned up front so this never holds two mutable borrows into
    /// `self.agents` at once. When `only_failed` is set, a sender is only
    /// fetched (with `force_priority`) if `ok_mask` marks it as having
    /// failed its last `modify_path` call (§4.6 step f).
    fn fetch_all(&mut self, force_priority: bool, ok_mask: Option<&[bool]>) {
        let snapshots: Vec<Message> = self
            .agents
            .iter()
            .map(|a| {
                a.broadcast_msg
                    .clone()
                    .expect("broadcast must run before fetch")
            })
            .collect();
        let n = self.agents.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if let Some(mask) = ok_mask {
                    if mask[j] {
                        continue;
                    }
                }
                self.agents[i].fetch(&snapshots[j], force_priority);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // P2 / a head-on two-agent scenario: without replanning these collide;
    // the orchestrator's coordination phase must route around it and the
    // run must still terminate successfully.
    #[test]
    fn test_run_resolves_head_on_conflict() {
        let agents = vec![
            Agent::new(0, (0.0, 5.0), (4.0, 5.0), 2),
            Agent::new(1, (4.0, 5.0), (0.0, 5.0), 2),
        ];
        let grid = Grid::new(10, 10);
        let mut sim = Simulation::new(agents, grid, SimulationConfig::default());
        let outcome = sim.run().expect("simulation must not hit an invariant violation");
        match outcome {
            SimOutcome::Succeeded { .. } => {}
            SimOutcome::Failed { .. } => panic!("expected the conflict to resolve, not fail"),
        }
        assert!(sim.agents.iter().all(|a| a.arrived));
    }

    #[test]
    fn test_run_single_agent_trivial_success() {
        let agents = vec![Agent::new(0, (0.0, 0.0), (1.0, 0.0), 1)];
        let grid = Grid::new(10, 10);
        let mut sim = Simulation::new(agents, grid, SimulationConfig::default());
        let outcome = sim.run().unwrap();
        assert!(matches!(outcome, SimOutcome::Succeeded { ticks: 5 }));
    }

    // S6: a lower-priority agent funnelled into a corner by a higher-priority
    // peer's published path fails its first replan attempt; the dead-end
    // rotation and `force_priority` propagation must let the second attempt
    // succeed, with the formerly-stuck agent now first in everyone's
    // `recognized_priority`. Minimal two-agent instance of the scenario: a
    // 2-cell corridor (grid height 0, so only the x axis is navigable) with
    // one agent permanently parked at the far end blocks the only other
    // agent's sole possible move, which is exactly the shape `modifyPath`'s
    // BFS dead-ends on regardless of detour budget.
    #[test]
    fn test_coordination_phase_s6_dead_end_then_force_priority_recovery() {
        let grid = Grid::new(1, 0);

        let mut blocker = Agent::new(0, (1.0, 0.0), (1.0, 0.0), 2);
        blocker.path = vec![(1.0, 0.0); 30];
        blocker.eta = 30;

        let stuck = Agent::new(1, (0.0, 0.0), (1.0, 0.0), 2);
        assert_eq!(stuck.eta, 5, "sanity: direct path is one cell, 5 sub-steps");

        let mut sim = Simulation::new(vec![blocker, stuck], grid, SimulationConfig::default());
        let outcome = sim.coordination_phase().expect("no invariant violation");
        assert!(
            outcome.is_none(),
            "expected the phase to resolve, not end the run: {outcome:?}"
        );
        assert_eq!(
            sim.agents[0].recognized_priority,
            Some(vec![1, 0]),
            "the blocker must have adopted the formerly-stuck agent's rotated priority"
        );
        assert_eq!(
            sim.agents[1].recognized_priority,
            Some(vec![1, 0]),
            "the formerly-stuck agent rotates itself to the front on dead end"
        );
        assert!(
            sim.agents[0].path.is_empty(),
            "the blocker, now lowest priority, replans a (trivial, already-there) path"
        );
        assert_eq!(
            sim.agents[1].path.len(),
            5,
            "the formerly-stuck agent is now top priority and never needed to replan"
        );
    }

    // P6: running the coordination phase twice with no movement between (no
    // conflict, so no replanning) must leave every agent's path,
    // recognized_priority, and inbox identical on the second run.
    #[test]
    fn test_coordination_phase_is_idempotent_without_conflict() {
        let agents = vec![
            Agent::new(0, (0.0, 0.0), (9.0, 0.0), 2),
            Agent::new(1, (0.0, 2.0), (9.0, 2.0), 2),
        ];
        let grid = Grid::new(10, 10);
        let mut sim = Simulation::new(agents, grid, SimulationConfig::default());

        let first = sim.coordination_phase().expect("no invariant violation");
        assert!(first.is_none(), "unexpected run end: {first:?}");
        let paths_after_first: Vec<_> = sim.agents.iter().map(|a| a.path.clone()).collect();
        let priorities_after_first: Vec<_> = sim
            .agents
            .iter()
            .map(|a| a.recognized_priority.clone())
            .collect();
        let inboxes_after_first: Vec<_> = sim.agents.iter().map(|a| a.inbox.clone()).collect();

        let second = sim.coordination_phase().expect("no invariant violation");
        assert!(second.is_none(), "unexpected run end: {second:?}");

        for (i, agent) in sim.agents.iter().enumerate() {
            assert_eq!(agent.path, paths_after_first[i], "agent {i} path changed");
            assert_eq!(
                agent.recognized_priority, priorities_after_first[i],
                "agent {i} recognized_priority changed"
            );
            assert_eq!(agent.inbox, inboxes_after_first[i], "agent {i} inbox changed");
        }
    }
}
