use tracing::debug;

use crate::error::SimError;
use crate::geometry::{self, Grid, Orientation, Point, SPEED};
use crate::message::Message;
use crate::planner;

/// One aircraft in the fleet. Lives entirely in terms of [`Message`]
/// snapshots of its peers — it never borrows another `Agent` directly,
/// which is what lets the orchestrator drive a `Vec<Agent>` with plain
/// sequential mutable access instead of `Rc<RefCell<_>>` bookkeeping.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    pub source: Point,
    pub destination: Point,
    pub x: f64,
    pub y: f64,
    pub orientation: Orientation,
    pub arrived: bool,
    pub eta: usize,
    pub path_history: Vec<Point>,
    pub path: Vec<Point>,
    pub recognized_priority: Option<Vec<usize>>,
    pub broadcast_msg: Option<Message>,
    pub inbox: Vec<Option<Message>>,
    /// Cells of path to publish; `None` means "publish everything".
    pub forecast_length: Option<u32>,
}

impl Agent {
    pub fn new(id: usize, source: Point, destination: Point, fleet_size: usize) -> Self {
        let path = geometry::auto_gen_path(source, destination, &[]);
        let eta = path.len();
        let orientation = geometry::orientation_from(&path, source, (0, 0));

        Agent {
            id,
            source,
            destination,
            x: source.0,
            y: source.1,
            orientation,
            arrived: false,
            eta,
            path_history: Vec::new(),
            path,
            recognized_priority: None,
            broadcast_msg: None,
            inbox: vec![None; fleet_size],
            forecast_length: None,
        }
    }

    /// Fleet size, derived from the inbox rather than stored separately —
    /// there is no uninitialized-field hazard here (Open Question (a) in
    /// DESIGN.md), since `inbox` is always sized at construction.
    pub fn fleet_size(&self) -> usize {
        self.inbox.len()
    }

    /// Fill `broadcast_msg` with the current outgoing snapshot (§4.2).
    pub fn broadcast(&mut self) {
        let path = match self.forecast_length {
            None => self.path.clone(),
            Some(cells) => {
                let len = ((cells as f64) / SPEED).round() as usize;
                self.path[..len.min(self.path.len())].to_vec()
            }
        };
        self.broadcast_msg = Some(Message {
            id: self.id,
            x: self.x,
            y: self.y,
            orientation: self.orientation,
            eta: self.eta,
            path,
            arrived: self.arrived,
            destination: self.destination,
            recognized_priority: self.recognized_priority.clone().unwrap_or_default(),
        });
    }

    /// Record (or clear) a peer's broadcast snapshot, radius-filtered (§4.2).
    pub fn fetch(&mut self, peer: &Message, force_priority: bool) {
        let distance = (self.x - peer.x).abs().max((self.y - peer.y).abs()) as i64;
        if distance <= 2 {
            self.inbox[peer.id] = Some(peer.clone());
            if force_priority {
                let mut priority = peer.recognized_priority.clone();
                priority.retain(|&i| i == self.id || self.inbox[i].is_some());
                self.recognized_priority = Some(priority);
            }
        } else {
            self.inbox[peer.id] = None;
        }
    }

    /// Build `recognized_priority` by ETA descending, ties by ascending id
    /// (a stable sort over the ascending-id build order gives this for
    /// free), and rebroadcast (§4.3).
    pub fn check_max_eta(&mut self) {
        let mut entries: Vec<(usize, usize)> = Vec::with_capacity(self.inbox.len());
        for i in 0..self.inbox.len() {
            if i == self.id {
                entries.push((self.id, self.eta));
                continue;
            }
            if let Some(msg) = &self.inbox[i] {
                entries.push((i, msg.eta));
            }
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.recognized_priority = Some(entries.into_iter().map(|(id, _)| id).collect());
        self.broadcast();
    }

    /// Vertex + swap conflict scan against every observed peer path (§4.4).
    pub fn will_collide(&self) -> Vec<usize> {
        let mut collide_ids = Vec::new();
        for slot in &self.inbox {
            let Some(msg) = slot else { continue };
            let len = self.path.len().min(msg.path.len());
            for i in 0..len {
                if geometry::points_eq(self.path[i], msg.path[i]) {
                    collide_ids.push(msg.id);
                    break;
                }
                if i < len - 1
                    && geometry::points_eq(self.path[i + 1], msg.path[i])
                    && geometry::points_eq(self.path[i], msg.path[i + 1])
                {
                    collide_ids.push(msg.id);
                    break;
                }
            }
        }
        collide_ids
    }

    /// Advance one sub-step (§4.6 step 3 / §8 S7).
    pub fn step_motion(&mut self) -> Result<(), SimError> {
        if self.arrived {
            return Ok(());
        }
        if self.path.is_empty() {
            return Err(SimError::InvariantViolation(format!(
                "agent {} has no path but has not arrived",
                self.id
            )));
        }
        self.path_history.push((self.x, self.y));
        self.orientation = geometry::orientation_from(&self.path, (self.x, self.y), self.orientation);
        let next = self.path.remove(0);
        self.x = next.0;
        self.y = next.1;
        self.eta = self.path.len();
        if geometry::points_eq((self.x, self.y), self.destination) {
            if self.eta != 0 {
                return Err(SimError::InvariantViolation(format!(
                    "agent {} reached its destination with a non-empty path",
                    self.id
                )));
            }
            self.arrived = true;
        }
        Ok(())
    }

    /// Replan around higher-priority peers (§4.5). Returns `true` when no
    /// replanning was needed or it succeeded, `false` on dead end.
    pub fn modify_path(&mut self, grid: &Grid) -> bool {
        let priority = self
            .recognized_priority
            .as_ref()
            .expect("recognized_priority must be set before modify_path is called");
        if priority[0] == self.id {
            return true;
        }

        match planner::search(self, grid) {
            Some(cells) => {
                let suggested = geometry::interpolate_cells(&cells, self.destination);
                self.path = geometry::auto_gen_path(self.source, self.destination, &suggested[1..]);
                self.eta = self.path.len();
                self.broadcast();
                debug!(agent = self.id, eta = self.eta, "replanned around conflict");
                true
            }
            None => {
                let idx = priority
                    .iter()
                    .position(|&id| id == self.id)
                    .expect("agent must appear in its own priority list");
                let mut rotated = vec![self.id];
                rotated.extend(priority[..idx].iter().copied());
                rotated.extend(priority[idx + 1..].iter().copied());
                self.recognized_priority = Some(rotated);
                self.broadcast();
                debug!(agent = self.id, "planner hit a dead end");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg_from(agent: &Agent) -> Message {
        agent.broadcast_msg.clone().expect("agent has not broadcast")
    }

    // S7: path=[(0.2,0),(0.4,0)], x=0,y=0 -> after move, x=0.2,y=0,eta=1.
    #[test]
    fn test_step_motion_s7() {
        let mut agent = Agent::new(0, (0.0, 0.0), (5.0, 0.0), 1);
        agent.path = vec![(0.2, 0.0), (0.4, 0.0)];
        agent.eta = agent.path.len();
        agent.step_motion().unwrap();
        assert_eq!((agent.x, agent.y), (0.2, 0.0));
        assert_eq!(agent.eta, 1);
        assert_eq!(agent.path_history, vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_step_motion_arrival_sets_flag() {
        let mut agent = Agent::new(0, (0.0, 0.0), (0.2, 0.0), 1);
        assert_eq!(agent.path, vec![(0.2, 0.0)]);
        agent.step_motion().unwrap();
        assert!(agent.arrived);
        assert!(agent.path.is_empty());
        assert_eq!(agent.eta, 0);
    }

    // S3: A(eta=40), B(eta=55), C(eta=30) -> recognized_priority = [B, A, C].
    #[test]
    fn test_check_max_eta_s3() {
        let mut a = Agent::new(0, (0.0, 0.0), (8.0, 0.0), 3);
        a.eta = 40;
        let b = Message {
            id: 1,
            x: 1.0,
            y: 0.0,
            orientation: (1, 0),
            eta: 55,
            path: vec![],
            arrived: false,
            destination: (9.0, 0.0),
            recognized_priority: vec![],
        };
        let c = Message {
            id: 2,
            x: 1.0,
            y: 1.0,
            orientation: (1, 0),
            eta: 30,
            path: vec![],
            arrived: false,
            destination: (9.0, 1.0),
            recognized_priority: vec![],
        };
        a.fetch(&b, false);
        a.fetch(&c, false);
        a.check_max_eta();
        assert_eq!(a.recognized_priority, Some(vec![1, 0, 2]));
    }

    // P5: broadcast then fetch within radio range yields a deep-equal inbox entry.
    #[test]
    fn test_broadcast_fetch_round_trip() {
        let mut a = Agent::new(0, (0.0, 0.0), (5.0, 0.0), 2);
        a.broadcast();
        let snapshot = msg_from(&a);

        let mut b = Agent::new(1, (1.0, 0.0), (6.0, 0.0), 2);
        b.fetch(&snapshot, false);
        assert_eq!(b.inbox[0], Some(snapshot));
    }

    #[test]
    fn test_fetch_out_of_range_clears_slot() {
        let mut a = Agent::new(0, (0.0, 0.0), (5.0, 0.0), 2);
        a.inbox[1] = Some(Message {
            id: 1,
            x: 9.0,
            y: 9.0,
            orientation: (1, 0),
            eta: 3,
            path: vec![],
            arrived: false,
            destination: (0.0, 0.0),
            recognized_priority: vec![],
        });
        let far = Message {
            id: 1,
            x: 9.0,
            y: 9.0,
            orientation: (1, 0),
            eta: 3,
            path: vec![],
            arrived: false,
            destination: (0.0, 0.0),
            recognized_priority: vec![],
        };
        a.fetch(&far, false);
        assert_eq!(a.inbox[1], None);
    }

    // S4: two agents on crossing paths collide, then modify_path clears it.
    #[test]
    fn test_will_collide_vertex_conflict() {
        let mut a = Agent::new(0, (0.0, 0.0), (2.0, 0.0), 2);
        let mut b = Agent::new(1, (2.0, 0.0), (0.0, 0.0), 2);
        a.broadcast();
        b.broadcast();
        let a_msg = msg_from(&a);
        let b_msg = msg_from(&b);
        a.fetch(&b_msg, false);
        b.fetch(&a_msg, false);
        assert_eq!(a.will_collide(), vec![1]);
        assert_eq!(b.will_collide(), vec![0]);
    }

    // S5: A at (3,5) moving +x, B at (4,5) moving -x -> swap conflict.
    #[test]
    fn test_will_collide_swap_conflict() {
        let mut a = Agent::new(0, (3.0, 5.0), (5.0, 5.0), 2);
        let mut b = Agent::new(1, (4.0, 5.0), (2.0, 5.0), 2);
        a.broadcast();
        b.broadcast();
        let a_msg = msg_from(&a);
        let b_msg = msg_from(&b);
        a.fetch(&b_msg, false);
        b.fetch(&a_msg, false);
        assert_eq!(a.will_collide(), vec![1]);
    }
}
