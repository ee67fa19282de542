//! The renderer's external interface (§6): a plain, serializable description
//! of one tick's frame. No rasterization or video encoding happens here —
//! that work belongs to an external renderer, per the Non-goals in §1.

use serde::Serialize;

use crate::geometry::Point;
use crate::orchestrator::Simulation;

/// Proximity radius used for both `Agent::fetch` (§4.2) and the
/// danger-rectangle a renderer would draw around each agent.
pub const PROXIMITY_RADIUS: f64 = 2.0;

#[derive(Debug, Clone, Serialize)]
pub struct AgentFrame {
    pub id: usize,
    pub position: Point,
    pub destination: Point,
    /// `(min_x, min_y, max_x, max_y)` in grid cells, centered on `position`.
    pub danger_rect: (f64, f64, f64, f64),
    pub path_history: Vec<Point>,
    pub path: Vec<Point>,
    pub color: [u8; 3],
    pub arrived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameDescriptor {
    pub tick: u64,
    pub grid_width: i64,
    pub grid_height: i64,
    pub agents: Vec<AgentFrame>,
}

/// Cyclic display palette, generalizing `genColor`'s `id in [0,1,2]`
/// hard-code (Open Question (c)) to any fleet size.
const PALETTE: &[[u8; 3]] = &[
    [255, 0, 0],
    [0, 0, 255],
    [0, 255, 0],
    [255, 165, 0],
    [160, 32, 240],
    [0, 206, 209],
];

pub fn color_palette(n: usize) -> Vec<[u8; 3]> {
    (0..n).map(|i| PALETTE[i % PALETTE.len()]).collect()
}

pub fn describe_frame(sim: &Simulation) -> FrameDescriptor {
    let colors = color_palette(sim.agents.len());
    let agents = sim
        .agents
        .iter()
        .zip(colors)
        .map(|(agent, color)| AgentFrame {
            id: agent.id,
            position: (agent.x, agent.y),
            destination: agent.destination,
            danger_rect: (
                agent.x - PROXIMITY_RADIUS,
                agent.y - PROXIMITY_RADIUS,
                agent.x + PROXIMITY_RADIUS,
                agent.y + PROXIMITY_RADIUS,
            ),
            path_history: agent.path_history.clone(),
            path: agent.path.clone(),
            color,
            arrived: agent.arrived,
        })
        .collect();

    FrameDescriptor {
        tick: sim.tick,
        grid_width: sim.grid.width,
        grid_height: sim.grid.height,
        agents,
    }
}
