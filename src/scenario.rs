//! Scenario generation and (de)serialization, grounded on the teacher's
//! `scenario.rs` for shape and on `zone.py`/`main.py` for the perimeter
//! sampling and acceptance-gate semantics this domain actually needs (there
//! are no octile-map buckets here, just a bounded grid perimeter).

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::Result;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::Agent;
use crate::geometry::{self, Grid, Point};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub start_x: i64,
    pub start_y: i64,
    pub goal_x: i64,
    pub goal_y: i64,
}

impl Route {
    fn start(&self) -> (i64, i64) {
        (self.start_x, self.start_y)
    }

    fn goal(&self) -> (i64, i64) {
        (self.goal_x, self.goal_y)
    }

    fn start_point(&self) -> Point {
        (self.start_x as f64, self.start_y as f64)
    }

    fn goal_point(&self) -> Point {
        (self.goal_x as f64, self.goal_y as f64)
    }
}

fn perimeter_positions(grid: &Grid) -> Vec<(i64, i64)> {
    let mut positions = Vec::new();
    positions.extend((1..grid.height).map(|i| (0, i)));
    positions.extend((1..grid.width).map(|i| (i, 0)));
    positions.extend((1..grid.height).map(|i| (grid.width, i)));
    positions.extend((1..grid.width).map(|i| (i, grid.height)));
    positions
}

fn same_side(grid: &Grid, a: (i64, i64), b: (i64, i64)) -> bool {
    (a.0 == 0 && b.0 == 0)
        || (a.0 == grid.width && b.0 == grid.width)
        || (a.1 == 0 && b.1 == 0)
        || (a.1 == grid.height && b.1 == grid.height)
}

fn conflicts(a: &[Point], b: &[Point]) -> bool {
    let len = a.len().min(b.len());
    for i in 0..len {
        if geometry::points_eq(a[i], b[i]) {
            return true;
        }
        if i < len - 1 && geometry::points_eq(a[i + 1], b[i]) && geometry::points_eq(a[i], b[i + 1]) {
            return true;
        }
    }
    false
}

fn every_pair_conflicts(routes: &[Route]) -> bool {
    let straight_paths: Vec<Vec<Point>> = routes
        .iter()
        .map(|r| geometry::auto_gen_path(r.start_point(), r.goal_point(), &[]))
        .collect();
    for i in 0..routes.len() {
        for j in (i + 1)..routes.len() {
            if !conflicts(&straight_paths[i], &straight_paths[j]) {
                return false;
            }
        }
    }
    true
}

/// Perimeter-sampled source/destination pairs, rejecting same-side pairs
/// and duplicate start cells, retrying the whole fleet until every pair
/// would conflict without replanning (mirrors `main.py`'s outer
/// `if not willCollide(...): continue` gate at scenario-generation time).
pub fn generate_conflicting_fleet<R: Rng + ?Sized>(
    num_agents: usize,
    grid: &Grid,
    rng: &mut R,
) -> Vec<Route> {
    let positions = perimeter_positions(grid);
    loop {
        let mut routes = Vec::with_capacity(num_agents);
        let mut used_starts = std::collections::HashSet::new();
        for _ in 0..num_agents {
            loop {
                let begin = *positions.choose(rng).expect("grid perimeter is non-empty");
                let end = *positions.choose(rng).expect("grid perimeter is non-empty");
                if same_side(grid, begin, end) {
                    continue;
                }
                if used_starts.contains(&begin) {
                    continue;
                }
                used_starts.insert(begin);
                routes.push(Route {
                    start_x: begin.0,
                    start_y: begin.1,
                    goal_x: end.0,
                    goal_y: end.1,
                });
                break;
            }
        }
        if every_pair_conflicts(&routes) {
            info!(num_agents, "generated conflicting fleet: {routes:?}");
            return routes;
        }
    }
}

/// Fixed-list scenario loading, mirroring `Zone.__init__(random_gen=False)`.
pub fn from_fixed_routes(routes: &[Route], fleet_size: usize) -> Vec<Agent> {
    routes
        .iter()
        .enumerate()
        .map(|(id, route)| Agent::new(id, route.start_point(), route.goal_point(), fleet_size))
        .collect()
}

pub fn load_routes_from_yaml(path: &str) -> Result<Vec<Route>> {
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    let routes = serde_yaml::from_reader(reader)?;
    Ok(routes)
}

pub fn write_routes_to_yaml(path: &str, routes: &[Route]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let yaml = serde_yaml::to_string(routes)?;
    writer.write_all(yaml.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_generate_conflicting_fleet_produces_distinct_starts() {
        let grid = Grid::new(10, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let routes = generate_conflicting_fleet(3, &grid, &mut rng);
        assert_eq!(routes.len(), 3);
        let mut starts: Vec<_> = routes.iter().map(Route::start).collect();
        starts.sort();
        starts.dedup();
        assert_eq!(starts.len(), 3);
        assert!(every_pair_conflicts(&routes));
    }

    #[test]
    fn test_generate_conflicting_fleet_rejects_same_side_pairs() {
        let grid = Grid::new(10, 10);
        let mut rng = StdRng::seed_from_u64(42);
        let routes = generate_conflicting_fleet(2, &grid, &mut rng);
        for route in &routes {
            assert!(!same_side(&grid, route.start(), route.goal()));
        }
    }

    #[test]
    fn test_from_fixed_routes_builds_matching_agents() {
        let routes = vec![
            Route {
                start_x: 1,
                start_y: 0,
                goal_x: 10,
                goal_y: 7,
            },
            Route {
                start_x: 0,
                start_y: 9,
                goal_x: 10,
                goal_y: 4,
            },
        ];
        let agents = from_fixed_routes(&routes, routes.len());
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].source, (1.0, 0.0));
        assert_eq!(agents[1].destination, (10.0, 4.0));
    }

    #[test]
    fn test_route_yaml_round_trip() {
        let routes = vec![Route {
            start_x: 0,
            start_y: 1,
            goal_x: 10,
            goal_y: 7,
        }];
        let path = std::env::temp_dir().join("scenario_route_roundtrip.yaml");
        write_routes_to_yaml(path.to_str().unwrap(), &routes).unwrap();
        let loaded = load_routes_from_yaml(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded, routes);
        let _ = std::fs::remove_file(path);
    }
}
