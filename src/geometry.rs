//! Grid, orientation, and path-interpolation primitives (§3-4.1 of the design).

/// Cells per sub-step: `1 / SPEED`. Named per Open Question (d) instead of
/// scattering the literal `5` through the planner.
pub const SUB_STEPS_PER_CELL: usize = 5;

/// Fixed cruise speed, in cells per sub-step.
pub const SPEED: f64 = 0.2;

/// A grid coordinate. Agents and sub-steps share the same representation
/// (the Python prototype stores everything as floats); a full-cell position
/// is just a `Point` whose components happen to be integers.
pub type Point = (f64, f64);

/// The four unit orientation vectors, integer cell deltas.
pub type Orientation = (i64, i64);

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Axis-aligned bounds of the simulation area, `0 <= x <= width`, `0 <= y <= height`.
#[derive(Debug, Clone, Copy)]
pub struct Grid {
    pub width: i64,
    pub height: i64,
}

impl Grid {
    pub fn new(width: i64, height: i64) -> Self {
        Grid { width, height }
    }

    pub fn in_bounds(&self, cell: (i64, i64)) -> bool {
        (0..=self.width).contains(&cell.0) && (0..=self.height).contains(&cell.1)
    }
}

/// Map an orientation vector to its 2-bit encoding, used to index the
/// planner's `used_state` visited table.
pub fn orientation_id(o: Orientation) -> usize {
    match o {
        (0, 1) => 0,
        (0, -1) => 1,
        (1, 0) => 2,
        (-1, 0) => 3,
        other => panic!("not a unit orientation vector: {other:?}"),
    }
}

/// `start + dir*SPEED, start + 2*dir*SPEED, ..., end` (inclusive of `end`,
/// exclusive of `start`), one axis at a time.
fn axis_steps(start: f64, end: f64, dir: f64) -> impl Iterator<Item = f64> {
    let steps = ((end - start).abs() / SPEED).round() as i64;
    (1..=steps).map(move |k| round2(start + dir * SPEED * k as f64))
}

pub(crate) fn points_eq(a: Point, b: Point) -> bool {
    (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
}

/// Generate the shortest sub-step path from `begin` to `end`, restricted to
/// axis-aligned unit-`SPEED` moves, traveling along the larger-delta axis
/// first. If `default_path` is non-empty, its last point becomes the
/// effective `begin` and the returned path is prefixed with it (§4.1).
pub fn auto_gen_path(begin: Point, end: Point, default_path: &[Point]) -> Vec<Point> {
    let begin = default_path.last().copied().unwrap_or(begin);

    let delta_x = (begin.0 - end.0).abs();
    let delta_y = (begin.1 - end.1).abs();

    let mut path = default_path.to_vec();
    if delta_x == 0.0 && delta_y == 0.0 {
        return path;
    }

    let dir_x = if begin.0 > end.0 {
        -1.0
    } else if begin.0 < end.0 {
        1.0
    } else {
        0.0
    };
    let dir_y = if begin.1 > end.1 {
        -1.0
    } else if begin.1 < end.1 {
        1.0
    } else {
        0.0
    };

    if delta_x > delta_y {
        path.extend(axis_steps(begin.0, end.0, dir_x).map(|x| (x, begin.1)));
        if delta_y > 0.0 {
            path.extend(axis_steps(begin.1, end.1, dir_y).map(|y| (end.0, y)));
        }
    } else {
        path.extend(axis_steps(begin.1, end.1, dir_y).map(|y| (begin.0, y)));
        if delta_x > 0.0 {
            path.extend(axis_steps(begin.0, end.0, dir_x).map(|x| (x, end.1)));
        }
    }

    path
}

/// Derive the orientation from the next path point relative to `current`.
/// Retains `previous` when `path` has fewer than two points (§3: orientation
/// is undefined before the first move in that case).
pub fn orientation_from(path: &[Point], current: Point, previous: Orientation) -> Orientation {
    if path.len() < 2 {
        return previous;
    }
    let dx = ((path[0].0 - current.0) / SPEED).round() as i64;
    let dy = ((path[0].1 - current.1) / SPEED).round() as i64;
    (dx, dy)
}

/// Goal-biased successor enumeration order for the constrained planner
/// (§4.5). Derived from the general rule — reduce the larger delta, reduce
/// the smaller delta, then the opposite of each, in that order — rather
/// than transcribed per-quadrant; see DESIGN.md Open Question (b) for why
/// this also resolves the source's preference-list typo without a special
/// case.
pub(crate) fn preference_list(cur: (i64, i64), dest: (i64, i64)) -> [Orientation; 4] {
    let dx = cur.0 - dest.0;
    let dy = cur.1 - dest.1;

    if dx == 0 && dy != 0 {
        let primary: Orientation = if dy > 0 { (0, -1) } else { (0, 1) };
        return [primary, (-1, 0), (1, 0), (-primary.0, -primary.1)];
    }
    if dy == 0 && dx != 0 {
        let primary: Orientation = if dx > 0 { (-1, 0) } else { (1, 0) };
        return [primary, (0, -1), (0, 1), (-primary.0, -primary.1)];
    }
    if dx == 0 && dy == 0 {
        // Unreachable in practice: the BFS checks goal-reached before ever
        // requesting a preference list for the current state.
        return [(0, 1), (-1, 0), (1, 0), (0, -1)];
    }

    let reduce_x: Orientation = if dx > 0 { (-1, 0) } else { (1, 0) };
    let reduce_y: Orientation = if dy > 0 { (0, -1) } else { (0, 1) };
    let (first, second) = if dx.abs() > dy.abs() {
        (reduce_x, reduce_y)
    } else {
        (reduce_y, reduce_x)
    };
    [
        first,
        second,
        (-first.0, -first.1),
        (-second.0, -second.1),
    ]
}

/// Interpolate a sequence of whole-cell waypoints (as produced by the
/// planner's path reconstruction) into the full sub-step point sequence,
/// mirroring `aircraft.py::modifyPath`'s `suggested_a` construction. The
/// first cell is emitted literally (no interpolation needed against
/// nothing); once the running tail reaches `dest` no further interpolation
/// is attempted.
pub(crate) fn interpolate_cells(cells: &[(i64, i64)], dest: Point) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(cells.len());
    for (i, &(cx, cy)) in cells.iter().enumerate() {
        let point = (cx as f64, cy as f64);
        if i == 0 {
            out.push(point);
            continue;
        }
        let last = *out.last().unwrap();
        if points_eq(last, dest) {
            continue;
        }
        if (last.0 - point.0).abs() > f64::EPSILON {
            let dir = if last.0 > point.0 { -1.0 } else { 1.0 };
            out.extend(axis_steps(last.0, point.0, dir).map(|x| (x, last.1)));
        } else {
            let dir = if last.1 > point.1 { -1.0 } else { 1.0 };
            out.extend(axis_steps(last.1, point.1, dir).map(|y| (last.0, y)));
        }
    }
    out
}
