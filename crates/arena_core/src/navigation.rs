//! Optional grid navigation built from the static colliders.
//!
//! The arena is rasterised into square cells centred on the origin. Cells
//! under geometry taller than a step are blocked; cells under low ledges are
//! walkable at extra cost. Paths come from A* with deterministic
//! tie-breaking and are smoothed by line-of-sight over the grid.
//!
//! Agents never call this directly; [`crate::context::TickContext::path_direction`]
//! consults the grid when one is installed and falls back to straight-line
//! steering otherwise.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, Result};
use crate::math::Vec3;
use crate::spatial::ColliderSet;

/// Cell types for the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Open floor (cost 10).
    #[default]
    Walkable,
    /// Low ledge that standard bodies can climb (cost 20).
    Climb,
    /// Impassable.
    Blocked,
}

impl CellType {
    /// Cardinal movement cost, `None` when blocked.
    #[must_use]
    pub const fn movement_cost(self) -> Option<u32> {
        match self {
            Self::Walkable => Some(10),
            Self::Climb => Some(20),
            Self::Blocked => None,
        }
    }

    /// Whether the cell can be entered.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Navigation grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavGrid {
    width: u32,
    height: u32,
    cells: Vec<CellType>,
    cell_size: f32,
    origin_x: f32,
    origin_z: f32,
}

impl NavGrid {
    /// All-walkable grid covering `[-half_size, half_size]` on X and Z.
    ///
    /// Returns an error for a non-positive cell size or arena size.
    pub fn new(half_size: f32, cell_size: f32) -> Result<Self> {
        if cell_size <= 0.0 || half_size <= 0.0 {
            return Err(ArenaError::InvalidConfig(
                "navigation grid needs positive sizes".into(),
            ));
        }
        let cells_per_side = ((half_size * 2.0) / cell_size).ceil().max(1.0) as u32;
        Ok(Self {
            width: cells_per_side,
            height: cells_per_side,
            cells: vec![CellType::Walkable; (cells_per_side as usize) * (cells_per_side as usize)],
            cell_size,
            origin_x: -half_size,
            origin_z: -half_size,
        })
    }

    /// Rasterise colliders. Geometry rising more than `step_height` above
    /// the floor marks cells as climbable up to `climb_height`, blocked above.
    /// Slabs whose underside is above `climb_height` are ignored.
    pub fn from_colliders(
        colliders: &ColliderSet,
        half_size: f32,
        cell_size: f32,
        step_height: f32,
        climb_height: f32,
    ) -> Result<Self> {
        let mut grid = Self::new(half_size, cell_size)?;
        let floor = colliders.floor();
        for gz in 0..grid.height {
            for gx in 0..grid.width {
                let min_x = grid.origin_x + gx as f32 * cell_size;
                let min_z = grid.origin_z + gz as f32 * cell_size;
                let max_x = min_x + cell_size;
                let max_z = min_z + cell_size;
                let rise = colliders
                    .boxes()
                    .iter()
                    .filter(|b| {
                        b.min.x < max_x
                            && b.max.x > min_x
                            && b.min.z < max_z
                            && b.max.z > min_z
                            && b.min.y - floor < climb_height
                    })
                    .map(|b| b.top() - floor)
                    .fold(0.0_f32, f32::max);
                let cell = if rise <= step_height {
                    CellType::Walkable
                } else if rise <= climb_height {
                    CellType::Climb
                } else {
                    CellType::Blocked
                };
                grid.set_cell(gx, gz, cell);
            }
        }
        Ok(grid)
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell edge in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn index(&self, x: u32, z: u32) -> usize {
        (z as usize) * (self.width as usize) + (x as usize)
    }

    /// Whether the coordinates are inside the grid.
    #[must_use]
    pub fn in_bounds(&self, x: u32, z: u32) -> bool {
        x < self.width && z < self.height
    }

    /// Cell at the coordinates.
    #[must_use]
    pub fn get_cell(&self, x: u32, z: u32) -> Option<CellType> {
        self.in_bounds(x, z).then(|| self.cells[self.index(x, z)])
    }

    /// Overwrite a cell. Returns `false` out of bounds.
    pub fn set_cell(&mut self, x: u32, z: u32, cell: CellType) -> bool {
        if !self.in_bounds(x, z) {
            return false;
        }
        let i = self.index(x, z);
        self.cells[i] = cell;
        true
    }

    /// Whether a cell can be entered.
    #[must_use]
    pub fn is_walkable(&self, x: u32, z: u32) -> bool {
        self.get_cell(x, z).is_some_and(CellType::is_walkable)
    }

    /// Cell containing a world point.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3) -> Option<(u32, u32)> {
        let fx = ((pos.x - self.origin_x) / self.cell_size).floor();
        let fz = ((pos.z - self.origin_z) / self.cell_size).floor();
        if fx < 0.0 || fz < 0.0 {
            return None;
        }
        let (x, z) = (fx as u32, fz as u32);
        self.in_bounds(x, z).then_some((x, z))
    }

    /// World centre of a cell at height `y`.
    #[must_use]
    pub fn grid_to_world(&self, x: u32, z: u32, y: f32) -> Vec3 {
        let half = self.cell_size * 0.5;
        Vec3::new(
            self.origin_x + x as f32 * self.cell_size + half,
            y,
            self.origin_z + z as f32 * self.cell_size + half,
        )
    }

    /// Smoothed path from `start` to `goal`; waypoints keep `start.y`.
    ///
    /// The final waypoint is `goal` itself rather than its cell centre.
    pub fn find_path(&self, start: Vec3, goal: Vec3) -> Result<Vec<Vec3>> {
        let (sx, sz) = self
            .world_to_grid(start)
            .ok_or_else(|| ArenaError::NoPath("start outside grid".into()))?;
        let (gx, gz) = self
            .world_to_grid(goal)
            .ok_or_else(|| ArenaError::NoPath("goal outside grid".into()))?;
        if !self.is_walkable(sx, sz) {
            return Err(ArenaError::NoPath("start cell blocked".into()));
        }
        if !self.is_walkable(gx, gz) {
            return Err(ArenaError::NoPath("goal cell blocked".into()));
        }
        if (sx, sz) == (gx, gz) {
            return Ok(vec![goal]);
        }

        let cells = self.search(sx, sz, gx, gz)?;
        let mut path = smooth_cells(self, &cells)
            .into_iter()
            .map(|(x, z)| self.grid_to_world(x, z, start.y))
            .collect::<Vec<_>>();
        if let Some(last) = path.last_mut() {
            *last = Vec3::new(goal.x, start.y, goal.z);
        }
        Ok(path)
    }

    fn search(&self, sx: u32, sz: u32, gx: u32, gz: u32) -> Result<Vec<(u32, u32)>> {
        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
        let mut g_score: HashMap<(u32, u32), u32> = HashMap::new();

        g_score.insert((sx, sz), 0);
        open.push(Node {
            x: sx,
            z: sz,
            f: octile(sx, sz, gx, gz),
            tie: tie_breaker(sx, sz),
        });

        while let Some(current) = open.pop() {
            if (current.x, current.z) == (gx, gz) {
                return Ok(reconstruct(&came_from, gx, gz));
            }
            let current_g = g_score.get(&(current.x, current.z)).copied().unwrap_or(u32::MAX);

            for &(dx, dz) in &DIRECTIONS {
                let Some(nx) = current.x.checked_add_signed(dx) else {
                    continue;
                };
                let Some(nz) = current.z.checked_add_signed(dz) else {
                    continue;
                };
                let Some(cost) = self.get_cell(nx, nz).and_then(CellType::movement_cost) else {
                    continue;
                };
                let diagonal = dx != 0 && dz != 0;
                if diagonal
                    && !(self.is_walkable(nx, current.z) && self.is_walkable(current.x, nz))
                {
                    continue;
                }
                let step = if diagonal { cost * 14 / 10 } else { cost };
                let tentative = current_g.saturating_add(step);
                if tentative < g_score.get(&(nx, nz)).copied().unwrap_or(u32::MAX) {
                    came_from.insert((nx, nz), (current.x, current.z));
                    g_score.insert((nx, nz), tentative);
                    open.push(Node {
                        x: nx,
                        z: nz,
                        f: tentative + octile(nx, nz, gx, gz),
                        tie: tie_breaker(nx, nz),
                    });
                }
            }
        }

        Err(ArenaError::NoPath(format!(
            "no route from ({sx}, {sz}) to ({gx}, {gz})"
        )))
    }
}

const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    x: u32,
    z: u32,
    f: u32,
    tie: u64,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, then on coordinates
        other.f.cmp(&self.f).then_with(|| other.tie.cmp(&self.tie))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tie_breaker(x: u32, z: u32) -> u64 {
    (u64::from(z) << 32) | u64::from(x)
}

/// Octile distance in cost units (10 cardinal, 14 diagonal).
fn octile(x1: u32, z1: u32, x2: u32, z2: u32) -> u32 {
    let dx = x1.abs_diff(x2);
    let dz = z1.abs_diff(z2);
    10 * dx.max(dz) + 4 * dx.min(dz)
}

fn reconstruct(came_from: &HashMap<(u32, u32), (u32, u32)>, gx: u32, gz: u32) -> Vec<(u32, u32)> {
    let mut cells = vec![(gx, gz)];
    let mut current = (gx, gz);
    while let Some(&prev) = came_from.get(&current) {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();
    cells
}

/// Drop waypoints that can be skipped in a straight grid line.
fn smooth_cells(grid: &NavGrid, cells: &[(u32, u32)]) -> Vec<(u32, u32)> {
    if cells.len() <= 2 {
        return cells.to_vec();
    }
    let mut out = vec![cells[0]];
    let mut current = 0;
    while current < cells.len() - 1 {
        let mut furthest = current + 1;
        for check in (current + 2)..cells.len() {
            if grid_line_clear(grid, cells[current], cells[check]) {
                furthest = check;
            }
        }
        out.push(cells[furthest]);
        current = furthest;
    }
    out
}

/// Bresenham walk that also refuses to cut blocked corners.
fn grid_line_clear(grid: &NavGrid, from: (u32, u32), to: (u32, u32)) -> bool {
    let (x0, z0) = (i64::from(from.0), i64::from(from.1));
    let (x1, z1) = (i64::from(to.0), i64::from(to.1));
    let dx = (x1 - x0).abs();
    let dz = (z1 - z0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sz = if z0 < z1 { 1 } else { -1 };
    let mut err = dx - dz;
    let (mut x, mut z) = (x0, z0);

    let walkable = |x: i64, z: i64| {
        u32::try_from(x)
            .ok()
            .zip(u32::try_from(z).ok())
            .is_some_and(|(x, z)| grid.is_walkable(x, z))
    };

    loop {
        if !walkable(x, z) {
            return false;
        }
        if x == x1 && z == z1 {
            return true;
        }
        let e2 = 2 * err;
        let step_x = e2 > -dz;
        let step_z = e2 < dx;
        if step_x && step_z && !(walkable(x + sx, z) && walkable(x, z + sz)) {
            return false;
        }
        if step_x {
            err -= dz;
            x += sx;
        }
        if step_z {
            err += dx;
            z += sz;
        }
    }
}
