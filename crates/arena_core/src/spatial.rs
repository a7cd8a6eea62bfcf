//! Spatial query layer: static colliders, ray casts and ground sampling.
//!
//! World geometry reaches the simulation as immutable axis-aligned boxes.
//! Everything that reasons about geometry (movement, steering, spawning,
//! line-of-sight, navigation) goes through [`ColliderSet`].

use serde::{Deserialize, Serialize};

use crate::math::{Vec3, EPSILON};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from two corners (in any order).
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box from its centre and half extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// A box resting on `floor` covering `x0..x1`, `z0..z1` with height `height`.
    #[must_use]
    pub fn block(x0: f32, x1: f32, z0: f32, z1: f32, floor: f32, height: f32) -> Self {
        Self::new(Vec3::new(x0, floor, z0), Vec3::new(x1, floor + height, z1))
    }

    /// Top surface height.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.max.y
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Strict overlap test: boxes that merely touch do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Whether the XZ footprint of this box covers the point (min edges inclusive).
    #[must_use]
    pub fn covers_xz(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x < self.max.x && z >= self.min.z && z < self.max.z
    }

    /// Whether the XZ footprints of two boxes overlap (strict).
    #[must_use]
    pub fn overlaps_xz(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Whether the point lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test. Returns the entry distance along `dir` (unit length) within
    /// `max_distance`, or `None` on a miss. A ray starting inside the box hits
    /// at distance zero.
    #[must_use]
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];

            if d.abs() <= EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Result of a ray cast against the collider set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Index of the collider that was hit.
    pub collider: usize,
}

/// Immutable static world geometry plus the arena floor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColliderSet {
    boxes: Vec<Aabb>,
    floor: f32,
}

impl ColliderSet {
    /// Empty arena with a floor at `floor`.
    #[must_use]
    pub fn new(floor: f32) -> Self {
        Self {
            boxes: Vec::new(),
            floor,
        }
    }

    /// Arena with the given boxes and a floor at zero.
    #[must_use]
    pub fn with_boxes(boxes: Vec<Aabb>) -> Self {
        Self { boxes, floor: 0.0 }
    }

    /// Add a collider.
    pub fn push(&mut self, aabb: Aabb) {
        self.boxes.push(aabb);
    }

    /// All colliders.
    #[must_use]
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Floor height.
    #[must_use]
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether there are no colliders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Highest collider top, or the floor when there are none.
    #[must_use]
    pub fn ceiling(&self) -> f32 {
        self.boxes.iter().map(Aabb::top).fold(self.floor, f32::max)
    }

    /// Nearest collider hit along `dir` within `max_distance`.
    ///
    /// `dir` need not be normalised; a zero direction never hits.
    #[must_use]
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit> {
        let dir = crate::math::safe_normalize(dir)?;
        let mut best: Option<RayHit> = None;
        for (i, aabb) in self.boxes.iter().enumerate() {
            if let Some(distance) = aabb.ray_distance(origin, dir, max_distance) {
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit {
                        distance,
                        point: origin + dir * distance,
                        collider: i,
                    });
                }
            }
        }
        best
    }

    /// Whether any collider lies strictly between `from` and `to`.
    #[must_use]
    pub fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let len = delta.length();
        if len <= EPSILON {
            return false;
        }
        self.raycast(from, delta, len - EPSILON).is_some()
    }

    /// Whether `probe` intersects any collider.
    #[must_use]
    pub fn overlaps(&self, probe: &Aabb) -> bool {
        self.boxes.iter().any(|b| b.intersects(probe))
    }

    /// Ground height under `(x, z)` as seen from `probe_top` looking down.
    ///
    /// Uses a downward ray; when it misses, falls back to the highest top of
    /// any collider overlapping the `half_extent` footprint that is not above
    /// `probe_top`; otherwise the floor.
    #[must_use]
    pub fn ground_height(&self, x: f32, z: f32, probe_top: f32, half_extent: f32) -> f32 {
        let origin = Vec3::new(x, probe_top, z);
        let drop = probe_top - self.floor;
        if drop > 0.0 {
            if let Some(hit) = self.raycast(origin, Vec3::NEG_Y, drop) {
                return hit.point.y.max(self.floor);
            }
        }

        let footprint = Aabb::new(
            Vec3::new(x - half_extent, self.floor, z - half_extent),
            Vec3::new(x + half_extent, probe_top, z + half_extent),
        );
        self.boxes
            .iter()
            .filter(|b| b.overlaps_xz(&footprint) && b.top() <= probe_top + EPSILON)
            .map(Aabb::top)
            .fold(self.floor, f32::max)
    }
}
