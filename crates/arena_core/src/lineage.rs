//! Boss lineages and the rate-limited split spawner.
//!
//! A splitting boss spawns diminished copies of itself on death. The copies
//! share one [`LineageRecord`] that outlives any single member, and every
//! split goes through a global queue released a few spawns at a time. The
//! record's live count is reserved when a split is released, so the cap
//! holds no matter how long the queue grows.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::math::Vec3;

/// Lineage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineageId(pub u32);

/// Shared bookkeeping for one lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Identifier.
    pub id: LineageId,
    /// Archetype every member shares.
    pub kind: AgentKind,
    /// Live members, including reserved splits not yet registered.
    pub alive_descendants: u32,
    /// Maximum simultaneous live members.
    pub cap: u32,
    /// Members ever spawned, the root included.
    pub total_spawned: u32,
}

/// One queued copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRequest {
    /// Lineage the copy joins.
    pub lineage: LineageId,
    /// Generation of the copy.
    pub generation: u8,
    /// Where the parent died.
    pub position: Vec3,
    /// Body scale of the copy.
    pub scale: f32,
    /// Max-health multiplier of the copy.
    pub health_scale: f32,
}

/// All lineages plus the global split queue.
#[derive(Debug, Clone, Default)]
pub struct LineageTable {
    records: BTreeMap<LineageId, LineageRecord>,
    queue: VecDeque<SplitRequest>,
    cooldown: f32,
    next_id: u32,
}

impl LineageTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lineage whose root is already alive.
    pub fn create(&mut self, kind: AgentKind, cap: u32) -> LineageId {
        self.next_id += 1;
        let id = LineageId(self.next_id);
        self.records.insert(
            id,
            LineageRecord {
                id,
                kind,
                alive_descendants: 1,
                cap: cap.max(1),
                total_spawned: 1,
            },
        );
        tracing::debug!(lineage = id.0, ?kind, cap, "Lineage created");
        id
    }

    /// Record for a lineage.
    #[must_use]
    pub fn get(&self, id: LineageId) -> Option<&LineageRecord> {
        self.records.get(&id)
    }

    /// Queue a copy.
    pub fn enqueue(&mut self, request: SplitRequest) {
        self.queue.push_back(request);
    }

    /// Pending copies.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// A member left the arena.
    pub fn member_removed(&mut self, id: LineageId) {
        if let Some(record) = self.records.get_mut(&id) {
            record.alive_descendants = record.alive_descendants.saturating_sub(1);
        }
        self.prune();
    }

    /// Release up to `per_tick` queued copies if the interval has elapsed.
    ///
    /// Each released copy reserves a live slot on its lineage; copies that
    /// would exceed the cap are dropped. Call [`Self::member_removed`] if a
    /// released copy could not be registered.
    pub fn release(&mut self, dt: f32, per_tick: u32, interval: f32) -> Vec<SplitRequest> {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if self.cooldown > 0.0 || self.queue.is_empty() {
            return Vec::new();
        }

        let mut released = Vec::new();
        while released.len() < per_tick as usize {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            let Some(record) = self.records.get_mut(&request.lineage) else {
                continue;
            };
            if record.alive_descendants >= record.cap {
                tracing::warn!(
                    lineage = request.lineage.0,
                    alive = record.alive_descendants,
                    cap = record.cap,
                    "Split dropped at lineage population cap"
                );
                continue;
            }
            record.alive_descendants += 1;
            record.total_spawned += 1;
            released.push(request);
        }

        if !released.is_empty() {
            self.cooldown = interval;
        }
        self.prune();
        released
    }

    /// Whether any lineage still has live members or queued copies.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.queue.is_empty() || self.records.values().any(|r| r.alive_descendants > 0)
    }

    /// Live members across all lineages.
    #[must_use]
    pub fn alive_total(&self) -> u32 {
        self.records.values().map(|r| r.alive_descendants).sum()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.records.clear();
        self.queue.clear();
        self.cooldown = 0.0;
    }

    fn prune(&mut self) {
        let queue = &self.queue;
        self.records
            .retain(|id, r| r.alive_descendants > 0 || queue.iter().any(|q| q.lineage == *id));
    }
}
