//! Visual handles and the collaborator interfaces that produce and display them.
//!
//! The simulation never inspects geometry. A [`Rig`] is a root node, a head
//! node and a declared set of attachment nodes; behaviours only touch their
//! transforms, scale, emissive intensity and visibility.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, AgentKind, Transform};
use crate::math::{rotate_y, Vec3};

/// Named attachment point on a rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttachPoint {
    /// Left arm or claw.
    LeftArm,
    /// Right arm or weapon hand.
    RightArm,
    /// Projectile origin.
    Muzzle,
    /// Exposed weak spot.
    Weakpoint,
    /// Left wing.
    LeftWing,
    /// Right wing.
    RightWing,
    /// Numbered launch anchor.
    Hardpoint(u8),
    /// Glowing core.
    Core,
    /// Mouth or mandibles.
    Jaw,
}

impl AttachPoint {
    /// Canonical local offset for a unit-sized body (half-height 1).
    #[must_use]
    pub fn canonical_offset(self) -> Vec3 {
        match self {
            Self::LeftArm => Vec3::new(0.6, 0.3, 0.1),
            Self::RightArm => Vec3::new(-0.6, 0.3, 0.1),
            Self::Muzzle => Vec3::new(-0.55, 0.35, 0.7),
            Self::Weakpoint => Vec3::new(0.0, 0.2, -0.6),
            Self::LeftWing => Vec3::new(1.1, 0.1, 0.0),
            Self::RightWing => Vec3::new(-1.1, 0.1, 0.0),
            Self::Hardpoint(i) => {
                let angle = f32::from(i) * std::f32::consts::FRAC_PI_2 + std::f32::consts::FRAC_PI_4;
                Vec3::new(angle.sin() * 0.9, 0.6, angle.cos() * 0.9)
            }
            Self::Core => Vec3::new(0.0, 0.1, 0.0),
            Self::Jaw => Vec3::new(0.0, 0.5, 0.8),
        }
    }
}

/// One visual handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigNode {
    /// Offset from the parent (root-local for attachments).
    pub offset: Vec3,
    /// Euler rotation (pitch, yaw, roll).
    pub rotation: Vec3,
    /// Uniform scale.
    pub scale: f32,
    /// Material emissive intensity.
    pub emissive: f32,
    /// Visibility flag.
    pub visible: bool,
}

impl RigNode {
    /// Visible node at `offset`.
    #[must_use]
    pub fn at(offset: Vec3) -> Self {
        Self {
            offset,
            rotation: Vec3::ZERO,
            scale: 1.0,
            emissive: 0.0,
            visible: true,
        }
    }
}

impl Default for RigNode {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Display root, head and named attachments for one agent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rig {
    /// Display root; the manager copies the agent transform here.
    pub root: RigNode,
    /// Head handle, used for telegraph glows.
    pub head: RigNode,
    /// Declared attachment points.
    pub attachments: HashMap<AttachPoint, RigNode>,
}

impl Rig {
    /// Mutable attachment, if declared.
    pub fn attachment_mut(&mut self, point: AttachPoint) -> Option<&mut RigNode> {
        self.attachments.get_mut(&point)
    }

    /// Set emissive intensity on an attachment; missing points are ignored.
    pub fn set_emissive(&mut self, point: AttachPoint, intensity: f32) {
        if let Some(node) = self.attachments.get_mut(&point) {
            node.emissive = intensity;
        }
    }

    /// Show or hide an attachment; missing points are ignored.
    pub fn set_visible(&mut self, point: AttachPoint, visible: bool) {
        if let Some(node) = self.attachments.get_mut(&point) {
            node.visible = visible;
        }
    }

    /// Copy an agent transform onto the display root.
    pub fn sync_root(&mut self, transform: &Transform) {
        self.root.offset = transform.position;
        self.root.rotation = Vec3::new(transform.pitch, transform.yaw, transform.roll);
    }

    /// World position of an attachment for a body at `transform`, falling
    /// back to the body centre when the point is not declared.
    #[must_use]
    pub fn world_point(&self, point: AttachPoint, transform: &Transform) -> Vec3 {
        self.attachments.get(&point).map_or(transform.position, |node| {
            transform.position + rotate_y(node.offset * self.root.scale, transform.yaw)
        })
    }
}

/// Options handed to the asset factory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetOptions {
    /// Body palette as `0xRRGGBB`.
    pub palette: u32,
    /// Uniform scale.
    pub scale: f32,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            palette: 0x00B0_4A3C,
            scale: 1.0,
        }
    }
}

/// Builds fresh visual handles for an archetype.
///
/// Every call returns independent handles; implementations must provide every
/// point in [`AgentKind::attachment_schema`].
pub trait AssetFactory: std::fmt::Debug {
    /// Create a rig.
    fn create(&mut self, kind: AgentKind, options: &AssetOptions) -> Rig;
}

/// Headless factory that lays out the declared schema at canonical offsets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaAssetFactory;

impl AssetFactory for SchemaAssetFactory {
    fn create(&mut self, kind: AgentKind, options: &AssetOptions) -> Rig {
        let half_height = kind.body_shape().half_height;
        let attachments = kind
            .attachment_schema()
            .iter()
            .map(|&point| (point, RigNode::at(point.canonical_offset() * half_height)))
            .collect();
        Rig {
            root: RigNode {
                scale: options.scale,
                ..RigNode::default()
            },
            head: RigNode::at(Vec3::new(0.0, half_height * 0.8, 0.0)),
            attachments,
        }
    }
}

/// The scene graph the display roots live in.
pub trait SceneSink: std::fmt::Debug {
    /// Add an agent's display root.
    fn attach(&mut self, id: AgentId, rig: &Rig);
    /// Remove an agent's display root.
    fn detach(&mut self, id: AgentId);
    /// Whether the agent's root is in the scene.
    fn contains(&self, id: AgentId) -> bool;
    /// Number of attached roots.
    fn len(&self) -> usize;
    /// Whether the scene is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Membership-only scene.
#[derive(Debug, Default, Clone)]
pub struct SceneRoster {
    roots: HashSet<AgentId>,
}

impl SceneSink for SceneRoster {
    fn attach(&mut self, id: AgentId, _rig: &Rig) {
        self.roots.insert(id);
    }

    fn detach(&mut self, id: AgentId) {
        self.roots.remove(&id);
    }

    fn contains(&self, id: AgentId) -> bool {
        self.roots.contains(&id)
    }

    fn len(&self) -> usize {
        self.roots.len()
    }
}
