//! Fire-and-forget effect and audio collaborators.
//!
//! Behaviours never call these directly: they queue [`FxRequest`]s on the
//! command buffer and the manager dispatches them after the agent pass to
//! whichever collaborators are installed. Missing collaborators drop the
//! requests silently.

use crate::agent::AgentKind;
use crate::math::Vec3;

/// Telegraph ring colours.
pub mod colors {
    /// Incoming area attack.
    pub const DANGER: u32 = 0x00FF_3B30;
    /// Boss ability windup.
    pub const WARNING: u32 = 0x00FF_9F0A;
    /// Heal window.
    pub const HEAL: u32 = 0x0034_C759;
    /// Spawn marker.
    pub const SPAWN: u32 = 0x00BF_5AF2;
    /// Lightning.
    pub const STORM: u32 = 0x000A_84FF;
    /// Ranged aim line.
    pub const AIM: u32 = 0x00FF_D60A;
}

/// Visual effect sink.
pub trait Effects: std::fmt::Debug {
    /// Flat ring on the ground.
    fn ring(&mut self, position: Vec3, radius: f32, color: u32);
    /// Ground-slam burst.
    fn ground_slam(&mut self, position: Vec3, radius: f32);
    /// Thin line between two points, redrawn every frame it is requested.
    fn line(&mut self, from: Vec3, to: Vec3, color: u32);
}

/// Audio sink.
pub trait Audio: std::fmt::Debug {
    /// Archetype vocal cue.
    fn vocal(&mut self, kind: AgentKind);
}

/// Queued effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FxRequest {
    /// See [`Effects::ring`].
    Ring {
        /// Centre.
        position: Vec3,
        /// Radius.
        radius: f32,
        /// `0xRRGGBB`.
        color: u32,
    },
    /// See [`Effects::ground_slam`].
    GroundSlam {
        /// Centre.
        position: Vec3,
        /// Radius.
        radius: f32,
    },
    /// See [`Effects::line`].
    Line {
        /// Start point.
        from: Vec3,
        /// End point.
        to: Vec3,
        /// `0xRRGGBB`.
        color: u32,
    },
    /// See [`Audio::vocal`].
    Vocal(AgentKind),
}

/// Route queued requests to the installed collaborators.
pub fn dispatch(
    requests: impl IntoIterator<Item = FxRequest>,
    effects: Option<&mut (dyn Effects + 'static)>,
    audio: Option<&mut (dyn Audio + 'static)>,
) {
    let mut effects = effects;
    let mut audio = audio;
    for request in requests {
        match request {
            FxRequest::Ring {
                position,
                radius,
                color,
            } => {
                if let Some(fx) = effects.as_deref_mut() {
                    fx.ring(position, radius, color);
                }
            }
            FxRequest::GroundSlam { position, radius } => {
                if let Some(fx) = effects.as_deref_mut() {
                    fx.ground_slam(position, radius);
                }
            }
            FxRequest::Line { from, to, color } => {
                if let Some(fx) = effects.as_deref_mut() {
                    fx.line(from, to, color);
                }
            }
            FxRequest::Vocal(kind) => {
                if let Some(a) = audio.as_deref_mut() {
                    a.vocal(kind);
                }
            }
        }
    }
}

/// Effects sink that records every call, for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingEffects {
    /// Every request received, in order.
    pub log: Vec<FxRequest>,
}

impl Effects for RecordingEffects {
    fn ring(&mut self, position: Vec3, radius: f32, color: u32) {
        self.log.push(FxRequest::Ring {
            position,
            radius,
            color,
        });
    }

    fn ground_slam(&mut self, position: Vec3, radius: f32) {
        self.log.push(FxRequest::GroundSlam { position, radius });
    }

    fn line(&mut self, from: Vec3, to: Vec3, color: u32) {
        self.log.push(FxRequest::Line { from, to, color });
    }
}
