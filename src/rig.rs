//! The articulated bird as an explicit transform hierarchy.
//!
//! Each rigid part is a [`PartNode`] holding its parent's index and the local ops that
//! attach it to that parent. World transforms are composed parent-first into a
//! [`DrawPlan`], so the hierarchy can be evaluated and tested without any rendering
//! backend. The same tree can also be replayed onto a [`TransformStack`] with
//! [`BirdRig::draw`]; every scope it opens is closed by [`with_scope`].
//!
//! ```text
//! figure (corrective tilt)
//! └── body            bob + pitch
//!     ├── head
//!     ├── tail
//!     ├── left inner  flap about +Z
//!     │   └── left outer   flap about +Z
//!     └── right inner flap about -Z
//!         └── right outer  flap about -Z
//! ```

use glam::{Mat4, Vec3};

use crate::config::{AnimationConfig, PartOffset, RigConfig};
use crate::draw_queue::RenderBackend;
use crate::transform::{AxisRotation, LocalOp, TransformStack, compose, with_scope};

/// One rigid, independently modeled piece of the bird.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BirdPart {
    Body,
    Head,
    Tail,
    LeftWingInner,
    LeftWingOuter,
    RightWingInner,
    RightWingOuter,
}

impl BirdPart {
    /// Every part, in draw order.
    pub const ALL: [BirdPart; 7] = [
        BirdPart::Body,
        BirdPart::Head,
        BirdPart::Tail,
        BirdPart::LeftWingInner,
        BirdPart::LeftWingOuter,
        BirdPart::RightWingInner,
        BirdPart::RightWingOuter,
    ];

    /// Position in [`BirdPart::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            BirdPart::Body => "body",
            BirdPart::Head => "head",
            BirdPart::Tail => "tail",
            BirdPart::LeftWingInner => "left wing (inner)",
            BirdPart::LeftWingOuter => "left wing (outer)",
            BirdPart::RightWingInner => "right wing (inner)",
            BirdPart::RightWingOuter => "right wing (outer)",
        }
    }
}

/// Periodic perturbation a node receives while animating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Placed only.
    Still,
    /// Vertical bob of `-amplitude·sin(phase)` then a pitch of `pitch_degrees·sin(phase)`.
    Bob { amplitude: f32, pitch_degrees: f32 },
    /// Rotation of `amplitude_degrees·sin(phase)` about `axis`.
    Flap { amplitude_degrees: f32, axis: Vec3 },
}

impl Motion {
    fn ops(&self, phase: f32) -> impl Iterator<Item = LocalOp> {
        let s = phase.sin();
        let ops: [Option<LocalOp>; 2] = match *self {
            Motion::Still => [None, None],
            Motion::Bob {
                amplitude,
                pitch_degrees,
            } => [
                Some(LocalOp::Translate(Vec3::new(0.0, -amplitude * s, 0.0))),
                Some(LocalOp::Rotate(AxisRotation::about_x(pitch_degrees * s))),
            ],
            Motion::Flap {
                amplitude_degrees,
                axis,
            } => [
                Some(LocalOp::Rotate(AxisRotation::new(amplitude_degrees * s, axis))),
                None,
            ],
        };
        ops.into_iter().flatten()
    }
}

/// A part in the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct PartNode {
    pub part: BirdPart,
    /// Index of the parent node; `None` for the body.
    pub parent: Option<usize>,
    /// Fixed attachment ops, applied before the motion.
    pub offset: Vec<LocalOp>,
    pub motion: Motion,
}

impl PartNode {
    fn new(
        part: BirdPart,
        parent: Option<usize>,
        offset: Option<&PartOffset>,
        motion: Motion,
    ) -> Self {
        Self {
            part,
            parent,
            offset: offset.map(|o| o.ops().collect()).unwrap_or_default(),
            motion,
        }
    }

    /// Local ops for this frame. `phase` is `None` when the figure is not animating.
    pub fn local_ops(&self, phase: Option<f32>) -> Vec<LocalOp> {
        let mut ops = self.offset.clone();
        if let Some(phase) = phase {
            ops.extend(self.motion.ops(phase));
        }
        ops
    }

    pub fn local_matrix(&self, phase: Option<f32>) -> Mat4 {
        compose(&self.local_ops(phase))
    }
}

/// One part's world transform for a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartDraw {
    pub part: BirdPart,
    pub transform: Mat4,
}

/// Ordered draws for a whole figure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawPlan {
    draws: Vec<PartDraw>,
}

impl DrawPlan {
    pub fn iter(&self) -> impl Iterator<Item = &PartDraw> {
        self.draws.iter()
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// World transform of `part`, if the plan draws it.
    pub fn transform(&self, part: BirdPart) -> Option<Mat4> {
        self.draws
            .iter()
            .find(|d| d.part == part)
            .map(|d| d.transform)
    }

    /// Forwards every draw, in order, to `backend`.
    pub fn submit<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        for draw in &self.draws {
            backend.draw_part(draw.part, draw.transform);
        }
    }
}

/// The bird's part hierarchy with its fixed offsets and motions.
#[derive(Clone, Debug, PartialEq)]
pub struct BirdRig {
    tilt_degrees: f32,
    // Parents always precede their children.
    nodes: Vec<PartNode>,
}

impl BirdRig {
    pub fn from_config(rig: &RigConfig, animation: &AnimationConfig) -> Self {
        let inner_flap = |axis| Motion::Flap {
            amplitude_degrees: animation.inner_flap_degrees,
            axis,
        };
        let outer_flap = |axis| Motion::Flap {
            amplitude_degrees: animation.outer_flap_degrees,
            axis,
        };
        let body_motion = Motion::Bob {
            amplitude: animation.body_bob,
            pitch_degrees: animation.body_pitch_degrees,
        };

        let node = |part, parent, motion| PartNode::new(part, parent, rig.offset(part), motion);

        let nodes = vec![
            node(BirdPart::Body, None, body_motion),
            node(BirdPart::Head, Some(0), Motion::Still),
            node(BirdPart::Tail, Some(0), Motion::Still),
            node(BirdPart::LeftWingInner, Some(0), inner_flap(Vec3::Z)),
            node(BirdPart::LeftWingOuter, Some(3), outer_flap(Vec3::Z)),
            node(BirdPart::RightWingInner, Some(0), inner_flap(Vec3::NEG_Z)),
            node(BirdPart::RightWingOuter, Some(5), outer_flap(Vec3::NEG_Z)),
        ];

        Self {
            tilt_degrees: rig.tilt_degrees,
            nodes,
        }
    }

    pub fn nodes(&self) -> &[PartNode] {
        &self.nodes
    }

    pub fn node(&self, part: BirdPart) -> Option<&PartNode> {
        self.nodes.iter().find(|n| n.part == part)
    }

    pub fn tilt_degrees(&self) -> f32 {
        self.tilt_degrees
    }

    fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Frame shared by every part: `placement` followed by the corrective tilt.
    pub fn figure_matrix(&self, placement: Mat4) -> Mat4 {
        placement * AxisRotation::about_x(self.tilt_degrees).matrix()
    }

    /// Composes every part's world transform.
    ///
    /// `phase` is `None` when the figure is not animating.
    pub fn plan(&self, placement: Mat4, phase: Option<f32>) -> DrawPlan {
        let figure = self.figure_matrix(placement);
        let mut world: Vec<Mat4> = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let parent = match node.parent {
                Some(index) => world[index],
                None => figure,
            };
            world.push(parent * node.local_matrix(phase));
        }

        let draws = self
            .nodes
            .iter()
            .zip(world)
            .map(|(node, transform)| PartDraw {
                part: node.part,
                transform,
            })
            .collect();

        DrawPlan { draws }
    }

    /// Replays the hierarchy onto `stack`, drawing each part at its deepest scope.
    ///
    /// The stack is left at the depth it had on entry.
    pub fn draw<S, B>(&self, stack: &mut S, backend: &mut B, phase: Option<f32>)
    where
        S: TransformStack + ?Sized,
        B: RenderBackend + ?Sized,
    {
        with_scope(stack, |stack| {
            stack.rotate(self.tilt_degrees, Vec3::X);
            for root in self.roots() {
                self.emit(root, stack, backend, phase);
            }
        });
    }

    fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
    }

    fn emit<S, B>(&self, index: usize, stack: &mut S, backend: &mut B, phase: Option<f32>)
    where
        S: TransformStack + ?Sized,
        B: RenderBackend + ?Sized,
    {
        let node = &self.nodes[index];
        with_scope(stack, |stack| {
            for op in node.local_ops(phase) {
                op.apply(stack);
            }
            backend.draw_part(node.part, stack.current());
            for child in self.children(index) {
                self.emit(child, stack, backend, phase);
            }
        });
    }
}
