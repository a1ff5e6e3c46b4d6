//! Spatial transforms and the scoped transform stack.
//!
//! This module provides the composition primitives the bird is assembled with:
//!
//! - [`Transform`]: Position, rotation, and scale for placing the whole figure in the world
//! - [`LocalOp`]: A single translate/rotate/scale step of a part's local transform
//! - [`TransformStack`]: The push/pop/apply interface a rendering backend exposes
//! - [`MatrixStack`]: A plain `Mat4` implementation of [`TransformStack`]
//!
//! # Scoped transforms
//!
//! [`with_scope`] pushes a scope, runs a closure, and pops the scope again, so a nested
//! drawing block can never leave its transform behind:
//!
//! ```
//! use aquila::{MatrixStack, TransformStack, Vec3, with_scope};
//!
//! let mut stack = MatrixStack::new();
//! with_scope(&mut stack, |stack| {
//!     stack.translate(Vec3::new(0.0, 1.0, 0.0));
//!     stack.rotate(90.0, Vec3::Y);
//! });
//! assert_eq!(stack.depth(), 1);
//! ```

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation, and scale of an object in world space.
///
/// Uses a fluent builder pattern:
///
/// ```
/// use aquila::{Transform, Vec3, Quat};
///
/// let transform = Transform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .rotation(Quat::from_rotation_y(0.5))
///     .uniform_scale(0.2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position (translation).
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    ///
    /// ```
    /// use aquila::{Transform, Vec3};
    ///
    /// let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Sets the position (translation) component.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation component using a quaternion.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the rotation to a yaw about the vertical axis, in degrees.
    pub fn yaw_degrees(mut self, degrees: f32) -> Self {
        self.rotation = Quat::from_rotation_y(degrees.to_radians());
        self
    }

    /// Sets non-uniform scale factors for each axis.
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets uniform scale on all axes.
    ///
    /// ```
    /// use aquila::{Transform, Vec3};
    ///
    /// let transform = Transform::new().uniform_scale(2.0);
    /// assert_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    /// ```
    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Converts this transform to a 4×4 matrix in SRT order (Scale, Rotate, Translate).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Replays this transform onto a stack as translate, rotate, scale.
    pub fn apply<S: TransformStack + ?Sized>(&self, stack: &mut S) {
        stack.translate(self.position);
        let (axis, angle) = self.rotation.to_axis_angle();
        if angle != 0.0 {
            stack.rotate(angle.to_degrees(), axis);
        }
        stack.scale(self.scale);
    }
}

/// A rotation of `degrees` about `axis`, in the right-handed sense.
///
/// Degrees are used here because the part offsets are authored that way.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRotation {
    pub degrees: f32,
    pub axis: Vec3,
}

impl AxisRotation {
    pub fn new(degrees: f32, axis: Vec3) -> Self {
        Self { degrees, axis }
    }

    pub fn about_x(degrees: f32) -> Self {
        Self::new(degrees, Vec3::X)
    }

    pub fn about_y(degrees: f32) -> Self {
        Self::new(degrees, Vec3::Y)
    }

    pub fn about_z(degrees: f32) -> Self {
        Self::new(degrees, Vec3::Z)
    }

    pub fn matrix(&self) -> Mat4 {
        rotation_matrix(self.degrees, self.axis)
    }
}

/// One step of a local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalOp {
    Translate(Vec3),
    Rotate(AxisRotation),
    Scale(Vec3),
}

impl LocalOp {
    pub fn matrix(&self) -> Mat4 {
        match self {
            LocalOp::Translate(offset) => Mat4::from_translation(*offset),
            LocalOp::Rotate(rotation) => rotation.matrix(),
            LocalOp::Scale(factors) => Mat4::from_scale(*factors),
        }
    }

    /// Applies this op to the top of `stack`.
    pub fn apply<S: TransformStack + ?Sized>(&self, stack: &mut S) {
        match *self {
            LocalOp::Translate(offset) => stack.translate(offset),
            LocalOp::Rotate(rotation) => stack.rotate(rotation.degrees, rotation.axis),
            LocalOp::Scale(factors) => stack.scale(factors),
        }
    }
}

/// Composes a sequence of ops left to right, each one post-multiplied.
pub fn compose(ops: &[LocalOp]) -> Mat4 {
    ops.iter().fold(Mat4::IDENTITY, |acc, op| acc * op.matrix())
}

// Zero-length axes would normalize to NaN; treat them as no rotation.
fn rotation_matrix(degrees: f32, axis: Vec3) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) => Mat4::from_axis_angle(axis, degrees.to_radians()),
        None => Mat4::IDENTITY,
    }
}

/// Nested scoped transform composition.
///
/// All operations post-multiply the current top-of-stack frame, so the most recently
/// applied op is the first one a vertex sees. `push_scope` and `pop_scope` must be
/// strictly paired; prefer [`with_scope`] which pairs them for you.
pub trait TransformStack {
    /// Duplicates the current frame so later ops can be undone by [`pop_scope`](Self::pop_scope).
    fn push_scope(&mut self);

    /// Restores the frame saved by the matching [`push_scope`](Self::push_scope).
    fn pop_scope(&mut self);

    fn translate(&mut self, offset: Vec3);

    /// Rotates by `degrees` about `axis`.
    fn rotate(&mut self, degrees: f32, axis: Vec3);

    fn scale(&mut self, factors: Vec3);

    /// The composed matrix of the current frame.
    fn current(&self) -> Mat4;
}

/// Runs `f` inside a pushed scope and pops it afterwards.
pub fn with_scope<S, R>(stack: &mut S, f: impl FnOnce(&mut S) -> R) -> R
where
    S: TransformStack + ?Sized,
{
    stack.push_scope();
    let result = f(stack);
    stack.pop_scope();
    result
}

/// A [`TransformStack`] over plain 4×4 matrices.
///
/// The stack always holds at least one frame (the base frame), so [`depth`](Self::depth)
/// starts at 1.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    frames: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    /// Creates a stack whose base frame is the identity.
    pub fn new() -> Self {
        Self::with_base(Mat4::IDENTITY)
    }

    /// Creates a stack whose base frame is `base` (e.g. a camera view matrix).
    pub fn with_base(base: Mat4) -> Self {
        Self { frames: vec![base] }
    }

    /// Number of frames, including the base frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn top_mut(&mut self) -> &mut Mat4 {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn multiply(&mut self, m: Mat4) {
        let top = self.top_mut();
        *top *= m;
    }
}

impl TransformStack for MatrixStack {
    fn push_scope(&mut self) {
        let top = self.current();
        self.frames.push(top);
    }

    fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            log::warn!("transform stack underflow: pop without matching push ignored");
        }
    }

    fn translate(&mut self, offset: Vec3) {
        self.multiply(Mat4::from_translation(offset));
    }

    fn rotate(&mut self, degrees: f32, axis: Vec3) {
        self.multiply(rotation_matrix(degrees, axis));
    }

    fn scale(&mut self, factors: Vec3) {
        self.multiply(Mat4::from_scale(factors));
    }

    fn current(&self) -> Mat4 {
        self.frames[self.frames.len() - 1]
    }
}
