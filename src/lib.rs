//! # Aquila
//!
//! **An articulated bird that flies a closed Catmull-Rom loop.**
//!
//! A [`Bird`] is seven rigid parts (body, head, tail, and an inner and outer segment per
//! wing) hung off a parent/child [`BirdRig`]. Each tick it steps along a [`FlightPath`],
//! turns to face its direction of travel, flaps its wings, and hands every part's world
//! transform to a [`RenderBackend`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use aquila::*;
//!
//! fn main() -> Result<(), BirdError> {
//!     let config = BirdConfig::default();
//!     let (mut bird, assets) = Bird::load(&config)?;
//!     let mut queue = DrawQueue::with_assets(assets);
//!
//!     loop {
//!         let frame = bird.compute_frame();
//!         frame.plan.submit(&mut queue);
//!         // ...upload queue.queued() to the GPU...
//!         queue.clear_queue();
//!     }
//! }
//! ```
//!
//! Renderers built around a matrix stack can drive the bird in immediate mode instead:
//! implement [`TransformStack`] and call [`Bird::render`] once per frame.
//!
//! ## Conventions
//!
//! - `+Y` is up and the bird's rest heading is `+Z`; `+X` is the bird's left.
//! - Angles at the API surface are degrees; the animation phase is radians.
//! - Matrices compose by post-multiplication, like a classic fixed-function stack.

mod bird;
mod config;
mod draw_queue;
mod geometry;
mod heading;
mod path;
mod rig;
mod texture;
mod transform;

pub use bird::{Bird, BirdError, FigurePose, FlightFlags, FlightFrame};
pub use config::{
    AnimationConfig, AssetPaths, BirdConfig, ConfigError, FlightConfig, PartOffset, RigConfig,
};
pub use draw_queue::{AssetError, BirdAssets, DrawQueue, QueuedPart, RenderBackend};
pub use geometry::{GeometryError, PendingGeometry, RawGeometry, Vertex3d};
pub use heading::{HeadingResolver, signed_yaw_degrees};
pub use path::{
    FlightPath, MAX_SEGMENT_STEPS, MIN_WAYPOINTS, PathCursor, PathError, Waypoints, catmull_rom,
    segment_steps,
};
pub use rig::{BirdPart, BirdRig, DrawPlan, Motion, PartDraw, PartNode};
pub use texture::{TextureError, TextureImage};
pub use transform::{
    AxisRotation, LocalOp, MatrixStack, Transform, TransformStack, compose, with_scope,
};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
