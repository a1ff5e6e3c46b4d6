//! The flying, flapping bird.
//!
//! [`Bird`] ties the pieces together: a [`FlightPath`] for where it is, a
//! [`HeadingResolver`] for which way it faces, and a [`BirdRig`] for how its parts hang
//! together. Two independent flags control it: `moving` advances it along the path and
//! `animating` turns on the wing flap and body bob.
//!
//! There are two ways to drive it each frame:
//!
//! - [`Bird::compute_frame`] mutates the state once and returns a [`FlightFrame`] holding
//!   the pose and a ready-to-submit [`DrawPlan`].
//! - [`Bird::render`] does the same onto a caller-supplied [`TransformStack`], in the
//!   `fly` / `draw` / `inc` order of an immediate-mode renderer.
//!
//! ```
//! use aquila::{Bird, BirdConfig, DrawQueue};
//!
//! let mut bird = Bird::new(&BirdConfig::default()).unwrap();
//! let mut queue = DrawQueue::new();
//!
//! for _ in 0..3 {
//!     let frame = bird.compute_frame();
//!     frame.plan.submit(&mut queue);
//! }
//! assert_eq!(queue.queued().len(), 3 * 7);
//! ```

use glam::Vec3;
use thiserror::Error;

use crate::config::{AssetPaths, BirdConfig, ConfigError};
use crate::draw_queue::{AssetError, BirdAssets, RenderBackend};
use crate::heading::HeadingResolver;
use crate::path::{FlightPath, PathError};
use crate::rig::{BirdRig, DrawPlan};
use crate::transform::{Transform, TransformStack, with_scope};

#[derive(Debug, Error)]
pub enum BirdError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Assets(#[from] AssetError),
}

/// Independent switches for path following and part animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlightFlags {
    pub moving: bool,
    pub animating: bool,
}

impl Default for FlightFlags {
    fn default() -> Self {
        Self {
            moving: true,
            animating: true,
        }
    }
}

/// Mutable per-figure state, advanced once per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigurePose {
    /// Where the figure will be placed on the next moving tick.
    pub position: Vec3,
    /// Unit direction of travel.
    pub direction: Vec3,
    /// Last resolved yaw about `+Y`, in degrees.
    pub yaw_degrees: f32,
    /// Animation phase in radians; grows by the configured increment every tick.
    pub phase: f32,
}

/// Output of one [`Bird::compute_frame`] tick.
#[derive(Clone, Debug)]
pub struct FlightFrame {
    /// State after the tick.
    pub pose: FigurePose,
    /// Global translation, yaw, and scale the plan was built with.
    pub placement: Transform,
    pub plan: DrawPlan,
}

#[derive(Clone, Debug)]
pub struct Bird {
    path: FlightPath,
    heading: HeadingResolver,
    rig: BirdRig,
    flags: FlightFlags,
    pose: FigurePose,
    placement: Transform,
    scale: f32,
    phase_increment: f32,
}

impl Bird {
    /// Builds a bird from a validated configuration.
    ///
    /// The path is sampled once so the bird starts on its first waypoint.
    pub fn new(config: &BirdConfig) -> Result<Self, BirdError> {
        config.validate()?;

        let flight = &config.flight;
        let mut path = FlightPath::new(flight.waypoints()?, flight.speed_scale, flight.altitude);
        let position = path.advance();
        let heading = HeadingResolver::new(flight.start_direction);

        Ok(Self {
            path,
            heading,
            rig: BirdRig::from_config(&config.rig, &config.animation),
            flags: FlightFlags::default(),
            pose: FigurePose {
                position,
                direction: flight.start_direction.normalize_or_zero(),
                yaw_degrees: 0.0,
                phase: 0.0,
            },
            placement: Transform::from_position(position).uniform_scale(flight.scale),
            scale: flight.scale,
            phase_increment: config.animation.phase_increment,
        })
    }

    /// Builds a bird and loads its meshes and texture.
    ///
    /// Uses `config.assets`, or the default layout when none is configured. Any missing
    /// file fails the whole construction.
    pub fn load(config: &BirdConfig) -> Result<(Self, BirdAssets), BirdError> {
        let bird = Self::new(config)?;
        let paths = config.assets.clone().unwrap_or_else(AssetPaths::default);
        let assets = BirdAssets::load(&paths)?;
        Ok((bird, assets))
    }

    pub fn flags(&self) -> FlightFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FlightFlags) {
        self.flags = flags;
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.flags.moving = moving;
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.flags.animating = animating;
    }

    pub fn pose(&self) -> &FigurePose {
        &self.pose
    }

    /// The placement applied on the most recent tick.
    pub fn placement(&self) -> Transform {
        self.placement
    }

    pub fn path(&self) -> &FlightPath {
        &self.path
    }

    pub fn rig(&self) -> &BirdRig {
        &self.rig
    }

    // The phase handed to the rig, or None when animation is off.
    fn animation_phase(&self) -> Option<f32> {
        self.flags.animating.then_some(self.pose.phase)
    }

    /// Moves one step along the path if moving, and returns the placement to draw at.
    ///
    /// The figure is placed at its current position, facing the next one; the next
    /// position then becomes current. A stopped figure keeps its last placement.
    fn step_flight(&mut self) -> Transform {
        if !self.flags.moving {
            return self.placement;
        }

        let current = self.pose.position;
        let next = self.path.advance();

        if let Some(direction) = self.heading.direction(current, next) {
            self.pose.direction = direction;
        }
        if let Some(yaw) = self.heading.resolve(current, next) {
            self.pose.yaw_degrees = yaw;
        }
        self.pose.position = next;

        self.placement = Transform::from_position(current)
            .yaw_degrees(self.pose.yaw_degrees)
            .uniform_scale(self.scale);
        self.placement
    }

    /// Advances the animation phase by one tick.
    pub fn inc(&mut self) {
        self.pose.phase += self.phase_increment;
    }

    /// Applies this tick's placement to `stack`, stepping along the path if moving.
    pub fn fly<S: TransformStack + ?Sized>(&mut self, stack: &mut S) {
        let placement = self.step_flight();
        placement.apply(stack);
    }

    /// Emits every part onto `stack` and `backend`; the stack depth is unchanged afterwards.
    pub fn draw<S, B>(&self, stack: &mut S, backend: &mut B)
    where
        S: TransformStack + ?Sized,
        B: RenderBackend + ?Sized,
    {
        self.rig.draw(stack, backend, self.animation_phase());
    }

    /// One full immediate-mode tick: `fly`, `draw`, and `inc` inside a single scope.
    pub fn render<S, B>(&mut self, stack: &mut S, backend: &mut B)
    where
        S: TransformStack + ?Sized,
        B: RenderBackend + ?Sized,
    {
        with_scope(stack, |stack| {
            self.fly(stack);
            self.draw(stack, backend);
        });
        self.inc();
    }

    /// One tick: step the path, resolve the heading, build the draw plan, advance the phase.
    pub fn compute_frame(&mut self) -> FlightFrame {
        let placement = self.step_flight();
        let plan = self.rig.plan(placement.matrix(), self.animation_phase());
        self.inc();

        log::trace!(
            "segment {} step {}: position {} yaw {:.2}",
            self.path.cursor().segment,
            self.path.cursor().step,
            placement.position,
            self.pose.yaw_degrees
        );

        FlightFrame {
            pose: self.pose,
            placement,
            plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_queue::DrawQueue;
    use crate::rig::BirdPart;
    use crate::transform::MatrixStack;
    use glam::Mat4;

    fn square_config() -> BirdConfig {
        let mut config = BirdConfig::default();
        config.flight.waypoints = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 4.0),
        ];
        config
    }

    #[test]
    fn starts_on_first_waypoint() {
        let bird = Bird::new(&square_config()).unwrap();
        assert_eq!(bird.pose().position, Vec3::ZERO);
        assert_eq!(bird.path().cursor().step, 1);
    }

    #[test]
    fn rejects_short_paths() {
        let mut config = square_config();
        config.flight.waypoints.pop();
        let err = Bird::new(&config).unwrap_err();
        assert!(matches!(
            err,
            BirdError::Config(ConfigError::Path(PathError::TooFewWaypoints(3)))
        ));
    }

    #[test]
    fn heading_follows_travel() {
        let mut bird = Bird::new(&square_config()).unwrap();

        // Leaving the corner the spline cuts diagonally toward +X, -Z.
        let frame = bird.compute_frame();
        assert_eq!(frame.placement.position, Vec3::ZERO);
        assert!((frame.pose.yaw_degrees - 135.0).abs() < 5.0);

        // Mid-way along the first side the bird flies straight along +X.
        for _ in 1..30 {
            bird.compute_frame();
        }
        let yaw = bird.pose().yaw_degrees;
        assert!((yaw - 90.0).abs() < 5.0, "yaw {yaw}");

        // Mid-way along the third side it flies back along -X.
        for _ in 0..120 {
            bird.compute_frame();
        }
        let yaw = bird.pose().yaw_degrees;
        assert!((yaw + 90.0).abs() < 5.0, "yaw {yaw}");
    }

    #[test]
    fn placement_lags_one_sample_behind_position() {
        let mut bird = Bird::new(&square_config()).unwrap();
        let before = bird.pose().position;
        let frame = bird.compute_frame();
        assert_eq!(frame.placement.position, before);
        assert_ne!(frame.pose.position, before);
    }

    #[test]
    fn stopped_bird_keeps_last_placement() {
        let mut bird = Bird::new(&square_config()).unwrap();
        for _ in 0..10 {
            bird.compute_frame();
        }
        let last = bird.placement();
        let cursor = bird.path().cursor();

        bird.set_moving(false);
        for _ in 0..5 {
            let frame = bird.compute_frame();
            assert_eq!(frame.placement, last);
        }
        assert_eq!(bird.path().cursor(), cursor);
    }

    #[test]
    fn phase_advances_even_when_still() {
        let mut bird = Bird::new(&square_config()).unwrap();
        bird.set_flags(FlightFlags {
            moving: false,
            animating: true,
        });
        for _ in 0..4 {
            bird.compute_frame();
        }
        assert!((bird.pose().phase - 0.4).abs() < 1e-6);
    }

    #[test]
    fn animation_flag_controls_wings() {
        let mut config = square_config();
        config.animation.phase_increment = 1.0;

        let mut flapping = Bird::new(&config).unwrap();
        let mut rigid = Bird::new(&config).unwrap();
        rigid.set_animating(false);

        // Phase is 1.0 on the second tick.
        flapping.compute_frame();
        rigid.compute_frame();
        let a = flapping.compute_frame();
        let b = rigid.compute_frame();

        assert_eq!(a.placement, b.placement);
        let wing_a = a.plan.transform(BirdPart::LeftWingInner).unwrap();
        let wing_b = b.plan.transform(BirdPart::LeftWingInner).unwrap();
        assert!(!wing_a.abs_diff_eq(wing_b, 1e-4));

        let rest = rigid.rig().plan(b.placement.matrix(), None);
        assert_eq!(rest, b.plan);
    }

    #[test]
    fn immediate_mode_matches_compute_frame() {
        let config = square_config();
        let mut planned = Bird::new(&config).unwrap();
        let mut immediate = Bird::new(&config).unwrap();

        for _ in 0..75 {
            let frame = planned.compute_frame();

            let mut stack = MatrixStack::new();
            let mut queue = DrawQueue::new();
            immediate.render(&mut stack, &mut queue);

            assert_eq!(stack.depth(), 1);
            assert!(stack.current().abs_diff_eq(Mat4::IDENTITY, 0.0));
            assert_eq!(queue.queued().len(), frame.plan.len());
            for (queued, draw) in queue.queued().iter().zip(frame.plan.iter()) {
                assert_eq!(queued.part, draw.part);
                assert!(queued.transform.abs_diff_eq(draw.transform, 1e-4));
            }
        }
        assert_eq!(planned.pose(), immediate.pose());
    }

    #[test]
    fn full_loop_returns_to_start() {
        let mut bird = Bird::new(&square_config()).unwrap();
        let start = bird.pose().position;
        let ticks = bird.path().loop_steps();
        for _ in 0..ticks {
            bird.compute_frame();
        }
        assert!(bird.pose().position.abs_diff_eq(start, 1e-5));
    }
}
