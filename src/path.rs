//! Closed-loop flight path evaluated as a uniform Catmull-Rom spline.
//!
//! A [`FlightPath`] walks a fixed ring of [`Waypoints`] one tick at a time. Each segment
//! between two consecutive waypoints is split into a number of steps proportional to its
//! length, so the bird covers roughly the same distance per tick no matter how the
//! waypoints are spaced.
//!
//! ```
//! use aquila::{FlightPath, Vec3, Waypoints};
//!
//! let waypoints = Waypoints::new(vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(4.0, 0.0, 0.0),
//!     Vec3::new(4.0, 0.0, 4.0),
//!     Vec3::new(0.0, 0.0, 4.0),
//! ])
//! .unwrap();
//!
//! let mut path = FlightPath::new(waypoints, 15.0, 0.0);
//! let start = path.advance();
//! assert_eq!(start, Vec3::ZERO);
//! ```

use glam::Vec3;
use thiserror::Error;

/// Minimum number of waypoints: one segment needs four control points.
pub const MIN_WAYPOINTS: usize = 4;

/// Largest step count a configured segment may take; see
/// [`BirdConfig::validate`](crate::BirdConfig::validate).
pub const MAX_SEGMENT_STEPS: usize = 1 << 20;

/// Errors raised while building a path.
#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("a closed flight path needs at least 4 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("waypoint {index} is not finite: {point}")]
    NonFinite { index: usize, point: Vec3 },
}

/// A closed loop of control points. Index `len - 1` connects back to index `0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoints {
    points: Vec<Vec3>,
}

impl Waypoints {
    /// Validates and wraps a loop of at least [`MIN_WAYPOINTS`] finite points.
    pub fn new(points: Vec<Vec3>) -> Result<Self, PathError> {
        if points.len() < MIN_WAYPOINTS {
            return Err(PathError::TooFewWaypoints(points.len()));
        }
        if let Some((index, &point)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(PathError::NonFinite { index, point });
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Waypoint at `index`, wrapping in both directions.
    pub fn get(&self, index: isize) -> Vec3 {
        let len = self.points.len() as isize;
        self.points[index.rem_euclid(len) as usize]
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.points
    }

    /// The four control points `(i-1, i, i+1, i+2)` for the segment starting at `index`.
    pub fn control_points(&self, index: usize) -> [Vec3; 4] {
        let i = index as isize;
        [self.get(i - 1), self.get(i), self.get(i + 1), self.get(i + 2)]
    }

    /// Straight-line length of the segment starting at `index`.
    pub fn segment_length(&self, index: usize) -> f32 {
        let [_, p2, p3, _] = self.control_points(index);
        (p3 - p2).length()
    }
}

/// Number of interpolation steps for a segment of `length` at speed scale `k`.
///
/// Never returns zero: coincident waypoints (or a non-finite product) collapse to a
/// single-step segment.
pub fn segment_steps(length: f32, k: f32) -> usize {
    let steps = (length * k).ceil();
    if steps.is_finite() && steps >= 1.0 {
        steps as usize
    } else {
        1
    }
}

/// Evaluates one scalar channel of the uniform Catmull-Rom basis.
#[inline]
fn catmull_rom_channel(p1: f32, p2: f32, p3: f32, p4: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    p2 + 0.5 * t * (-p1 + p3)
        + t2 * (p1 - 2.5 * p2 + 2.0 * p3 - 0.5 * p4)
        + t3 * (-0.5 * p1 + 1.5 * p2 - 1.5 * p3 + 0.5 * p4)
}

/// Catmull-Rom interpolation between `p2` and `p3` on the XZ plane.
///
/// The result's Y is fixed at `altitude`; the waypoints' own heights are ignored.
pub fn catmull_rom(points: [Vec3; 4], t: f32, altitude: f32) -> Vec3 {
    let [p1, p2, p3, p4] = points;
    Vec3::new(
        catmull_rom_channel(p1.x, p2.x, p3.x, p4.x, t),
        altitude,
        catmull_rom_channel(p1.z, p2.z, p3.z, p4.z, t),
    )
}

/// Where the evaluator currently is along the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathCursor {
    /// Waypoint index the active segment starts at.
    pub segment: usize,
    /// Step within the active segment, `0..steps`.
    pub step: usize,
    /// Steps in the active segment, set whenever a segment is entered.
    pub steps: usize,
}

/// Follows a [`Waypoints`] loop, one position per [`advance`](Self::advance).
#[derive(Clone, Debug)]
pub struct FlightPath {
    waypoints: Waypoints,
    speed_scale: f32,
    altitude: f32,
    cursor: PathCursor,
}

impl FlightPath {
    /// Creates an evaluator at the start of segment 0.
    ///
    /// `speed_scale` is the steps-per-unit-length constant: larger values mean more
    /// steps per segment and therefore slower apparent motion.
    pub fn new(waypoints: Waypoints, speed_scale: f32, altitude: f32) -> Self {
        let mut path = Self {
            waypoints,
            speed_scale,
            altitude,
            cursor: PathCursor::default(),
        };
        path.enter_segment(0);
        path
    }

    pub fn waypoints(&self) -> &Waypoints {
        &self.waypoints
    }

    pub fn cursor(&self) -> PathCursor {
        self.cursor
    }

    pub fn speed_scale(&self) -> f32 {
        self.speed_scale
    }

    /// Rewinds to the start of segment 0.
    pub fn reset(&mut self) {
        self.enter_segment(0);
    }

    /// Steps the segment starting at `index` is split into.
    pub fn steps_for_segment(&self, index: usize) -> usize {
        segment_steps(self.waypoints.segment_length(index), self.speed_scale)
    }

    /// Total ticks for one full loop, saturating at `usize::MAX`.
    pub fn loop_steps(&self) -> usize {
        (0..self.waypoints.len())
            .map(|i| self.steps_for_segment(i))
            .fold(0, usize::saturating_add)
    }

    fn enter_segment(&mut self, segment: usize) {
        let steps = self.steps_for_segment(segment);
        log::debug!(
            "entering segment {} (length {:.3}, {} steps)",
            segment,
            self.waypoints.segment_length(segment),
            steps
        );
        self.cursor = PathCursor {
            segment,
            step: 0,
            steps,
        };
    }

    /// Samples the current position and moves the cursor one step forward.
    pub fn advance(&mut self) -> Vec3 {
        let points = self.waypoints.control_points(self.cursor.segment);
        let t = self.cursor.step as f32 / self.cursor.steps as f32;
        let position = catmull_rom(points, t, self.altitude);

        self.cursor.step += 1;
        if self.cursor.step >= self.cursor.steps {
            self.enter_segment((self.cursor.segment + 1) % self.waypoints.len());
        }

        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Waypoints {
        Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_short_loops() {
        let err = Waypoints::new(vec![Vec3::ZERO, Vec3::X, Vec3::Z]).unwrap_err();
        assert_eq!(err, PathError::TooFewWaypoints(3));
    }

    #[test]
    fn rejects_non_finite_points() {
        let err = Waypoints::new(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::Z,
        ])
        .unwrap_err();
        assert!(matches!(err, PathError::NonFinite { index: 2, .. }));
    }

    #[test]
    fn control_points_wrap() {
        let w = square();
        let [p1, p2, p3, p4] = w.control_points(0);
        assert_eq!(p1, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(p2, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(p3, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(p4, Vec3::new(4.0, 0.0, 4.0));

        let [_, _, p3, p4] = w.control_points(3);
        assert_eq!(p3, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(p4, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn square_first_segment_takes_sixty_steps() {
        let mut path = FlightPath::new(square(), 15.0, 0.0);
        assert_eq!(path.steps_for_segment(0), 60);

        for _ in 0..59 {
            path.advance();
            assert_eq!(path.cursor().segment, 0);
        }
        path.advance();

        assert_eq!(
            path.cursor(),
            PathCursor {
                segment: 1,
                step: 0,
                steps: 60
            }
        );
        // The next sample starts segment 1 exactly on waypoint 1.
        assert_eq!(path.advance(), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn curve_starts_at_p2_and_ends_near_p3() {
        let w = square();
        let points = w.control_points(0);
        assert_eq!(catmull_rom(points, 0.0, 0.0), points[1]);
        assert!(catmull_rom(points, 1.0, 0.0).abs_diff_eq(points[2], 1e-5));

        let mut path = FlightPath::new(w, 15.0, 0.0);
        let mut last = Vec3::ZERO;
        for _ in 0..60 {
            last = path.advance();
        }
        let one_step = 4.0 / 60.0;
        assert!(last.distance(points[2]) <= one_step);
        assert!(last.distance(points[2]) > 0.0);
    }

    #[test]
    fn full_loop_returns_cursor_to_start() {
        let mut path = FlightPath::new(square(), 15.0, 0.0);
        let total = path.loop_steps();
        assert_eq!(total, 240);

        let first = path.advance();
        for _ in 1..total {
            path.advance();
        }
        assert_eq!(path.cursor().segment, 0);
        assert_eq!(path.cursor().step, 0);
        assert_eq!(path.advance(), first);
    }

    #[test]
    fn uneven_loop_closes_too() {
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(7.3, 0.0, 1.1),
            Vec3::new(5.0, 0.0, 9.4),
            Vec3::new(-2.2, 0.0, 6.0),
            Vec3::new(-3.0, 0.0, 2.5),
        ])
        .unwrap();
        let mut path = FlightPath::new(w, 9.0, 1.0);
        for _ in 0..path.loop_steps() {
            path.advance();
        }
        assert_eq!(path.cursor().segment, 0);
        assert_eq!(path.cursor().step, 0);
    }

    #[test]
    fn step_count_scales_with_length() {
        let k = 15.0;
        let short = segment_steps(1.7, k);
        let long = segment_steps(3.4, k);
        assert!(long.abs_diff(2 * short) <= 1);

        // Same property observed through the evaluator.
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 5.0),
        ])
        .unwrap();
        let path = FlightPath::new(w, k, 0.0);
        assert_eq!(path.steps_for_segment(0), 30);
        assert_eq!(path.steps_for_segment(1), 60);
    }

    #[test]
    fn step_count_is_updated_on_wrap() {
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 5.0),
        ])
        .unwrap();
        let mut path = FlightPath::new(w, 15.0, 0.0);
        assert_eq!(path.cursor().steps, 30);

        for _ in 0..30 {
            path.advance();
        }
        assert_eq!(
            path.cursor(),
            PathCursor {
                segment: 1,
                step: 0,
                steps: 60
            }
        );
    }

    #[test]
    fn huge_loops_saturate_instead_of_overflowing() {
        let side = 1e18;
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(side, 0.0, 0.0),
            Vec3::new(side, 0.0, side),
            Vec3::new(0.0, 0.0, side),
        ])
        .unwrap();
        let mut path = FlightPath::new(w, 15.0, 0.0);
        assert!(path.steps_for_segment(0) > usize::MAX / 4);
        assert_eq!(path.loop_steps(), usize::MAX);
        assert!(path.advance().is_finite());
    }

    #[test]
    fn coincident_waypoints_take_one_step() {
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 4.0),
        ])
        .unwrap();
        let mut path = FlightPath::new(w, 15.0, 0.0);
        assert_eq!(path.steps_for_segment(0), 1);

        let p = path.advance();
        assert!(p.is_finite());
        assert_eq!(path.cursor().segment, 1);

        for _ in 0..path.loop_steps() * 2 {
            assert!(path.advance().is_finite());
        }
    }

    #[test]
    fn degenerate_step_inputs_clamp_to_one() {
        assert_eq!(segment_steps(0.0, 15.0), 1);
        assert_eq!(segment_steps(f32::NAN, 15.0), 1);
        assert_eq!(segment_steps(4.0, 15.0), 60);
        assert_eq!(segment_steps(4.01, 15.0), 61);
    }

    #[test]
    fn altitude_is_fixed() {
        let w = Waypoints::new(vec![
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(4.0, -3.0, 0.0),
            Vec3::new(4.0, 2.0, 4.0),
            Vec3::new(0.0, 9.0, 4.0),
        ])
        .unwrap();
        let mut path = FlightPath::new(w, 15.0, 2.5);
        for _ in 0..100 {
            assert_eq!(path.advance().y, 2.5);
        }
    }

    #[test]
    fn reset_rewinds() {
        let mut path = FlightPath::new(square(), 15.0, 0.0);
        let first = path.advance();
        for _ in 0..75 {
            path.advance();
        }
        path.reset();
        assert_eq!(
            path.cursor(),
            PathCursor {
                segment: 0,
                step: 0,
                steps: 60
            }
        );
        assert_eq!(path.advance(), first);
    }
}
