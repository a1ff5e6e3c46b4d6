//! Yaw from direction of travel.
//!
//! The bird's meshes face a fixed reference direction. Each frame the heading resolver
//! measures the angle between that reference and the horizontal direction of travel,
//! signed so the result can be fed straight into a rotation about `+Y`.

use glam::Vec3;

/// Signed angle in degrees from `reference` to `direction`, measured on the XZ plane.
///
/// Positive when `reference × direction` points up (`+Y`), i.e. a counter-clockwise turn
/// seen from above in a right-handed, Y-up frame. Returns `None` if either vector has no
/// horizontal extent.
///
/// ```
/// use aquila::{Vec3, signed_yaw_degrees};
///
/// let yaw = signed_yaw_degrees(Vec3::Z, Vec3::X).unwrap();
/// assert!((yaw - 90.0).abs() < 1e-4);
/// ```
pub fn signed_yaw_degrees(reference: Vec3, direction: Vec3) -> Option<f32> {
    let reference = flatten(reference)?;
    let direction = flatten(direction)?;

    let cos = reference.dot(direction).clamp(-1.0, 1.0);
    let angle = cos.acos().to_degrees();
    let sign = reference.cross(direction).y;

    Some(angle.copysign(sign))
}

// Drops the vertical component and normalizes, or None for vertical/zero vectors.
fn flatten(v: Vec3) -> Option<Vec3> {
    Vec3::new(v.x, 0.0, v.z).try_normalize()
}

/// Turns consecutive path samples into a yaw relative to a fixed start direction.
#[derive(Clone, Copy, Debug)]
pub struct HeadingResolver {
    start_direction: Vec3,
}

impl HeadingResolver {
    /// `start_direction` is the forward axis the figure's meshes are modeled facing.
    pub fn new(start_direction: Vec3) -> Self {
        Self { start_direction }
    }

    pub fn start_direction(&self) -> Vec3 {
        self.start_direction
    }

    /// Unit direction of travel from `previous` to `next`, or `None` if the figure
    /// did not move.
    pub fn direction(&self, previous: Vec3, next: Vec3) -> Option<Vec3> {
        (next - previous).try_normalize()
    }

    /// Yaw in degrees for moving from `previous` to `next`.
    ///
    /// `None` means "no change": the figure is stationary or moved straight up/down,
    /// and the caller should keep its previous heading.
    pub fn resolve(&self, previous: Vec3, next: Vec3) -> Option<f32> {
        let direction = self.direction(previous, next)?;
        signed_yaw_degrees(self.start_direction, direction)
    }
}

impl Default for HeadingResolver {
    fn default() -> Self {
        Self::new(Vec3::Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn quarter_turns_have_opposite_signs() {
        let right = signed_yaw_degrees(Vec3::Z, Vec3::X).unwrap();
        let left = signed_yaw_degrees(Vec3::Z, Vec3::NEG_X).unwrap();
        assert!(close(right, 90.0));
        assert!(close(left, -90.0));
    }

    #[test]
    fn straight_ahead_is_zero() {
        assert!(close(signed_yaw_degrees(Vec3::Z, Vec3::Z).unwrap(), 0.0));
        assert!(close(
            signed_yaw_degrees(Vec3::Z, Vec3::new(0.0, 3.0, 2.0)).unwrap(),
            0.0
        ));
    }

    #[test]
    fn reversing_is_half_turn() {
        let yaw = signed_yaw_degrees(Vec3::Z, Vec3::NEG_Z).unwrap();
        assert!(close(yaw.abs(), 180.0));
    }

    #[test]
    fn yaw_rotates_reference_onto_direction() {
        for direction in [
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-3.0, 0.0, 0.5),
            Vec3::new(0.2, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, -1.0),
        ] {
            let yaw = signed_yaw_degrees(Vec3::Z, direction).unwrap();
            let rotated = Quat::from_rotation_y(yaw.to_radians()) * Vec3::Z;
            assert!(rotated.abs_diff_eq(direction.normalize(), 1e-4));
        }
    }

    #[test]
    fn stationary_figure_keeps_heading() {
        let resolver = HeadingResolver::default();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(resolver.resolve(p, p), None);
        assert_eq!(resolver.resolve(p, p + Vec3::Y), None);
    }

    #[test]
    fn resolver_uses_travel_direction() {
        let resolver = HeadingResolver::new(Vec3::Z);
        let yaw = resolver
            .resolve(Vec3::new(2.0, 0.0, 2.0), Vec3::new(5.0, 0.0, 2.0))
            .unwrap();
        assert!(close(yaw, 90.0));
    }
}
