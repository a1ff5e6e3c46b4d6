//! Tunable constants for the flight and the rig.
//!
//! Every value has a default reproducing the reference eagle, so a config file only needs
//! to name what it changes:
//!
//! ```toml
//! [flight]
//! speed_scale = 20.0
//! waypoints = [[0, 0, 0], [4, 0, 0], [4, 0, 4], [0, 0, 4]]
//!
//! [animation]
//! inner_flap_degrees = 40.0
//! ```
//!
//! # Axis convention
//!
//! Y is up, `+Z` is forward (towards the beak) and `+X` is the bird's left. Part offsets
//! are expressed in the parent part's frame in that convention. Each mesh is authored with
//! its attachment point at its local origin; the body is centered at the origin.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::{MAX_SEGMENT_STEPS, PathError, Waypoints};
use crate::rig::BirdPart;
use crate::transform::{AxisRotation, LocalOp};

/// Errors raised while reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid waypoints: {0}")]
    Path(#[from] PathError),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
}

/// Full configuration for one bird.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdConfig {
    pub flight: FlightConfig,
    pub animation: AnimationConfig,
    pub rig: RigConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetPaths>,
}

impl BirdConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!(
            "loaded config {} ({} waypoints)",
            path.display(),
            config.flight.waypoints.len()
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the constraints the flight and rig rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let waypoints = self.flight.waypoints()?;
        positive("flight.speed_scale", self.flight.speed_scale)?;
        for index in 0..waypoints.len() {
            let steps = waypoints.segment_length(index) * self.flight.speed_scale;
            if steps > MAX_SEGMENT_STEPS as f32 {
                return Err(ConfigError::OutOfRange {
                    field: "flight.waypoints",
                    expected: "segments of at most 2^20 steps (length times speed_scale)",
                    value: steps,
                });
            }
        }
        positive("flight.scale", self.flight.scale)?;
        finite("flight.altitude", self.flight.altitude)?;

        let start = self.flight.start_direction;
        if !start.is_finite() || Vec3::new(start.x, 0.0, start.z).length_squared() == 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "flight.start_direction",
                expected: "a finite vector with a horizontal component",
                value: start.length(),
            });
        }

        finite("animation.phase_increment", self.animation.phase_increment)?;
        finite("animation.body_bob", self.animation.body_bob)?;
        finite("animation.body_pitch_degrees", self.animation.body_pitch_degrees)?;
        finite("animation.inner_flap_degrees", self.animation.inner_flap_degrees)?;
        finite("animation.outer_flap_degrees", self.animation.outer_flap_degrees)?;
        finite("rig.tilt_degrees", self.rig.tilt_degrees)?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "finite",
            value,
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "positive",
            value,
        })
    }
}

/// Path following and global placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Closed loop of control points, at least four.
    pub waypoints: Vec<Vec3>,
    /// Interpolation steps per unit of segment length. Higher is slower.
    pub speed_scale: f32,
    /// Fixed height of the flight plane.
    pub altitude: f32,
    /// Uniform scale applied to the whole figure.
    pub scale: f32,
    /// Direction the meshes face before any yaw is applied.
    pub start_direction: Vec3,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            waypoints: vec![
                Vec3::new(0.0, 0.0, -8.0),
                Vec3::new(6.0, 0.0, -6.0),
                Vec3::new(9.0, 0.0, 0.0),
                Vec3::new(6.0, 0.0, 6.0),
                Vec3::new(0.0, 0.0, 8.0),
                Vec3::new(-6.0, 0.0, 6.0),
                Vec3::new(-9.0, 0.0, 0.0),
                Vec3::new(-6.0, 0.0, -6.0),
            ],
            speed_scale: 15.0,
            altitude: 0.0,
            scale: 0.2,
            start_direction: Vec3::Z,
        }
    }
}

impl FlightConfig {
    pub fn waypoints(&self) -> Result<Waypoints, PathError> {
        Waypoints::new(self.waypoints.clone())
    }
}

/// Periodic perturbations driven by the animation phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Radians added to the phase every tick.
    pub phase_increment: f32,
    /// Peak vertical bob of the body, in model units.
    pub body_bob: f32,
    /// Peak body pitch about X, in degrees.
    pub body_pitch_degrees: f32,
    /// Peak flap of each inner wing segment, in degrees.
    pub inner_flap_degrees: f32,
    /// Peak flap of each outer wing segment relative to the inner one, in degrees.
    pub outer_flap_degrees: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            phase_increment: 0.1,
            body_bob: 0.1,
            body_pitch_degrees: 1.0,
            inner_flap_degrees: 32.0,
            outer_flap_degrees: 16.0,
        }
    }
}

/// Fixed attachment of a part to its parent: a translation followed by rotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartOffset {
    pub translation: Vec3,
    /// Applied in order after the translation.
    pub rotations: Vec<AxisRotation>,
}

impl PartOffset {
    pub fn translated(translation: Vec3) -> Self {
        Self {
            translation,
            rotations: Vec::new(),
        }
    }

    pub fn rotated(mut self, rotation: AxisRotation) -> Self {
        self.rotations.push(rotation);
        self
    }

    /// The offset as a sequence of local ops.
    pub fn ops(&self) -> impl Iterator<Item = LocalOp> + '_ {
        std::iter::once(LocalOp::Translate(self.translation))
            .chain(self.rotations.iter().copied().map(LocalOp::Rotate))
    }
}

/// Where each rigid part attaches, in its parent's frame.
///
/// Head, tail, and both inner wing segments attach to the body; each outer wing segment
/// attaches to the inner segment on the same side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Corrective pitch of the whole figure about X, in degrees.
    pub tilt_degrees: f32,
    pub head: PartOffset,
    pub tail: PartOffset,
    pub left_inner: PartOffset,
    pub left_outer: PartOffset,
    pub right_inner: PartOffset,
    pub right_outer: PartOffset,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            tilt_degrees: -6.0,
            head: PartOffset::translated(Vec3::new(0.0, -0.5, 1.2)),
            tail: PartOffset::translated(Vec3::new(0.0, 0.0, -1.75)),
            left_inner: PartOffset::translated(Vec3::new(0.7, 0.2, 0.0))
                .rotated(AxisRotation::about_z(16.0))
                .rotated(AxisRotation::about_y(-6.75)),
            left_outer: PartOffset::translated(Vec3::new(1.6, 0.0, 1.0))
                .rotated(AxisRotation::about_z(-12.0)),
            right_inner: PartOffset::translated(Vec3::new(-0.7, 0.2, 0.0))
                .rotated(AxisRotation::about_z(-16.0))
                .rotated(AxisRotation::about_y(6.75)),
            right_outer: PartOffset::translated(Vec3::new(-1.25, 0.0, 0.5))
                .rotated(AxisRotation::about_z(12.0)),
        }
    }
}

impl RigConfig {
    /// Offset for `part`; the body has none.
    pub fn offset(&self, part: BirdPart) -> Option<&PartOffset> {
        match part {
            BirdPart::Body => None,
            BirdPart::Head => Some(&self.head),
            BirdPart::Tail => Some(&self.tail),
            BirdPart::LeftWingInner => Some(&self.left_inner),
            BirdPart::LeftWingOuter => Some(&self.left_outer),
            BirdPart::RightWingInner => Some(&self.right_inner),
            BirdPart::RightWingOuter => Some(&self.right_outer),
        }
    }
}

/// Mesh and texture files, relative to `root`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub root: PathBuf,
    pub body: PathBuf,
    pub head: PathBuf,
    pub tail: PathBuf,
    pub left_inner: PathBuf,
    pub left_outer: PathBuf,
    pub right_inner: PathBuf,
    pub right_outer: PathBuf,
    pub texture: PathBuf,
    /// Convert meshes authored Z-up into the Y-up frame on load.
    pub upright: bool,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models/bird/eagle"),
            body: PathBuf::from("parts/body.obj"),
            head: PathBuf::from("parts/head.obj"),
            tail: PathBuf::from("parts/tail.obj"),
            left_inner: PathBuf::from("parts/left_wings_inner.obj"),
            left_outer: PathBuf::from("parts/left_wings_outer.obj"),
            right_inner: PathBuf::from("parts/right_wings_inner.obj"),
            right_outer: PathBuf::from("parts/right_wings_outer.obj"),
            texture: PathBuf::from("texture/full.png"),
            upright: false,
        }
    }
}

impl AssetPaths {
    /// Paths rooted at `root`, with the default file layout.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Full path of the mesh for `part`.
    pub fn part(&self, part: BirdPart) -> PathBuf {
        let relative = match part {
            BirdPart::Body => &self.body,
            BirdPart::Head => &self.head,
            BirdPart::Tail => &self.tail,
            BirdPart::LeftWingInner => &self.left_inner,
            BirdPart::LeftWingOuter => &self.left_outer,
            BirdPart::RightWingInner => &self.right_inner,
            BirdPart::RightWingOuter => &self.right_outer,
        };
        self.root.join(relative)
    }

    /// Full path of the shared texture.
    pub fn texture(&self) -> PathBuf {
        self.root.join(&self.texture)
    }
}
