//! Part draw recording and asset ownership.
//!
//! The bird never talks to a GPU directly. Each frame it hands `(part, world transform)`
//! pairs to a [`RenderBackend`]. [`DrawQueue`] is the backend shipped with the crate: it owns
//! the loaded [`BirdAssets`] and accumulates the frame's draws so an external renderer can
//! bind the shared texture once and submit each part's buffers with its transform.
//!
//! # Usage Pattern
//!
//! ```no_run
//! use aquila::{AssetPaths, BirdAssets, DrawQueue};
//!
//! let assets = BirdAssets::load(&AssetPaths::default()).unwrap();
//! let mut queue = DrawQueue::with_assets(assets);
//!
//! // Each frame: let the bird queue its parts, hand them to the GPU, then clear.
//! // frame.plan.submit(&mut queue);
//! for draw in queue.queued() {
//!     let _geometry = queue.geometry(draw.part);
//! }
//! queue.clear_queue();
//! ```

use glam::Mat4;
use thiserror::Error;

use crate::config::AssetPaths;
use crate::geometry::{GeometryError, PendingGeometry, RawGeometry};
use crate::rig::BirdPart;
use crate::texture::{TextureError, TextureImage};

/// The "draw this part's geometry with its bound texture" side of a renderer.
///
/// `transform` is the part's full model matrix; the backend supplies its own view and
/// projection.
pub trait RenderBackend {
    fn draw_part(&mut self, part: BirdPart, transform: Mat4);
}

/// Failure to load one of the bird's assets. Fatal: a bird with a missing part
/// cannot be drawn.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load {} mesh: {source}", .part.name())]
    Geometry {
        part: BirdPart,
        #[source]
        source: GeometryError,
    },
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Every part mesh plus the texture they share.
#[derive(Clone, Debug)]
pub struct BirdAssets {
    parts: Vec<RawGeometry>,
    texture: TextureImage,
}

impl BirdAssets {
    /// Loads all seven part meshes and the texture, failing on the first missing file.
    pub fn load(paths: &AssetPaths) -> Result<Self, AssetError> {
        let mut parts = Vec::with_capacity(BirdPart::ALL.len());
        for part in BirdPart::ALL {
            let mut pending = PendingGeometry::from_file(paths.part(part));
            if paths.upright {
                pending = pending.upright();
            }
            let geometry = pending
                .build()
                .map_err(|source| AssetError::Geometry { part, source })?;
            log::debug!(
                "loaded {} ({} triangles)",
                part.name(),
                geometry.triangle_count()
            );
            parts.push(geometry);
        }

        let texture = TextureImage::from_file(paths.texture())?;
        let assets = Self { parts, texture };
        log::info!(
            "loaded bird parts from {} ({} bytes of mesh buffers, texture {}x{})",
            paths.root.display(),
            assets.buffer_size(),
            assets.texture.width,
            assets.texture.height
        );

        Ok(assets)
    }

    /// Builds assets from already-loaded data, one geometry per part in
    /// [`BirdPart::ALL`] order.
    pub fn from_parts(parts: [RawGeometry; 7], texture: TextureImage) -> Self {
        Self {
            parts: parts.into(),
            texture,
        }
    }

    pub fn geometry(&self, part: BirdPart) -> &RawGeometry {
        &self.parts[part.index()]
    }

    pub fn texture(&self) -> &TextureImage {
        &self.texture
    }

    /// Vertex and index bytes across every part mesh.
    pub fn buffer_size(&self) -> usize {
        self.parts.iter().map(RawGeometry::buffer_size).sum()
    }
}

/// A part draw recorded for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueuedPart {
    pub part: BirdPart,
    pub transform: Mat4,
}

/// CPU-side [`RenderBackend`]: owns the assets and the per-frame draw list.
///
/// Not thread-safe; one queue belongs to one render loop.
#[derive(Debug, Default)]
pub struct DrawQueue {
    assets: Option<BirdAssets>,
    draw_queue: Vec<QueuedPart>,
}

impl DrawQueue {
    /// A queue without geometry, useful for recording transforms only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: BirdAssets) -> Self {
        Self {
            assets: Some(assets),
            draw_queue: Vec::new(),
        }
    }

    pub fn assets(&self) -> Option<&BirdAssets> {
        self.assets.as_ref()
    }

    /// Geometry for `part`, if assets are loaded.
    pub fn geometry(&self, part: BirdPart) -> Option<&RawGeometry> {
        self.assets.as_ref().map(|a| a.geometry(part))
    }

    pub fn texture(&self) -> Option<&TextureImage> {
        self.assets.as_ref().map(|a| a.texture())
    }

    /// Draws recorded since the last [`clear_queue`](Self::clear_queue), in order.
    pub fn queued(&self) -> &[QueuedPart] {
        &self.draw_queue
    }

    /// Triangles the queued draws would submit; zero without assets.
    pub fn queued_triangles(&self) -> usize {
        self.draw_queue
            .iter()
            .filter_map(|d| self.geometry(d.part))
            .map(RawGeometry::triangle_count)
            .sum()
    }

    pub fn clear_queue(&mut self) {
        self.draw_queue.clear();
    }
}

impl RenderBackend for DrawQueue {
    fn draw_part(&mut self, part: BirdPart, transform: Mat4) {
        self.draw_queue.push(QueuedPart { part, transform });
    }
}
