//! Part geometry loading.
//!
//! Each bird part is an independent mesh file whose local origin is the point where the
//! part attaches to its parent. Meshes are loaded into CPU-side [`RawGeometry`]; uploading
//! them to a GPU is the rendering backend's business.
//!
//! # Supported Formats
//!
//! | Format        | Extensions | Notes                                          |
//! |---------------|------------|------------------------------------------------|
//! | Wavefront OBJ | `.obj`     | Positions, UVs, normals; polygons are fanned   |
//! | STL           | `.stl`     | Binary and ASCII, no UV coordinates            |
//!
//! ```no_run
//! use aquila::PendingGeometry;
//!
//! let wing = PendingGeometry::from_file("models/bird/eagle/parts/left_wings_inner.obj")
//!     .build()
//!     .unwrap();
//! println!("{} triangles", wing.triangle_count());
//! ```

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use thiserror::Error;

/// Errors that can occur when loading geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    #[error("STL parse error: {0}")]
    Stl(String),
    #[error("OBJ parse error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("OBJ contains no faces")]
    NoFaces,
}

/// A vertex with position, normal, and texture coordinates.
///
/// `#[repr(C)]` and [`bytemuck::Pod`] let a backend upload a vertex slice as-is; see
/// [`RawGeometry::vertex_bytes`]. Each vertex is 32 bytes: position at offset 0, normal
/// at 12, uv at 24.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Texture coordinates with the origin at the image's top-left corner.
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle geometry held in CPU memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex3d>,
    /// Triangle list, three indices per face.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// The vertex buffer as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The index buffer as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Bytes a backend uploads for this mesh: vertex plus index buffer.
    pub fn buffer_size(&self) -> usize {
        self.vertex_bytes().len() + self.index_bytes().len()
    }

    /// Rotates positions and normals.
    pub fn rotate(&mut self, rotation: Quat) {
        for v in &mut self.vertices {
            v.position = (rotation * Vec3::from(v.position)).into();
            v.normal = (rotation * Vec3::from(v.normal)).into();
        }
    }

    /// Recomputes smooth vertex normals by summing area-weighted face normals.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0; 3];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }
}

/// Geometry that has been read but not yet post-processed.
///
/// Load errors are held until [`build`](Self::build) so the builder calls can be chained.
pub struct PendingGeometry {
    result: Result<RawGeometry, GeometryError>,
    upright: bool,
}

impl PendingGeometry {
    fn with(result: Result<RawGeometry, GeometryError>) -> Self {
        Self {
            result,
            upright: false,
        }
    }

    /// Loads a file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::with(load_file(path.as_ref()))
    }

    pub fn from_stl_bytes(bytes: &[u8]) -> Self {
        Self::with(parse_stl(&mut std::io::Cursor::new(bytes)))
    }

    pub fn from_obj_str(source: &str) -> Self {
        Self::with(parse_obj(source))
    }

    /// Converts Z-up authored geometry to Y-up (-90° about X).
    pub fn upright(mut self) -> Self {
        self.upright = true;
        self
    }

    pub fn build(self) -> Result<RawGeometry, GeometryError> {
        let mut geometry = self.result?;
        if self.upright {
            geometry.rotate(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));
        }
        Ok(geometry)
    }
}

fn load_file(path: &Path) -> Result<RawGeometry, GeometryError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let io_error = |source| GeometryError::Io {
        path: path.to_path_buf(),
        source,
    };

    match ext.as_str() {
        "stl" => {
            let file = std::fs::File::open(path).map_err(io_error)?;
            parse_stl(&mut std::io::BufReader::new(file))
        }
        "obj" => {
            let source = std::fs::read_to_string(path).map_err(io_error)?;
            parse_obj(&source)
        }
        _ => Err(GeometryError::UnknownFormat(ext)),
    }
}

fn parse_stl<R: Read + Seek>(reader: &mut R) -> Result<RawGeometry, GeometryError> {
    let stl = stl_io::read_stl(reader).map_err(|e| GeometryError::Stl(e.to_string()))?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // Faces are split into their own vertices so each keeps its facet normal.
    for face in &stl.faces {
        let normal: [f32; 3] = face.normal.into();
        for &vertex_idx in &face.vertices {
            let position: [f32; 3] = stl.vertices[vertex_idx].into();
            indices.push(vertices.len() as u32);
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }
    }

    Ok(RawGeometry::new(vertices, indices))
}

// Materials are ignored: every part shares the one bird texture.
fn parse_obj(source: &str) -> Result<RawGeometry, GeometryError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj_buf(&mut source.as_bytes(), &options, |_| {
        Ok((Vec::new(), Default::default()))
    })?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut missing_normals = false;

    for model in models {
        let mesh = model.mesh;
        let base = vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        missing_normals |= mesh.normals.len() < count * 3;

        for i in 0..count {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let normal = mesh
                .normals
                .get(3 * i..3 * i + 3)
                .map(|n| [n[0], n[1], n[2]])
                .unwrap_or([0.0; 3]);
            // OBJ puts the UV origin bottom-left; flip to top-left.
            let uv = mesh
                .texcoords
                .get(2 * i..2 * i + 2)
                .map(|t| [t[0], 1.0 - t[1]])
                .unwrap_or([0.0; 2]);
            vertices.push(Vertex3d::new(position, normal, uv));
        }
        indices.extend(mesh.indices.iter().map(|&i| base + i));
    }

    if indices.is_empty() {
        return Err(GeometryError::NoFaces);
    }

    let mut geometry = RawGeometry::new(vertices, indices);
    if missing_normals {
        geometry.recalculate_normals();
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad in the XY plane
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl feathers
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn obj_quad_is_fanned_into_two_triangles() {
        let geom = PendingGeometry::from_obj_str(QUAD).build().unwrap();
        assert_eq!(geom.vertices.len(), 4);
        assert_eq!(geom.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(geom.vertices[0].normal, [0.0, 0.0, 1.0]);
        // v flipped to a top-left origin
        assert_eq!(geom.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(geom.vertices[2].uv, [1.0, 0.0]);
    }

    #[test]
    fn obj_shared_corners_are_deduplicated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n";
        let geom = PendingGeometry::from_obj_str(src).build().unwrap();
        assert_eq!(geom.vertices.len(), 4);
        assert_eq!(geom.triangle_count(), 2);
    }

    #[test]
    fn obj_without_normals_gets_computed_ones() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let geom = PendingGeometry::from_obj_str(src).build().unwrap();
        for v in &geom.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn obj_negative_indices_count_back() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let geom = PendingGeometry::from_obj_str(src).build().unwrap();
        assert_eq!(geom.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn obj_out_of_range_index_is_reported() {
        let src = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        let err = PendingGeometry::from_obj_str(src).build().unwrap_err();
        assert!(matches!(err, GeometryError::Obj(_)));
    }

    #[test]
    fn obj_bad_number_is_reported() {
        let err = PendingGeometry::from_obj_str("v 0 zero 0\n")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Obj(tobj::LoadError::PositionParseError)
        ));
    }

    #[test]
    fn obj_without_faces_is_rejected() {
        let err = PendingGeometry::from_obj_str("v 0 0 0\nv 1 0 0\n")
            .build()
            .unwrap_err();
        assert!(matches!(err, GeometryError::NoFaces));
    }

    #[test]
    fn ascii_stl_loads() {
        let src = b"solid tri
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 1 0
  endloop
endfacet
endsolid tri
";
        let geom = PendingGeometry::from_stl_bytes(src).build().unwrap();
        assert_eq!(geom.triangle_count(), 1);
        assert_eq!(geom.vertices[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PendingGeometry::from_file("no/such/part.obj")
            .build()
            .unwrap_err();
        assert!(matches!(err, GeometryError::Io { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = PendingGeometry::from_file("wing.fbx").build().unwrap_err();
        assert!(matches!(err, GeometryError::UnknownFormat(ext) if ext == "fbx"));
    }

    #[test]
    fn upright_turns_z_up_into_y_up() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 2 3\n";
        let geom = PendingGeometry::from_obj_str(src)
            .upright()
            .build()
            .unwrap();
        let top = Vec3::from(geom.vertices[2].position);
        assert!(top.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn vertex_bytes_are_tightly_packed() {
        let geom = PendingGeometry::from_obj_str(QUAD).build().unwrap();
        assert_eq!(geom.vertex_bytes().len(), 4 * 32);
        assert_eq!(geom.index_bytes().len(), 6 * 4);
        assert_eq!(geom.buffer_size(), 4 * 32 + 6 * 4);
    }
}
