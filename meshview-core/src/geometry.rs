/// Indexed triangle meshes as produced by the mesh readers
use nalgebra::{Point3, Vector3};

/// An indexed triangle mesh: a vertex list plus three corner indices per triangle.
///
/// This is the hand-off format between mesh producers (STL reader, iso-surface
/// extractor) and [`MeshBuffer`](crate::MeshBuffer). It is not validated on
/// construction; `MeshBuffer::build` does that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    pub positions: Vec<Point3<f32>>,
    /// Per-vertex normals, same length as `positions` when present.
    pub normals: Option<Vec<Vector3<f32>>>,
    /// Corner indices into `positions`, three per triangle.
    pub indices: Vec<usize>,
}

impl IndexedMesh {
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<usize>) -> Self {
        Self {
            positions,
            normals: None,
            indices,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<f32>>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of complete triangles (a trailing partial triple is not counted).
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Create a cube centred on `(half, half, half)` with outward per-face normals.
    ///
    /// The cube sits in the positive octant so that its bounding extent is
    /// exactly `size` on every axis.
    pub fn cube(size: f32) -> Self {
        const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
            // Front
            ([0.0, 0.0, 1.0], [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
            // Back
            ([0.0, 0.0, -1.0], [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
            // Top
            ([0.0, 1.0, 0.0], [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            // Bottom
            ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
            // Right
            ([1.0, 0.0, 0.0], [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]]),
            // Left
            ([-1.0, 0.0, 0.0], [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, corners) in FACES {
            let base = positions.len();
            for [x, y, z] in corners {
                positions.push(Point3::new(x * size, y * size, z * size));
                normals.push(Vector3::new(normal[0], normal[1], normal[2]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, indices).with_normals(normals)
    }
}

/// Unit normal of the triangle `(a, b, c)` with counter-clockwise winding.
///
/// Degenerate triangles yield the zero vector.
pub fn face_normal(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> Vector3<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    edge1
        .cross(&edge2)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
