/// Iso-surface extraction by marching tetrahedra
///
/// Every grid cell is split into six tetrahedra around its main diagonal.
/// The split is the same in every cell, so neighbouring cells agree on the
/// face diagonals and the surface is closed wherever the field is.
use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::geometry::{face_normal, IndexedMesh};
use crate::volume::Volume;

const CUBE_CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 5, 1, 6],
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
];

/// Extract the surface where the field crosses `iso_level`.
///
/// Samples `>= iso_level` are inside. Positions are in physical units
/// (voxel index times spacing) and normals point outward, down the gradient.
/// Returns `None` when the level is never crossed.
pub fn extract_iso_surface(volume: &Volume, iso_level: f32) -> Option<IndexedMesh> {
    let [nx, ny, nz] = volume.dims();
    if nx < 2 || ny < 2 || nz < 2 {
        return None;
    }

    let mut builder = SurfaceBuilder::new(volume, iso_level);
    for z in 0..nz - 1 {
        for y in 0..ny - 1 {
            for x in 0..nx - 1 {
                let corners = CUBE_CORNERS.map(|[dx, dy, dz]| [x + dx, y + dy, z + dz]);
                for tet in TETRAHEDRA {
                    builder.polygonize(tet.map(|i| corners[i]));
                }
            }
        }
    }

    let mesh = builder.finish();
    debug!(
        iso_level,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "Extracted iso-surface"
    );
    if mesh.is_empty() {
        None
    } else {
        Some(mesh)
    }
}

struct SurfaceBuilder<'a> {
    volume: &'a Volume,
    iso_level: f32,
    edge_vertices: HashMap<(usize, usize), usize>,
    positions: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    indices: Vec<usize>,
}

impl<'a> SurfaceBuilder<'a> {
    fn new(volume: &'a Volume, iso_level: f32) -> Self {
        Self {
            volume,
            iso_level,
            edge_vertices: HashMap::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn polygonize(&mut self, tet: [[usize; 3]; 4]) {
        let mut inside = [0usize; 4];
        let mut outside = [0usize; 4];
        let (mut n_in, mut n_out) = (0, 0);
        for (i, &[x, y, z]) in tet.iter().enumerate() {
            if self.volume.get(x, y, z) >= self.iso_level {
                inside[n_in] = i;
                n_in += 1;
            } else {
                outside[n_out] = i;
                n_out += 1;
            }
        }
        if n_in == 0 || n_out == 0 {
            return;
        }

        let outward =
            self.centroid(&tet, &outside[..n_out]) - self.centroid(&tet, &inside[..n_in]);

        match n_in {
            1 | 3 => {
                let (lone, rest) = if n_in == 1 {
                    (inside[0], &outside[..3])
                } else {
                    (outside[0], &inside[..3])
                };
                let a = self.edge_vertex(tet[lone], tet[rest[0]], &outward);
                let b = self.edge_vertex(tet[lone], tet[rest[1]], &outward);
                let c = self.edge_vertex(tet[lone], tet[rest[2]], &outward);
                self.push_triangle([a, b, c], &outward);
            }
            _ => {
                let (a, b) = (tet[inside[0]], tet[inside[1]]);
                let (c, d) = (tet[outside[0]], tet[outside[1]]);
                let ac = self.edge_vertex(a, c, &outward);
                let bc = self.edge_vertex(b, c, &outward);
                let bd = self.edge_vertex(b, d, &outward);
                let ad = self.edge_vertex(a, d, &outward);
                self.push_triangle([ac, bc, bd], &outward);
                self.push_triangle([ac, bd, ad], &outward);
            }
        }
    }

    fn physical(&self, [x, y, z]: [usize; 3]) -> Point3<f32> {
        let s = self.volume.spacing();
        Point3::new(x as f32 * s.x, y as f32 * s.y, z as f32 * s.z)
    }

    fn centroid(&self, tet: &[[usize; 3]; 4], corners: &[usize]) -> Vector3<f32> {
        let sum: Vector3<f32> = corners.iter().map(|&i| self.physical(tet[i]).coords).sum();
        sum / corners.len() as f32
    }

    fn linear_index(&self, [x, y, z]: [usize; 3]) -> usize {
        let [nx, ny, _] = self.volume.dims();
        x + nx * (y + ny * z)
    }

    /// Welded crossing point on the grid edge `a`-`b`.
    fn edge_vertex(&mut self, a: [usize; 3], b: [usize; 3], outward: &Vector3<f32>) -> usize {
        let (ia, ib) = (self.linear_index(a), self.linear_index(b));
        let key = (ia.min(ib), ia.max(ib));
        if let Some(&index) = self.edge_vertices.get(&key) {
            return index;
        }

        let va = self.volume.get(a[0], a[1], a[2]);
        let vb = self.volume.get(b[0], b[1], b[2]);
        let t = ((self.iso_level - va) / (vb - va)).clamp(0.0, 1.0);

        let pa = self.physical(a);
        let pb = self.physical(b);
        let position = pa + (pb - pa) * t;

        let ga = self.volume.gradient(a[0], a[1], a[2]);
        let gb = self.volume.gradient(b[0], b[1], b[2]);
        let normal = (-(ga + (gb - ga) * t))
            .try_normalize(f32::EPSILON)
            .or_else(|| outward.try_normalize(f32::EPSILON))
            .unwrap_or_else(Vector3::zeros);

        let index = self.positions.len();
        self.positions.push(position);
        self.normals.push(normal);
        self.edge_vertices.insert(key, index);
        index
    }

    fn push_triangle(&mut self, [a, b, c]: [usize; 3], outward: &Vector3<f32>) {
        let n = face_normal(&self.positions[a], &self.positions[b], &self.positions[c]);
        if n == Vector3::zeros() {
            return;
        }
        if n.dot(outward) < 0.0 {
            self.indices.extend_from_slice(&[a, c, b]);
        } else {
            self.indices.extend_from_slice(&[a, b, c]);
        }
    }

    fn finish(self) -> IndexedMesh {
        IndexedMesh::new(self.positions, self.indices).with_normals(self.normals)
    }
}
