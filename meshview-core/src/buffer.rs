/// Render-ready mesh buffers
use nalgebra::Vector3;
use tracing::debug;

use crate::error::MeshError;
use crate::geometry::IndexedMesh;

/// Sign applied to source normals when they are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalConvention {
    /// Copy normals unchanged. Mesh readers in this crate emit outward
    /// normals for counter-clockwise triangles, which is what the
    /// backends light against.
    #[default]
    AsSupplied,
    /// Negate every normal, for producers that emit inward normals.
    Flipped,
}

/// Flattened position/normal/index arrays plus the normalization extent.
///
/// Built once from an [`IndexedMesh`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    positions: Vec<f32>,
    normals: Option<Vec<f32>>,
    indices: Vec<u32>,
    extent: Vector3<f32>,
}

impl MeshBuffer {
    /// Build buffers using the default normal convention.
    pub fn build(mesh: &IndexedMesh) -> Result<Self, MeshError> {
        Self::build_with(mesh, NormalConvention::default())
    }

    pub fn build_with(mesh: &IndexedMesh, convention: NormalConvention) -> Result<Self, MeshError> {
        let vertex_count = mesh.vertex_count();
        if vertex_count == 0 || mesh.indices.is_empty() {
            return Err(MeshError::Empty {
                vertices: vertex_count,
                triangles: mesh.triangle_count(),
            });
        }
        if mesh.indices.len() % 3 != 0 {
            return Err(MeshError::Malformed(format!(
                "{} indices do not form whole triangles",
                mesh.indices.len()
            )));
        }

        let indices = mesh
            .indices
            .iter()
            .enumerate()
            .map(|(corner, &index)| match u32::try_from(index) {
                Ok(wide) if index < vertex_count => Ok(wide),
                _ => Err(MeshError::Malformed(format!(
                    "index {index} at corner {corner} is out of range for {vertex_count} vertices"
                ))),
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let mut positions = Vec::with_capacity(vertex_count * 3);
        let mut extent = Vector3::zeros();
        for p in &mesh.positions {
            positions.extend_from_slice(&[p.x, p.y, p.z]);
            extent = extent.sup(&p.coords);
        }

        let normals = match &mesh.normals {
            Some(normals) if normals.len() != vertex_count => {
                return Err(MeshError::Malformed(format!(
                    "{} normals for {vertex_count} vertices",
                    normals.len()
                )));
            }
            Some(normals) => {
                let sign = match convention {
                    NormalConvention::AsSupplied => 1.0,
                    NormalConvention::Flipped => -1.0,
                };
                let mut flat = Vec::with_capacity(vertex_count * 3);
                for n in normals {
                    flat.extend_from_slice(&[sign * n.x, sign * n.y, sign * n.z]);
                }
                Some(flat)
            }
            None => None,
        };

        debug!(
            vertices = vertex_count,
            triangles = indices.len() / 3,
            has_normals = normals.is_some(),
            extent = ?(extent.x, extent.y, extent.z),
            "Built mesh buffer"
        );

        Ok(Self {
            positions,
            normals,
            indices,
            extent,
        })
    }

    /// `[x0, y0, z0, x1, ...]` in source vertex order.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Component-wise maximum over all positions, never below zero.
    pub fn bounding_extent(&self) -> Vector3<f32> {
        self.extent
    }

    /// The extent with unusable components (zero or non-finite) replaced by 1.
    pub fn normalization_divisor(&self) -> Vector3<f32> {
        self.extent
            .map(|c| if c.is_finite() && c > f32::EPSILON { c } else { 1.0 })
    }

    /// Rotation pivot: the midpoint of the normalization extent.
    pub fn center(&self) -> Vector3<f32> {
        self.normalization_divisor() / 2.0
    }
}
