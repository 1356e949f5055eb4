/// Rendering backend interface and the fixed shading setup
use nalgebra::{Matrix4, Point3, Vector3};

use crate::buffer::MeshBuffer;
use crate::error::RenderError;

/// Surface material, fixed for every model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// RGBA used for both ambient and diffuse terms.
    pub ambient_diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_diffuse: [0.2, 0.4, 0.9, 1.0],
            specular: [0.2, 0.4, 0.9, 1.0],
            shininess: 25.0,
        }
    }
}

/// A single directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// World-space direction from the surface towards the light.
    pub direction: Vector3<f32>,
    /// Ambient intensity in `[0, 1]`.
    pub ambient: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vector3::new(0.3, 0.5, 1.0).normalize(),
            ambient: 0.2,
        }
    }
}

/// Which triangles a backend may discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    /// Draw both sides.
    #[default]
    None,
    /// Skip triangles wound clockwise on screen.
    Back,
}

/// Material, light and face handling for a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shading {
    pub material: Material,
    pub light: Light,
    pub cull_mode: CullMode,
}

/// Borrowed view of the buffers for one indexed-triangle draw.
#[derive(Debug, Clone, Copy)]
pub struct TriangleBatch<'a> {
    /// `[x0, y0, z0, x1, ...]`
    pub positions: &'a [f32],
    /// Same layout as `positions` when present.
    pub normals: Option<&'a [f32]>,
    /// Vertex indices, three per triangle.
    pub indices: &'a [u32],
}

impl<'a> From<&'a MeshBuffer> for TriangleBatch<'a> {
    fn from(buffer: &'a MeshBuffer) -> Self {
        Self {
            positions: buffer.positions(),
            normals: buffer.normals(),
            indices: buffer.indices(),
        }
    }
}

impl TriangleBatch<'_> {
    pub fn position(&self, index: u32) -> Option<Point3<f32>> {
        let i = index as usize * 3;
        let p = self.positions.get(i..i + 3)?;
        Some(Point3::new(p[0], p[1], p[2]))
    }

    pub fn normal(&self, index: u32) -> Option<Vector3<f32>> {
        let i = index as usize * 3;
        let n = self.normals?.get(i..i + 3)?;
        Some(Vector3::new(n[0], n[1], n[2]))
    }

    /// Corner indices of every triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

/// A colored line segment, used for overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Point3<f32>,
    pub to: Point3<f32>,
    pub color: [f32; 3],
}

/// Unit X (red), Y (green) and Z (blue) axes from the origin.
pub fn reference_triad() -> [LineSegment; 3] {
    let origin = Point3::origin();
    [
        LineSegment {
            from: origin,
            to: Point3::new(1.0, 0.0, 0.0),
            color: [1.0, 0.0, 0.0],
        },
        LineSegment {
            from: origin,
            to: Point3::new(0.0, 1.0, 0.0),
            color: [0.0, 1.0, 0.0],
        },
        LineSegment {
            from: origin,
            to: Point3::new(0.0, 0.0, 1.0),
            color: [0.0, 0.0, 1.0],
        },
    ]
}

/// A rendering target the [`Viewer`](crate::Viewer) issues frames to.
///
/// The backend owns its camera: `model` matrices map model space to world
/// space and the backend applies its own view and projection. A frame is
/// always `begin_frame`, any number of draws, then `end_frame`.
pub trait RenderBackend {
    /// Start a frame and clear the output surface.
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Draw indexed triangles.
    fn draw_triangles(
        &mut self,
        batch: TriangleBatch<'_>,
        model: &Matrix4<f32>,
        shading: &Shading,
    ) -> Result<(), RenderError>;

    /// Draw unlit line segments.
    fn draw_lines(
        &mut self,
        lines: &[LineSegment],
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError>;

    /// Finish the frame and present it.
    fn end_frame(&mut self) -> Result<(), RenderError>;
}
