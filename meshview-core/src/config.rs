/// Viewer configuration
use nalgebra::Vector3;

use crate::buffer::NormalConvention;
use crate::render::{CullMode, Light, Material};

/// How input events map onto the view transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Degrees per arrow/page key press.
    pub key_step: f32,
    /// Zoom change per wheel notch.
    pub zoom_step: f32,
    /// Zoom floor, also the reset value. Values below 1.0 act as 1.0.
    pub min_zoom: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            key_step: 15.0,
            zoom_step: 0.1,
            min_zoom: 1.0,
        }
    }
}

/// Everything a [`Viewer`](crate::Viewer) is constructed with besides its backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub interaction: InteractionConfig,
    pub normals: NormalConvention,
    pub cull_mode: CullMode,
    pub material: Material,
    pub light: Light,
    /// Draw the X/Y/Z reference triad over the model.
    pub show_axes: bool,
    /// Where the model pivot is placed in world space.
    pub view_offset: Vector3<f32>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            interaction: InteractionConfig::default(),
            normals: NormalConvention::AsSupplied,
            cull_mode: CullMode::None,
            material: Material::default(),
            light: Light::default(),
            show_axes: true,
            view_offset: Vector3::zeros(),
        }
    }
}
