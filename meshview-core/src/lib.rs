/// meshview core library - mesh buffers, view state and the viewer controller
///
/// This library turns triangle meshes (read from STL files or extracted from
/// volumetric images) into flat render buffers, tracks the interactive view
/// transform, and drives a pluggable rendering backend.

pub mod buffer;
pub mod config;
pub mod error;
pub mod geometry;
pub mod isosurface;
pub mod projection;
pub mod render;
pub mod source;
pub mod stl;
pub mod transform;
pub mod viewer;
pub mod volume;

// Re-export commonly used types
pub use buffer::{MeshBuffer, NormalConvention};
pub use config::{InteractionConfig, ViewerConfig};
pub use error::{LoadError, MeshError, RenderError, SourceError};
pub use geometry::IndexedMesh;
pub use projection::{Camera, ProjectionMode};
pub use render::{CullMode, LineSegment, Light, Material, RenderBackend, Shading, TriangleBatch};
pub use source::{FileSources, MeshSource, ModelSource, VolumeSource};
pub use transform::{DragState, RotationState, Transform, ViewKey, ViewTransform};
pub use viewer::{FrameSnapshot, FrameStatus, Viewer};
pub use volume::Volume;
