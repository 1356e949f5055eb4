/// The viewer controller: one model, one view transform, one backend
use std::sync::Arc;
use std::time::Instant;

use nalgebra::{Matrix4, Point2, Vector3};
use tracing::{debug, error, info, warn};

use crate::buffer::MeshBuffer;
use crate::config::ViewerConfig;
use crate::error::{LoadError, RenderError, SourceError};
use crate::geometry::IndexedMesh;
use crate::render::{reference_triad, RenderBackend, Shading, TriangleBatch};
use crate::source::{FileSources, MeshSource, ModelSource, VolumeSource};
use crate::transform::{Transform, ViewKey, ViewTransform};

/// Length of the reference triad relative to the normalized model.
const TRIAD_SCALE: f32 = 0.75;

/// What a call to [`Viewer::render_frame`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// No model loaded; the surface was cleared.
    Empty,
    /// The model was drawn.
    Drawn,
    /// The backend reported an error and the frame was dropped.
    Skipped,
}

/// The state a frame is rendered from: a shared buffer and a copied transform.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub buffer: Arc<MeshBuffer>,
    pub view: ViewTransform,
}

impl FrameSnapshot {
    pub fn model_matrix(&self, offset: &Vector3<f32>) -> Matrix4<f32> {
        self.view
            .model_matrix(&self.buffer.normalization_divisor(), offset)
    }
}

/// Interactive mesh viewer generic over its rendering backend.
pub struct Viewer<B> {
    backend: B,
    config: ViewerConfig,
    view: ViewTransform,
    model: Option<Arc<MeshBuffer>>,
    source: Option<ModelSource>,
    meshes: Box<dyn MeshSource>,
    volumes: Box<dyn VolumeSource>,
    redraw: bool,
}

impl<B: RenderBackend> Viewer<B> {
    /// Create a viewer reading models with the built-in file readers.
    pub fn new(backend: B, config: ViewerConfig) -> Self {
        Self::with_sources(backend, config, Box::new(FileSources), Box::new(FileSources))
    }

    pub fn with_sources(
        backend: B,
        config: ViewerConfig,
        meshes: Box<dyn MeshSource>,
        volumes: Box<dyn VolumeSource>,
    ) -> Self {
        Self {
            backend,
            view: ViewTransform::new(config.interaction),
            config,
            model: None,
            source: None,
            meshes,
            volumes,
            redraw: true,
        }
    }

    /// Load a model, replacing the current one and resetting the view.
    ///
    /// On failure nothing changes: the previous model stays loaded.
    pub fn load(&mut self, source: ModelSource) -> Result<(), LoadError> {
        let started = Instant::now();
        let result = self
            .produce(&source)
            .map_err(LoadError::from)
            .and_then(|mesh| {
                MeshBuffer::build_with(&mesh, self.config.normals).map_err(LoadError::from)
            });

        let buffer = match result {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(source = %source, %e, "Load failed, keeping current model");
                return Err(e);
            }
        };

        info!(
            source = %source,
            vertices = buffer.vertex_count(),
            triangles = buffer.triangle_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded model"
        );
        self.model = Some(Arc::new(buffer));
        self.source = Some(source);
        self.view.reset();
        self.redraw = true;
        Ok(())
    }

    /// Load the last successfully loaded source again.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let source = self.source.clone().ok_or(LoadError::NothingToReload)?;
        self.load(source)
    }

    /// Drop the current model. The source is remembered for `reload`.
    pub fn clear(&mut self) {
        if self.model.take().is_some() {
            debug!("Model cleared");
        }
        self.redraw = true;
    }

    fn produce(&self, source: &ModelSource) -> Result<IndexedMesh, SourceError> {
        match source {
            ModelSource::Stl(path) => self.meshes.read_stl(path),
            ModelSource::IsoSurface {
                volume,
                iso_level,
                scale,
            } => {
                let mut image = self.volumes.read(volume)?;
                if let Some(factor) = scale.filter(|&f| f != 1.0) {
                    image = self.volumes.scale(&image, factor, true)?;
                }
                self.meshes
                    .extract_iso_surface(&image, *iso_level)
                    .ok_or(SourceError::EmptySurface {
                        iso_level: *iso_level,
                    })
            }
        }
    }

    /// Capture the current model and transform, if a model is loaded.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.model.as_ref().map(|buffer| FrameSnapshot {
            buffer: Arc::clone(buffer),
            view: self.view,
        })
    }

    /// Render one frame. Backend errors are logged and the frame is skipped.
    pub fn render_frame(&mut self) -> FrameStatus {
        self.redraw = false;
        let snapshot = self.snapshot();
        match self.draw(snapshot.as_ref()) {
            Ok(status) => status,
            Err(e) => {
                error!(%e, "Render backend failed, frame skipped");
                FrameStatus::Skipped
            }
        }
    }

    fn draw(&mut self, snapshot: Option<&FrameSnapshot>) -> Result<FrameStatus, RenderError> {
        self.backend.begin_frame()?;

        let status = match snapshot {
            Some(frame) => {
                let offset = self.config.view_offset;
                let shading = Shading {
                    material: self.config.material,
                    light: self.config.light,
                    cull_mode: self.config.cull_mode,
                };
                self.backend.draw_triangles(
                    TriangleBatch::from(frame.buffer.as_ref()),
                    &frame.model_matrix(&offset),
                    &shading,
                )?;

                if self.config.show_axes {
                    let triad = frame.view.pose_matrix(&offset)
                        * Transform::scale_matrix(&Vector3::repeat(TRIAD_SCALE));
                    self.backend.draw_lines(&reference_triad(), &triad)?;
                }
                FrameStatus::Drawn
            }
            None => FrameStatus::Empty,
        };

        self.backend.end_frame()?;
        Ok(status)
    }

    pub fn pointer_pressed(&mut self, x: f32, y: f32) {
        self.view.press(Point2::new(x, y));
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.view.move_to(Point2::new(x, y)) {
            self.redraw = true;
        }
    }

    pub fn pointer_released(&mut self, x: f32, y: f32) {
        if self.view.release(Point2::new(x, y)) {
            self.redraw = true;
        }
    }

    pub fn double_click(&mut self) {
        self.view.double_click();
        self.redraw = true;
    }

    pub fn key(&mut self, key: ViewKey) {
        self.view.key(key);
        self.redraw = true;
    }

    pub fn scroll(&mut self, steps: f32) {
        self.view.scroll(steps);
        self.redraw = true;
    }

    pub fn toggle_axes(&mut self) {
        self.config.show_axes = !self.config.show_axes;
        self.redraw = true;
    }

    /// Whether an input or load changed what the next frame shows.
    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    /// Ask for a redraw, e.g. after the surface was resized.
    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn model(&self) -> Option<&MeshBuffer> {
        self.model.as_deref()
    }

    pub fn source(&self) -> Option<&ModelSource> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
