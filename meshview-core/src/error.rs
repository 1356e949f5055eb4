/// Error types for mesh building, collaborators, loading and rendering
use std::io;
use std::path::PathBuf;

/// Failures while turning an indexed mesh into render buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh is empty: {vertices} vertices, {triangles} triangles")]
    Empty { vertices: usize, triangles: usize },
    #[error("malformed mesh: {0}")]
    Malformed(String),
}

/// Failures reported by mesh and volume producers.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid STL data: {0}")]
    Stl(String),
    #[error("invalid volume data: {0}")]
    Volume(String),
    #[error("iso-surface at level {iso_level} is empty")]
    EmptySurface { iso_level: f32 },
}

impl SourceError {
    /// Map an I/O error on `path`, keeping missing files distinguishable.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound { path }
        } else {
            SourceError::Read { path, source }
        }
    }
}

/// A failed `Viewer::load`. The viewer state is untouched when this is returned.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("cannot load model: {0}")]
    Source(#[from] SourceError),
    #[error("cannot load model: {0}")]
    Mesh(#[from] MeshError),
    #[error("nothing to reload")]
    NothingToReload,
}

/// Contract violations reported by a render backend.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("invalid buffer state: {0}")]
    InvalidBuffer(String),
    #[error("render surface unavailable: {0}")]
    Surface(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
