/// Mesh and volume producers consumed by the viewer
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::geometry::IndexedMesh;
use crate::isosurface;
use crate::stl;
use crate::volume::{self, Volume};

/// Produces indexed meshes from files or volumes.
pub trait MeshSource {
    /// Read an STL file. Binary and ASCII are both accepted.
    fn read_stl(&self, path: &Path) -> Result<IndexedMesh, SourceError>;

    /// Extract the iso-surface at `iso_level`, or `None` if it is empty.
    fn extract_iso_surface(&self, volume: &Volume, iso_level: f32) -> Option<IndexedMesh>;
}

/// Produces volumetric images.
pub trait VolumeSource {
    fn read(&self, path: &Path) -> Result<Volume, SourceError>;

    fn scale(
        &self,
        volume: &Volume,
        factor: f32,
        preserve_aspect: bool,
    ) -> Result<Volume, SourceError>;
}

/// The file-backed readers shipped with this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSources;

impl MeshSource for FileSources {
    fn read_stl(&self, path: &Path) -> Result<IndexedMesh, SourceError> {
        stl::read_stl(path)
    }

    fn extract_iso_surface(&self, volume: &Volume, iso_level: f32) -> Option<IndexedMesh> {
        isosurface::extract_iso_surface(volume, iso_level)
    }
}

impl VolumeSource for FileSources {
    fn read(&self, path: &Path) -> Result<Volume, SourceError> {
        volume::read_volume(path)
    }

    fn scale(
        &self,
        volume: &Volume,
        factor: f32,
        preserve_aspect: bool,
    ) -> Result<Volume, SourceError> {
        volume::scale(volume, factor, preserve_aspect)
    }
}

/// What to load into a viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Stl(PathBuf),
    IsoSurface {
        volume: PathBuf,
        iso_level: f32,
        /// Resampling factor applied to the volume before extraction.
        scale: Option<f32>,
    },
}

impl ModelSource {
    /// Pick a source from the file extension: `.mvol` volumes become
    /// iso-surface requests, everything else is read as STL.
    pub fn from_path(path: impl Into<PathBuf>, iso_level: f32, scale: Option<f32>) -> Self {
        let path = path.into();
        let is_volume = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mvol"));
        if is_volume {
            ModelSource::IsoSurface {
                volume: path,
                iso_level,
                scale,
            }
        } else {
            ModelSource::Stl(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ModelSource::Stl(path) => path,
            ModelSource::IsoSurface { volume, .. } => volume,
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path()
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.path().to_string_lossy());
        match self {
            ModelSource::Stl(_) => write!(f, "{name}"),
            ModelSource::IsoSurface { iso_level, .. } => write!(f, "{name} @ {iso_level}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_from_extension() {
        assert_eq!(
            ModelSource::from_path("part.stl", 0.5, None),
            ModelSource::Stl(PathBuf::from("part.stl"))
        );
        assert_eq!(
            ModelSource::from_path("head.MVOL", 100.0, Some(0.5)),
            ModelSource::IsoSurface {
                volume: PathBuf::from("head.MVOL"),
                iso_level: 100.0,
                scale: Some(0.5),
            }
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(ModelSource::Stl("dir/part.stl".into()).to_string(), "part.stl");
        let iso = ModelSource::from_path("scans/head.mvol", 80.0, None);
        assert_eq!(iso.to_string(), "head.mvol @ 80");
    }

    #[test]
    fn file_sources_report_missing_files() {
        let err = FileSources.read_stl(Path::new("/nonexistent/model.stl")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
        let err = FileSources.read(Path::new("/nonexistent/head.mvol")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }
}
