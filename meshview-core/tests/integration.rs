//! End-to-end tests through the file-backed readers.
//!
//! These tests write synthetic STL and volume files, load them into a
//! viewer with a recording backend, and check what reaches the backend.

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use meshview_core::{
    FrameStatus, LineSegment, LoadError, ModelSource, RenderBackend, RenderError, Shading,
    SourceError, TriangleBatch, Viewer, ViewerConfig,
};
use nalgebra::{Matrix4, Point3, Vector3};

#[derive(Default)]
struct Capture {
    triangles: usize,
    max_index: u32,
    has_normals: bool,
    model: Option<Matrix4<f32>>,
}

impl RenderBackend for Capture {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        *self = Capture::default();
        Ok(())
    }

    fn draw_triangles(
        &mut self,
        batch: TriangleBatch<'_>,
        model: &Matrix4<f32>,
        _shading: &Shading,
    ) -> Result<(), RenderError> {
        self.triangles = batch.triangles().count();
        self.max_index = batch.indices.iter().copied().max().unwrap_or(0);
        self.has_normals = batch.normals.is_some();
        self.model = Some(*model);
        Ok(())
    }

    fn draw_lines(&mut self, _lines: &[LineSegment], _model: &Matrix4<f32>) -> Result<(), RenderError> {
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Write a binary STL of an axis-aligned box from the origin to `size`.
fn write_box_stl(path: &Path, size: [f32; 3]) {
    let [sx, sy, sz] = size;
    let corner = |i: usize| {
        [
            if i & 1 != 0 { sx } else { 0.0 },
            if i & 2 != 0 { sy } else { 0.0 },
            if i & 4 != 0 { sz } else { 0.0 },
        ]
    };
    // Counter-clockwise seen from outside
    let faces: [[usize; 3]; 12] = [
        [0, 2, 1], [1, 2, 3],
        [4, 5, 6], [5, 7, 6],
        [0, 1, 4], [1, 5, 4],
        [2, 6, 3], [3, 6, 7],
        [0, 4, 2], [2, 4, 6],
        [1, 3, 5], [3, 7, 5],
    ];

    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(faces.len() as u32).to_le_bytes());
    for face in faces {
        // Zero normal: the reader derives it from the winding
        data.extend_from_slice(&[0u8; 12]);
        for i in face {
            for c in corner(i) {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    fs::write(path, data).unwrap();
}

/// Write an `MVOL` ball of radius `r` centred in an `n`-cube.
fn write_ball_volume(path: &Path, n: u32, r: f32) {
    let mut data = b"MVOL".to_vec();
    for _ in 0..3 {
        data.extend_from_slice(&n.to_le_bytes());
    }
    for _ in 0..3 {
        data.extend_from_slice(&1.0f32.to_le_bytes());
    }
    let c = (n - 1) as f32 / 2.0;
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let d = Vector3::new(x as f32 - c, y as f32 - c, z as f32 - c).norm();
                let value: i32 = if d <= r { 100 } else { 0 };
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    fs::write(path, data).unwrap();
}

#[test]
fn stl_file_reaches_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.stl");
    write_box_stl(&path, [4.0, 2.0, 1.0]);

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    viewer.load(ModelSource::from_path(&path, 0.0, None)).unwrap();

    let model = viewer.model().unwrap();
    assert_eq!(model.vertex_count(), 8);
    assert_eq!(model.triangle_count(), 12);
    assert_eq!(model.bounding_extent(), Vector3::new(4.0, 2.0, 1.0));

    assert_eq!(viewer.render_frame(), FrameStatus::Drawn);
    let capture = viewer.backend();
    assert_eq!(capture.triangles, 12);
    assert!(capture.max_index < 8);
    assert!(capture.has_normals);

    // The far corner maps onto the corner of the unit box around the origin
    let m = capture.model.unwrap();
    let corner = m.transform_point(&Point3::new(4.0, 2.0, 1.0));
    assert_relative_eq!(corner.x, 0.5, epsilon = 1e-6);
    assert_relative_eq!(corner.y, 0.5, epsilon = 1e-6);
    assert_relative_eq!(corner.z, 0.5, epsilon = 1e-6);
}

#[test]
fn box_normals_point_away_from_center() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.stl");
    write_box_stl(&path, [2.0, 2.0, 2.0]);

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    viewer.load(ModelSource::Stl(path)).unwrap();

    let model = viewer.model().unwrap();
    let normals = model.normals().unwrap();
    for (p, n) in model.positions().chunks(3).zip(normals.chunks(3)) {
        let outward = Vector3::new(p[0] - 1.0, p[1] - 1.0, p[2] - 1.0);
        assert!(outward.dot(&Vector3::new(n[0], n[1], n[2])) > 0.0);
    }
}

#[test]
fn missing_file_keeps_loaded_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.stl");
    write_box_stl(&path, [1.0, 1.0, 1.0]);

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    viewer.load(ModelSource::Stl(path)).unwrap();
    let positions = viewer.model().unwrap().positions().to_vec();
    let indices = viewer.model().unwrap().indices().to_vec();

    let err = viewer
        .load(ModelSource::Stl(dir.path().join("nope.stl")))
        .unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::NotFound { .. })));

    let model = viewer.model().unwrap();
    assert_eq!(model.positions(), positions.as_slice());
    assert_eq!(model.indices(), indices.as_slice());
    assert_eq!(viewer.render_frame(), FrameStatus::Drawn);
}

#[test]
fn garbage_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.stl");
    fs::write(&path, b"not a mesh").unwrap();

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    let err = viewer.load(ModelSource::Stl(path)).unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::Stl(_))));
    assert!(viewer.model().is_none());
}

#[test]
fn volume_file_becomes_iso_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ball.mvol");
    write_ball_volume(&path, 10, 3.0);

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    viewer.load(ModelSource::from_path(&path, 50.0, None)).unwrap();
    let coarse = viewer.model().unwrap().triangle_count();
    assert!(coarse > 0);

    viewer.load(ModelSource::from_path(&path, 50.0, Some(2.0))).unwrap();
    let fine = viewer.model().unwrap().triangle_count();
    assert!(fine > coarse);

    let err = viewer.load(ModelSource::from_path(&path, 500.0, None)).unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::EmptySurface { .. })));
    assert_eq!(viewer.model().unwrap().triangle_count(), fine);
}

#[test]
fn clear_then_render_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.stl");
    write_box_stl(&path, [1.0, 1.0, 1.0]);

    let mut viewer = Viewer::new(Capture::default(), ViewerConfig::default());
    viewer.load(ModelSource::Stl(path)).unwrap();
    viewer.clear();
    assert_eq!(viewer.render_frame(), FrameStatus::Empty);
    assert_eq!(viewer.backend().triangles, 0);
    assert!(viewer.backend().model.is_none());
}
