/// 3D transformation matrices and the interactive view state
use nalgebra::{Matrix4, Point2, Vector3};
use tracing::debug;

use crate::config::InteractionConfig;

/// Rotation state around three axes (in degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in degrees)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state.
    ///
    /// Angles are not wrapped; the trigonometry takes care of that.
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x.to_radians(), 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y.to_radians(), 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z.to_radians()));

        // Apply rotations in order: X, then Y, then Z
        rz * ry * rx
    }

    /// Create a translation matrix
    pub fn translation_matrix(offset: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(offset)
    }

    /// Create a scale matrix
    pub fn scale_matrix(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(scale)
    }
}

/// Keys that step or reset the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKey {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
}

/// Primary-button drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: Point2<f32> },
}

/// Accumulated rotation and zoom driven by discrete input events.
///
/// Screen-space drags map vertical motion to rotation about X and horizontal
/// motion to rotation about Y, one degree per pointer unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    rotation: RotationState,
    zoom: f32,
    drag: DragState,
    settings: InteractionConfig,
}

impl ViewTransform {
    /// A view at rest. A zoom floor below 1.0 is raised to 1.0.
    pub fn new(mut settings: InteractionConfig) -> Self {
        settings.min_zoom = settings.min_zoom.max(1.0);
        Self {
            rotation: RotationState::zero(),
            zoom: settings.min_zoom,
            drag: DragState::Idle,
            settings,
        }
    }

    pub fn rotation(&self) -> RotationState {
        self.rotation
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Start a drag gesture at `position`. Pressing while dragging restarts it.
    pub fn press(&mut self, position: Point2<f32>) {
        self.drag = DragState::Dragging { last: position };
    }

    /// Apply pointer motion. Returns whether the pose changed.
    pub fn move_to(&mut self, position: Point2<f32>) -> bool {
        let DragState::Dragging { last } = self.drag else {
            return false;
        };
        let delta = position - last;
        self.rotation.rotate(delta.y, delta.x, 0.0);
        self.drag = DragState::Dragging { last: position };
        delta.x != 0.0 || delta.y != 0.0
    }

    /// Finish a drag gesture, applying the final motion first.
    pub fn release(&mut self, position: Point2<f32>) -> bool {
        let changed = self.move_to(position);
        self.drag = DragState::Idle;
        changed
    }

    /// Step one axis by the configured angle, or reset on `Home`.
    pub fn key(&mut self, key: ViewKey) {
        let step = self.settings.key_step;
        match key {
            ViewKey::Left => self.rotation.rotate(0.0, -step, 0.0),
            ViewKey::Right => self.rotation.rotate(0.0, step, 0.0),
            ViewKey::Down => self.rotation.rotate(-step, 0.0, 0.0),
            ViewKey::Up => self.rotation.rotate(step, 0.0, 0.0),
            ViewKey::PageUp => self.rotation.rotate(0.0, 0.0, -step),
            ViewKey::PageDown => self.rotation.rotate(0.0, 0.0, step),
            ViewKey::Home => self.reset(),
        }
    }

    /// Zoom by `steps` wheel notches. There is a floor but no ceiling.
    pub fn scroll(&mut self, steps: f32) {
        self.zoom = (self.zoom + self.settings.zoom_step * steps).max(self.settings.min_zoom);
    }

    pub fn double_click(&mut self) {
        self.reset();
    }

    /// Back to no rotation and unit zoom. An active drag is kept.
    pub fn reset(&mut self) {
        self.rotation = RotationState::zero();
        self.zoom = self.settings.min_zoom;
        debug!("View reset");
    }

    /// Model matrix for a model whose normalization extent is `extent`.
    ///
    /// Vertices are moved so the extent midpoint sits at the origin, scaled
    /// into a unit box, rotated X then Y then Z, zoomed, and finally shifted
    /// by `offset`.
    pub fn model_matrix(&self, extent: &Vector3<f32>, offset: &Vector3<f32>) -> Matrix4<f32> {
        let normalize = Transform::scale_matrix(&extent.map(|c| 1.0 / c));
        let center = Transform::translation_matrix(&(-extent / 2.0));
        self.pose_matrix(offset) * normalize * center
    }

    /// Offset, zoom and rotation without any model normalization.
    pub fn pose_matrix(&self, offset: &Vector3<f32>) -> Matrix4<f32> {
        Transform::translation_matrix(offset)
            * Transform::scale_matrix(&Vector3::repeat(self.zoom))
            * Transform::rotation_matrix(&self.rotation)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert_eq!(state.x, 0.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(state.z, 0.0);

        state.rotate(10.0, 20.0, 30.0);
        assert_relative_eq!(state.x, 10.0);
        assert_relative_eq!(state.y, 20.0);
        assert_relative_eq!(state.z, 30.0);
    }

    #[test]
    fn test_identity_rotation() {
        let rotation = RotationState::zero();
        let matrix = Transform::rotation_matrix(&rotation);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn full_turn_is_identity() {
        let matrix = Transform::rotation_matrix(&RotationState::new(360.0, -720.0, 360.0));
        assert!((matrix - Matrix4::identity()).norm() < 1e-4);
    }

    #[test]
    fn rotation_order_is_x_then_y() {
        // X by 90 takes +Y to +Z, then Y by 90 takes +Z to +X
        let matrix = Transform::rotation_matrix(&RotationState::new(90.0, 90.0, 0.0));
        let p = matrix.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!((p - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn key_steps() {
        let mut view = ViewTransform::default();
        assert_eq!(view.rotation(), RotationState::zero());
        assert_eq!(view.zoom(), 1.0);

        view.key(ViewKey::Left);
        assert_eq!(view.rotation().y, -15.0);
        view.key(ViewKey::Up);
        view.key(ViewKey::Up);
        assert_eq!(view.rotation().x, 30.0);
        view.key(ViewKey::PageUp);
        assert_eq!(view.rotation().z, -15.0);
        view.key(ViewKey::PageDown);
        view.key(ViewKey::PageDown);
        assert_eq!(view.rotation().z, 15.0);
    }

    #[test]
    fn home_resets_everything() {
        let mut view = ViewTransform::default();
        view.press(Point2::new(0.0, 0.0));
        view.move_to(Point2::new(40.0, -25.0));
        view.release(Point2::new(40.0, -25.0));
        view.scroll(7.0);
        view.key(ViewKey::Right);

        view.key(ViewKey::Home);
        assert_eq!(view.rotation(), RotationState::zero());
        assert_eq!(view.zoom(), 1.0);
    }

    #[test]
    fn drag_gesture() {
        let mut view = ViewTransform::default();
        view.press(Point2::new(100.0, 100.0));
        assert!(view.is_dragging());

        assert!(view.move_to(Point2::new(110.0, 130.0)));
        assert_eq!(view.rotation().x, 30.0);
        assert_eq!(view.rotation().y, 10.0);

        assert!(!view.release(Point2::new(110.0, 130.0)));
        assert_eq!(view.rotation().x, 30.0);
        assert_eq!(view.rotation().y, 10.0);
        assert_eq!(view.drag_state(), DragState::Idle);
    }

    #[test]
    fn press_while_dragging_restarts_gesture() {
        let mut view = ViewTransform::default();
        view.press(Point2::new(0.0, 0.0));
        view.press(Point2::new(50.0, 50.0));
        assert!(view.move_to(Point2::new(60.0, 50.0)));
        assert_eq!(view.rotation(), RotationState::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn keys_apply_mid_drag() {
        let mut view = ViewTransform::default();
        view.press(Point2::new(10.0, 10.0));
        view.scroll(3.0);

        view.key(ViewKey::Right);
        assert_eq!(view.rotation().y, 15.0);
        assert!(view.is_dragging());

        view.key(ViewKey::Home);
        assert_eq!(view.rotation(), RotationState::zero());
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(
            view.drag_state(),
            DragState::Dragging {
                last: Point2::new(10.0, 10.0)
            }
        );

        // The drag carries on from where it was
        view.move_to(Point2::new(10.0, 15.0));
        assert_eq!(view.rotation(), RotationState::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn zoom_floor_never_below_one() {
        for min_zoom in [0.5, 0.0, -2.0, f32::NAN] {
            let mut view = ViewTransform::new(InteractionConfig {
                min_zoom,
                ..InteractionConfig::default()
            });
            assert_eq!(view.zoom(), 1.0);
            view.scroll(-50.0);
            assert_eq!(view.zoom(), 1.0);
            view.scroll(2.0);
            view.reset();
            assert_eq!(view.zoom(), 1.0);
        }
    }

    #[test]
    fn release_applies_final_delta() {
        let mut view = ViewTransform::default();
        view.press(Point2::new(0.0, 0.0));
        assert!(view.release(Point2::new(-5.0, 8.0)));
        assert_eq!(view.rotation(), RotationState::new(8.0, -5.0, 0.0));
    }

    #[test]
    fn motion_while_idle_is_ignored() {
        let mut view = ViewTransform::default();
        assert!(!view.move_to(Point2::new(50.0, 50.0)));
        assert!(!view.release(Point2::new(80.0, 10.0)));
        assert_eq!(view.rotation(), RotationState::zero());
    }

    #[test]
    fn zoom_has_floor_only() {
        let mut view = ViewTransform::default();
        view.scroll(3.0);
        assert_relative_eq!(view.zoom(), 1.3, epsilon = 1e-6);
        view.scroll(-100.0);
        assert_eq!(view.zoom(), 1.0);
        view.scroll(1000.0);
        assert_relative_eq!(view.zoom(), 101.0, epsilon = 1e-3);
    }

    #[test]
    fn double_click_resets() {
        let mut view = ViewTransform::default();
        view.key(ViewKey::Down);
        view.scroll(2.0);
        view.double_click();
        assert_eq!(view, ViewTransform::default());
    }

    #[test]
    fn model_matrix_centers_and_normalizes() {
        let view = ViewTransform::default();
        let extent = Vector3::new(4.0, 2.0, 8.0);
        let m = view.model_matrix(&extent, &Vector3::zeros());

        let center = m.transform_point(&Point3::new(2.0, 1.0, 4.0));
        assert!(center.coords.norm() < 1e-6);
        let corner = m.transform_point(&Point3::new(4.0, 2.0, 8.0));
        assert!((corner - Point3::new(0.5, 0.5, 0.5)).norm() < 1e-6);
    }

    #[test]
    fn model_matrix_rotates_about_pivot() {
        let mut view = ViewTransform::default();
        view.key(ViewKey::Right);
        view.scroll(10.0);
        let extent = Vector3::new(2.0, 2.0, 2.0);
        let offset = Vector3::new(0.0, 0.0, -3.0);
        let m = view.model_matrix(&extent, &offset);

        // The pivot only moves by the offset
        let pivot = m.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((pivot - Point3::new(0.0, 0.0, -3.0)).norm() < 1e-6);
        // Zoom scales distances from the pivot
        let top = m.transform_point(&Point3::new(1.0, 2.0, 1.0));
        assert_relative_eq!((top - pivot).norm(), 2.0 * 0.5, epsilon = 1e-5);
    }
}
