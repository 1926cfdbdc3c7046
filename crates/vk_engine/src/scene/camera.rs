//! Keyboard-driven camera

use crate::foundation::math::{vulkan_perspective, Mat4, Vec3};
use crate::input::MoveFlags;

/// World translation applied by the view matrix before any input
pub const DEFAULT_CAMERA_POSITION: [f32; 3] = [0.0, -6.0, -10.0];

const TRANSLATE_STEP: f32 = 0.1;
const ROTATE_STEP: f32 = 2.0 * std::f32::consts::PI / 180.0;

/// Plane the arrow keys move in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisPlane {
    /// Up/down moves along Y
    #[default]
    XY,
    /// Up/down moves along Z
    XZ,
}

impl AxisPlane {
    /// The other plane
    pub fn toggled(self) -> Self {
        match self {
            Self::XY => Self::XZ,
            Self::XZ => Self::XY,
        }
    }
}

/// Camera whose offset accumulates across frames until reset
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    base: Vec3,
    offset: Vec3,
    yaw: f32,
    pitch: f32,
    plane: AxisPlane,
    /// Vertical field of view in radians
    pub fovy: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl CameraRig {
    /// Rig at `base` with no offset
    pub fn new(base: Vec3) -> Self {
        Self {
            base,
            offset: Vec3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            plane: AxisPlane::XY,
            fovy: 70f32.to_radians(),
            near: 0.1,
            far: 200.0,
        }
    }

    /// Add one frame's worth of movement
    pub fn apply(&mut self, moves: MoveFlags) {
        let vertical = match self.plane {
            AxisPlane::XY => Vec3::y(),
            AxisPlane::XZ => Vec3::z(),
        };

        if moves.contains(MoveFlags::LEFT) {
            self.offset.x += TRANSLATE_STEP;
        }
        if moves.contains(MoveFlags::RIGHT) {
            self.offset.x -= TRANSLATE_STEP;
        }
        if moves.contains(MoveFlags::UP) {
            self.offset -= vertical * TRANSLATE_STEP;
        }
        if moves.contains(MoveFlags::DOWN) {
            self.offset += vertical * TRANSLATE_STEP;
        }
        if moves.contains(MoveFlags::YAW_LEFT) {
            self.yaw -= ROTATE_STEP;
        }
        if moves.contains(MoveFlags::YAW_RIGHT) {
            self.yaw += ROTATE_STEP;
        }
        if moves.contains(MoveFlags::PITCH_UP) {
            self.pitch -= ROTATE_STEP;
        }
        if moves.contains(MoveFlags::PITCH_DOWN) {
            self.pitch += ROTATE_STEP;
        }
    }

    /// Swap the arrow-key plane
    pub fn toggle_plane(&mut self) {
        self.plane = self.plane.toggled();
        log::info!("Camera arrows now move in the {:?} plane", self.plane);
    }

    /// Clear the accumulated offset and rotation
    pub fn reset(&mut self) {
        self.offset = Vec3::zeros();
        self.yaw = 0.0;
        self.pitch = 0.0;
    }

    /// Accumulated translation
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Plane the arrow keys move in
    pub fn plane(&self) -> AxisPlane {
        self.plane
    }

    /// View matrix
    pub fn view(&self) -> Mat4 {
        let translation = Mat4::new_translation(&(self.base + self.offset));
        let pitch = Mat4::from_axis_angle(&Vec3::x_axis(), self.pitch);
        let yaw = Mat4::from_axis_angle(&Vec3::y_axis(), self.yaw);
        translation * pitch * yaw
    }

    /// Vulkan perspective for `aspect`
    pub fn projection(&self, aspect: f32) -> Mat4 {
        vulkan_perspective(aspect, self.fovy, self.near, self.far)
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(Vec3::from(DEFAULT_CAMERA_POSITION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_offset_accumulates_across_frames() {
        let mut camera = CameraRig::default();
        camera.apply(MoveFlags::RIGHT);
        camera.apply(MoveFlags::RIGHT);
        assert_relative_eq!(camera.offset().x, -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_plane_changes_vertical_axis() {
        let mut camera = CameraRig::default();
        camera.apply(MoveFlags::DOWN);
        assert_relative_eq!(camera.offset().y, 0.1, epsilon = 1e-6);

        camera.toggle_plane();
        camera.apply(MoveFlags::DOWN);
        assert_relative_eq!(camera.offset().z, 0.1, epsilon = 1e-6);
        assert_eq!(camera.plane(), AxisPlane::XZ);
    }

    #[test]
    fn test_reset_clears_offset() {
        let mut camera = CameraRig::default();
        camera.apply(MoveFlags::LEFT | MoveFlags::YAW_LEFT);
        camera.reset();
        assert_eq!(camera.offset(), Vec3::zeros());
        assert_eq!(camera.view(), CameraRig::default().view());
    }

    #[test]
    fn test_view_translates_by_base() {
        let camera = CameraRig::default();
        let origin = camera.view() * crate::foundation::math::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.z, -10.0);
        assert_relative_eq!(origin.y, -6.0);
    }
}
