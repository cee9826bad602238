//! A first-person fly camera built on [`Transform`].
//!
//! The camera owns a transform and derives two matrices from it:
//!
//! - a left-handed "look-to" **view** matrix from the transform's position and
//!   forward vector, rebuilt after every [`Camera::update`]
//! - a left-handed **perspective projection** from the field of view and
//!   aspect ratio, rebuilt only on explicit request (construction, resize)
//!
//! # Controls
//!
//! - **W/S**: move forward/backward along the view direction
//! - **A/D**: strafe left/right
//! - **Space / X**: move up/down along world +Y, regardless of pitch
//! - **Left mouse + drag**: look around
//!
//! # Example
//!
//! ```
//! use terrasphere::{Camera, CameraSettings, Input, Vec3};
//!
//! let mut camera = Camera::new([0.0, 0.0, -5.0], 16.0 / 9.0, CameraSettings::default()).unwrap();
//! let input = Input::new();
//! camera.update(&input, 1.0 / 60.0).unwrap();
//!
//! let clip = camera.projection() * camera.view() * Vec3::ZERO.extend(1.0);
//! assert!((clip.x / clip.w).abs() < 1e-5);
//! ```

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Mat4, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::error::CameraError;
use crate::input::Input;
use crate::transform::Transform;

/// Pitch stays this far inside ±90° so forward never lines up with world up,
/// which would leave the look-to basis undefined.
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Tunable camera parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    /// Vertical field of view in radians, in `(0, π)`.
    pub field_of_view: f32,
    /// Units per second.
    pub movement_speed: f32,
    /// Radians per pixel of cursor travel per second.
    pub mouse_look_speed: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            field_of_view: FRAC_PI_4,
            movement_speed: 2.0,
            mouse_look_speed: 1.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl CameraSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field of view in radians.
    pub fn field_of_view(mut self, radians: f32) -> Self {
        self.field_of_view = radians;
        self
    }

    pub fn movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    pub fn mouse_look_speed(mut self, speed: f32) -> Self {
        self.mouse_look_speed = speed;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }
}

/// A fly camera with cached view and projection matrices.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    settings: CameraSettings,
    aspect_ratio: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// Creates a camera at `position` looking down +Z.
    ///
    /// Fails if the field of view, aspect ratio, or clip planes could not
    /// produce a valid projection.
    pub fn new(
        position: impl Into<Vec3>,
        aspect_ratio: f32,
        settings: CameraSettings,
    ) -> Result<Self, CameraError> {
        validate_field_of_view(settings.field_of_view)?;
        if !(settings.near > 0.0 && settings.far > settings.near) {
            return Err(CameraError::InvalidClipPlanes {
                near: settings.near,
                far: settings.far,
            });
        }

        let mut camera = Self {
            transform: Transform::from_position(position),
            settings,
            aspect_ratio,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix(aspect_ratio)?;
        camera.update_view_matrix()?;

        log::debug!(
            "camera created at {} (fov {:.3} rad, aspect {:.3})",
            camera.transform.position(),
            settings.field_of_view,
            aspect_ratio
        );
        Ok(camera)
    }

    /// Applies one frame of fly/free-look input, then rebuilds the view matrix.
    pub fn update(&mut self, input: &Input, dt: f32) -> Result<(), CameraError> {
        let speed = self.settings.movement_speed * dt;

        if input.key_down(KeyCode::KeyW) {
            self.transform.move_relative([0.0, 0.0, speed]);
        }
        if input.key_down(KeyCode::KeyS) {
            self.transform.move_relative([0.0, 0.0, -speed]);
        }
        if input.key_down(KeyCode::KeyA) {
            self.transform.move_relative([-speed, 0.0, 0.0]);
        }
        if input.key_down(KeyCode::KeyD) {
            self.transform.move_relative([speed, 0.0, 0.0]);
        }
        // Vertical motion is world-space: flying up is always +Y.
        if input.key_down(KeyCode::Space) {
            self.transform.move_absolute([0.0, speed, 0.0]);
        }
        if input.key_down(KeyCode::KeyX) {
            self.transform.move_absolute([0.0, -speed, 0.0]);
        }

        if input.mouse_down(MouseButton::Left) {
            let look = input.mouse_delta() * self.settings.mouse_look_speed * dt;
            self.look(look.x, look.y);
        }

        self.update_view_matrix()
    }

    /// Turns the camera by `yaw` and `pitch` radians, clamping pitch so the
    /// camera never flips over the poles.
    pub fn look(&mut self, yaw: f32, pitch: f32) {
        self.transform.rotate(pitch, yaw, 0.0);

        let angles = self.transform.pitch_yaw_roll();
        let clamped = angles.x.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        if clamped != angles.x {
            self.transform
                .set_pitch_yaw_roll([clamped, angles.y, angles.z]);
        }
    }

    /// Rebuilds the view matrix from the transform's position and forward
    /// vector, with world +Y as the reference up axis.
    pub fn update_view_matrix(&mut self) -> Result<(), CameraError> {
        let position = self.transform.position();
        let forward = self.transform.forward();

        if forward.length_squared() < f32::EPSILON
            || forward.normalize().cross(Vec3::Y).length_squared() < 1e-8
        {
            return Err(CameraError::DegenerateLookDirection);
        }

        // +Z points into the screen.
        self.view = Mat4::look_to_lh(position, forward, Vec3::Y);
        Ok(())
    }

    /// Rebuilds the projection for a new aspect ratio (e.g. after a resize).
    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) -> Result<(), CameraError> {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            return Err(CameraError::InvalidAspectRatio(aspect_ratio));
        }
        self.aspect_ratio = aspect_ratio;
        self.projection = Mat4::perspective_lh(
            self.settings.field_of_view,
            aspect_ratio,
            self.settings.near,
            self.settings.far,
        );
        Ok(())
    }

    /// Changes the field of view and rebuilds the projection.
    pub fn set_field_of_view(&mut self, radians: f32) -> Result<(), CameraError> {
        validate_field_of_view(radians)?;
        self.settings.field_of_view = radians;
        self.update_projection_matrix(self.aspect_ratio)
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// `projection * view`, mapping world space to clip space.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the pose. Call [`Camera::update_view_matrix`] (or
    /// [`Camera::update`]) afterwards for the view matrix to catch up.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn field_of_view(&self) -> f32 {
        self.settings.field_of_view
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.settings.movement_speed = speed;
    }

    pub fn set_mouse_look_speed(&mut self, speed: f32) {
        self.settings.mouse_look_speed = speed;
    }
}

fn validate_field_of_view(radians: f32) -> Result<(), CameraError> {
    if radians > 0.0 && radians < PI {
        Ok(())
    } else {
        Err(CameraError::InvalidFieldOfView(radians))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn camera() -> Camera {
        Camera::new([0.0, 0.0, -5.0], 16.0 / 9.0, CameraSettings::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_projection_inputs() {
        let settings = CameraSettings::default();
        assert_eq!(
            Camera::new(Vec3::ZERO, 0.0, settings).unwrap_err(),
            CameraError::InvalidAspectRatio(0.0)
        );
        assert_eq!(
            Camera::new(Vec3::ZERO, 1.0, settings.field_of_view(PI)).unwrap_err(),
            CameraError::InvalidFieldOfView(PI)
        );
        assert!(matches!(
            Camera::new(Vec3::ZERO, 1.0, settings.clip_planes(1.0, 0.5)),
            Err(CameraError::InvalidClipPlanes { .. })
        ));

        let mut cam = camera();
        let before = cam.projection();
        assert!(cam.update_projection_matrix(-1.0).is_err());
        assert!(cam.set_field_of_view(0.0).is_err());
        assert_eq!(cam.projection(), before);
    }

    #[test]
    fn forward_key_moves_along_view_direction() {
        let mut cam = camera();
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);

        cam.update(&input, 0.5).unwrap();
        // speed 2.0 * 0.5s along +Z
        assert!((cam.position() - Vec3::new(0.0, 0.0, -4.0)).length() < 1e-5);
    }

    #[test]
    fn vertical_motion_ignores_pitch() {
        let mut cam = camera();
        cam.look(0.0, 0.8);
        let mut input = Input::new();
        input.press_key(KeyCode::Space);

        cam.update(&input, 1.0).unwrap();
        assert!((cam.position() - Vec3::new(0.0, 2.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn strafe_keys_move_along_right_axis() {
        for (key, expected_x) in [(KeyCode::KeyD, 1.0), (KeyCode::KeyA, -1.0)] {
            let mut cam = camera();
            let mut input = Input::new();
            input.press_key(key);

            cam.update(&input, 0.5).unwrap();
            assert!(
                (cam.position() - Vec3::new(expected_x, 0.0, -5.0)).length() < 1e-5,
                "{key:?} moved camera to {}",
                cam.position()
            );
        }
    }

    #[test]
    fn backward_key_retreats_along_view_direction() {
        let mut cam = camera();
        let mut input = Input::new();
        input.press_key(KeyCode::KeyS);

        cam.update(&input, 0.5).unwrap();
        assert!((cam.position() - Vec3::new(0.0, 0.0, -6.0)).length() < 1e-5);
    }

    #[test]
    fn descend_key_moves_down_world_y() {
        let mut cam = camera();
        cam.look(0.0, -0.6);
        let mut input = Input::new();
        input.press_key(KeyCode::KeyX);

        cam.update(&input, 1.0).unwrap();
        assert!((cam.position() - Vec3::new(0.0, -2.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn look_requires_left_mouse() {
        let mut cam = camera();
        let mut input = Input::new();
        input.move_cursor(Vec2::new(0.0, 0.0));
        input.move_cursor(Vec2::new(30.0, 10.0));

        cam.update(&input, 0.01).unwrap();
        assert_eq!(cam.transform().pitch_yaw_roll(), Vec3::ZERO);

        input.press_mouse(MouseButton::Left);
        cam.update(&input, 0.01).unwrap();
        let angles = cam.transform().pitch_yaw_roll();
        assert!((angles.y - 0.3).abs() < 1e-5);
        assert!((angles.x - 0.1).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped_under_repeated_look() {
        let mut cam = camera();
        let mut input = Input::new();
        input.press_mouse(MouseButton::Left);
        input.move_cursor(Vec2::ZERO);

        for frame in 0..200 {
            input.begin_frame();
            input.move_cursor(Vec2::new(0.0, -500.0 * (frame + 1) as f32));
            cam.update(&input, 0.1).unwrap();
            let pitch = cam.transform().pitch_yaw_roll().x;
            assert!(pitch >= -FRAC_PI_2 && pitch <= FRAC_PI_2);
        }
        assert!((cam.transform().pitch_yaw_roll().x + PITCH_LIMIT).abs() < 1e-6);

        cam.look(0.0, 1000.0);
        assert!((cam.transform().pitch_yaw_roll().x - PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn clamp_preserves_yaw_and_roll() {
        let mut cam = camera();
        cam.transform_mut().set_pitch_yaw_roll([0.0, 1.25, 0.5]);
        cam.look(0.0, 10.0);
        let angles = cam.transform().pitch_yaw_roll();
        assert_eq!(angles.y, 1.25);
        assert_eq!(angles.z, 0.5);
    }

    #[test]
    fn view_follows_pose_after_update() {
        let mut cam = camera();
        cam.transform_mut().set_position([3.0, 1.0, 2.0]);
        cam.update(&Input::new(), 0.016).unwrap();

        // The camera's own position maps to the view-space origin.
        let eye = cam.view().transform_point3(Vec3::new(3.0, 1.0, 2.0));
        assert!(eye.length() < 1e-5);

        // A point ahead of the camera has positive view-space depth.
        let ahead = cam.view().transform_point3(Vec3::new(3.0, 1.0, 10.0));
        assert!(ahead.z > 0.0);
    }

    #[test]
    fn degenerate_forward_is_an_error() {
        let mut cam = camera();
        cam.transform_mut().set_pitch_yaw_roll([FRAC_PI_2, 0.0, 0.0]);
        assert_eq!(
            cam.update_view_matrix(),
            Err(CameraError::DegenerateLookDirection)
        );
    }

    #[test]
    fn resize_rebuilds_projection_only() {
        let mut cam = camera();
        let view = cam.view();
        let before = cam.projection();
        cam.update_projection_matrix(4.0 / 3.0).unwrap();
        assert_ne!(cam.projection(), before);
        assert_eq!(cam.view(), view);
        assert_eq!(cam.aspect_ratio(), 4.0 / 3.0);
    }
}
