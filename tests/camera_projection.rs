//! Camera and Transform Integration Tests
//!
//! Tests for:
//! - Origin projection through the default demo camera
//! - Depth range of the left-handed projection
//! - Camera movement agreeing with its transform's basis
//! - Transform world matrix invariants through the public API

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use terrasphere::{Camera, CameraSettings, Input, KeyCode, Transform, Vec3, Vec4};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn demo_camera() -> Camera {
    let settings = CameraSettings::new().field_of_view(FRAC_PI_4);
    Camera::new([0.0, 0.0, -5.0], 16.0 / 9.0, settings).unwrap()
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn origin_projects_to_ndc_center() {
    let camera = demo_camera();
    let clip = camera.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);

    assert!(clip.w > 0.0, "origin should be in front of the camera");
    let ndc = clip.truncate() / clip.w;
    assert!(approx(ndc.x, 0.0), "ndc.x = {}", ndc.x);
    assert!(approx(ndc.y, 0.0), "ndc.y = {}", ndc.y);
    assert!(ndc.z > 0.0 && ndc.z < 1.0, "ndc.z = {}", ndc.z);
}

#[test]
fn near_and_far_planes_map_to_zero_and_one() {
    let camera = demo_camera();
    let settings = *camera.settings();

    let near = camera.view_projection() * Vec4::new(0.0, 0.0, -5.0 + settings.near, 1.0);
    let far = camera.view_projection() * Vec4::new(0.0, 0.0, -5.0 + settings.far, 1.0);

    assert!(approx(near.z / near.w, 0.0));
    assert!(approx(far.z / far.w, 1.0));
}

#[test]
fn world_right_lands_on_positive_ndc_x() {
    let camera = demo_camera();
    let clip = camera.view_projection() * Vec4::new(1.0, 0.5, 0.0, 1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x > 0.0);
    assert!(ndc.y > 0.0);
}

#[test]
fn wider_window_narrows_horizontal_extent() {
    let mut camera = demo_camera();
    let point = Vec4::new(1.0, 0.0, 0.0, 1.0);

    let before = camera.view_projection() * point;
    camera.update_projection_matrix(32.0 / 9.0).unwrap();
    let after = camera.view_projection() * point;

    assert!(approx(after.x / after.w, 0.5 * before.x / before.w));
}

// ============================================================================
// Camera / Transform agreement
// ============================================================================

#[test]
fn forward_key_follows_transform_forward() {
    let mut camera = demo_camera();
    camera.look(FRAC_PI_2, 0.0);

    let forward = camera.transform_mut().forward();
    assert!(approx_vec(forward, Vec3::X), "forward = {forward}");

    let mut input = Input::new();
    input.press_key(KeyCode::KeyW);
    camera.update(&input, 1.0).unwrap();

    let speed = camera.settings().movement_speed;
    assert!(approx_vec(camera.position(), Vec3::new(speed, 0.0, -5.0)));
}

#[test]
fn view_matrix_inverts_camera_pose() {
    let mut camera = demo_camera();
    camera.look(0.4, -0.2);
    camera.update(&Input::new(), 0.0).unwrap();

    let eye = camera.view() * camera.position().extend(1.0);
    assert!(approx_vec(eye.truncate(), Vec3::ZERO));

    let forward = camera.transform_mut().forward();
    let ahead = camera.view() * (camera.position() + forward).extend(1.0);
    assert!(approx_vec(ahead.truncate(), Vec3::Z));
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn world_translation_tracks_position() {
    let mut transform = Transform::new();
    transform.set_position([3.0, -1.0, 2.0]);
    transform.move_absolute([1.0, 1.0, 1.0]);
    transform.rotate(0.3, 1.1, -0.2);

    let world = transform.world_matrix();
    assert!(approx_vec(world.w_axis.truncate(), Vec3::new(4.0, 0.0, 3.0)));
}

#[test]
fn repeated_scale_compounds() {
    let mut transform = Transform::new();
    transform.scale_by([2.0, 2.0, 2.0]);
    transform.scale_by([2.0, 2.0, 2.0]);
    assert_eq!(transform.scale(), Vec3::splat(4.0));
}

#[test]
fn relative_move_after_quarter_yaw_goes_along_x() {
    let mut transform = Transform::new();
    transform.rotate(0.0, FRAC_PI_2, 0.0);
    transform.move_relative([0.0, 0.0, 1.0]);
    assert!(approx_vec(transform.position(), Vec3::X));
}
