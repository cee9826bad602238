//! Position, orientation, and scale for a single object.
//!
//! [`Transform`] stores its orientation as three Euler angles (pitch, yaw,
//! roll) rather than a quaternion, and derives everything else on demand:
//!
//! - the world matrix and its inverse-transpose, recomputed only after a mutation
//! - the local basis vectors (`right`, `up`, `forward`), recomputed only after
//!   an orientation change
//!
//! Objects are read every draw but written at most once per frame, so both
//! derived values sit behind a [`Cached`] flag instead of being rebuilt on
//! every read.
//!
//! # Orientation convention
//!
//! Angles are passed as `(pitch, yaw, roll)`. The composed rotation applies
//! roll about Z first, then pitch about X, then yaw about Y. The world matrix,
//! [`Transform::move_relative`], and the basis getters all go through
//! [`Transform::rotation`], so they always agree.
//!
//! The coordinate system is left-handed: +X right, +Y up, +Z forward into the
//! screen. A positive yaw of 90° turns `forward` from +Z to +X.
//!
//! # Example
//!
//! ```
//! use terrasphere::{Transform, Vec3};
//!
//! let mut transform = Transform::new();
//! transform.set_position([0.0, 1.0, 0.0]);
//! transform.rotate(0.0, std::f32::consts::FRAC_PI_2, 0.0);
//! transform.move_relative([0.0, 0.0, 2.0]);
//!
//! let p = transform.position();
//! assert!((p - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-5);
//! ```

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A memoized value plus a staleness flag.
///
/// Reads go through [`Cached::get_or_update`], which only runs the
/// recompute closure when the value has been invalidated.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cached<T> {
    value: T,
    stale: bool,
    recomputes: u64,
}

impl<T: Copy> Cached<T> {
    /// A cache that already holds a valid value.
    pub(crate) fn fresh(value: T) -> Self {
        Self {
            value,
            stale: false,
            recomputes: 0,
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.stale = true;
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of times the value has been rebuilt since construction.
    pub(crate) fn recomputes(&self) -> u64 {
        self.recomputes
    }

    pub(crate) fn get_or_update(&mut self, recompute: impl FnOnce() -> T) -> T {
        if self.stale {
            self.value = recompute();
            self.stale = false;
            self.recomputes += 1;
        }
        self.value
    }
}

/// The world matrix together with the matrix used to transform normals.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WorldMatrices {
    world: Mat4,
    inverse_transpose: Mat4,
}

/// Local axes of the transform, expressed in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Basis {
    right: Vec3,
    up: Vec3,
    forward: Vec3,
}

impl Basis {
    const IDENTITY: Self = Self {
        right: Vec3::X,
        up: Vec3::Y,
        forward: Vec3::Z,
    };
}

/// Position, Euler orientation, and scale with lazily derived matrices.
///
/// Every mutator marks the world matrix stale; orientation mutators also mark
/// the basis vectors stale. Getters that return derived data take `&mut self`
/// because they may need to refresh the cache.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vec3,
    /// NOT a quaternion: (pitch, yaw, roll) in radians.
    pitch_yaw_roll: Vec3,
    scale: Vec3,

    matrices: Cached<WorldMatrices>,
    basis: Cached<Basis>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            pitch_yaw_roll: Vec3::ZERO,
            scale: Vec3::ONE,
            matrices: Cached::fresh(WorldMatrices {
                world: Mat4::IDENTITY,
                inverse_transpose: Mat4::IDENTITY,
            }),
            basis: Cached::fresh(Basis::IDENTITY),
        }
    }
}

impl Transform {
    /// Creates an identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform at `position` with no rotation and unit scale.
    pub fn from_position(position: impl Into<Vec3>) -> Self {
        let mut transform = Self::default();
        transform.set_position(position);
        transform
    }

    // ------------------------------------------------------------------
    // Offsetters: change the existing data
    // ------------------------------------------------------------------

    /// Moves along the world axes, ignoring orientation.
    pub fn move_absolute(&mut self, offset: impl Into<Vec3>) {
        self.position += offset.into();
        self.matrices.invalidate();
    }

    /// Moves along the transform's own axes.
    ///
    /// `(0, 0, 1)` moves one unit along [`Transform::forward`].
    pub fn move_relative(&mut self, offset: impl Into<Vec3>) {
        self.position += self.rotation() * offset.into();
        self.matrices.invalidate();
    }

    /// Adds to the pitch, yaw, and roll angles (radians).
    ///
    /// No wrapping or clamping happens here; callers own that policy.
    pub fn rotate(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.pitch_yaw_roll += Vec3::new(pitch, yaw, roll);
        self.invalidate_orientation();
    }

    /// Multiplies the current scale componentwise.
    ///
    /// Scaling by 2 twice yields a factor of 4.
    pub fn scale_by(&mut self, factors: impl Into<Vec3>) {
        self.scale *= factors.into();
        self.matrices.invalidate();
    }

    // ------------------------------------------------------------------
    // Setters: overwrite the existing data
    // ------------------------------------------------------------------

    pub fn set_position(&mut self, position: impl Into<Vec3>) {
        self.position = position.into();
        self.matrices.invalidate();
    }

    /// Overwrites the orientation. `angles` is `(pitch, yaw, roll)` in radians.
    pub fn set_pitch_yaw_roll(&mut self, angles: impl Into<Vec3>) {
        self.pitch_yaw_roll = angles.into();
        self.invalidate_orientation();
    }

    pub fn set_scale(&mut self, scale: impl Into<Vec3>) {
        self.scale = scale.into();
        self.matrices.invalidate();
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// `(pitch, yaw, roll)` in radians.
    pub fn pitch_yaw_roll(&self) -> Vec3 {
        self.pitch_yaw_roll
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// The orientation as a quaternion: roll about Z, then pitch about X,
    /// then yaw about Y.
    pub fn rotation(&self) -> Quat {
        let [pitch, yaw, roll] = self.pitch_yaw_roll.to_array();
        Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
    }

    /// The local-to-world matrix: scale, then rotate, then translate.
    ///
    /// Only rebuilt when a mutator has run since the last read.
    pub fn world_matrix(&mut self) -> Mat4 {
        self.refresh_matrices().world
    }

    /// The inverse-transpose of [`Transform::world_matrix`], for transforming
    /// normals under non-uniform scale. Shares the world matrix cache.
    pub fn world_inverse_transpose(&mut self) -> Mat4 {
        self.refresh_matrices().inverse_transpose
    }

    /// World-space direction of local +Y.
    pub fn up(&mut self) -> Vec3 {
        self.refresh_basis().up
    }

    /// World-space direction of local +X.
    pub fn right(&mut self) -> Vec3 {
        self.refresh_basis().right
    }

    /// World-space direction of local +Z.
    pub fn forward(&mut self) -> Vec3 {
        self.refresh_basis().forward
    }

    /// True when the next matrix read will trigger a recompute.
    pub fn is_matrix_dirty(&self) -> bool {
        self.matrices.is_stale()
    }

    /// True when the next basis-vector read will trigger a recompute.
    pub fn is_basis_dirty(&self) -> bool {
        self.basis.is_stale()
    }

    /// How many times the world matrices have been rebuilt.
    pub fn matrix_recomputes(&self) -> u64 {
        self.matrices.recomputes()
    }

    fn invalidate_orientation(&mut self) {
        self.matrices.invalidate();
        self.basis.invalidate();
    }

    fn refresh_matrices(&mut self) -> WorldMatrices {
        let (scale, rotation, position) = (self.scale, self.rotation(), self.position);
        self.matrices.get_or_update(|| {
            let world = Mat4::from_scale_rotation_translation(scale, rotation, position);
            debug_assert!(
                world.determinant().abs() > f32::EPSILON,
                "world matrix is singular (scale {scale}); normals cannot be transformed"
            );
            WorldMatrices {
                world,
                inverse_transpose: world.transpose().inverse(),
            }
        })
    }

    fn refresh_basis(&mut self) -> Basis {
        let rotation = self.rotation();
        self.basis.get_or_update(|| Basis {
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
            forward: rotation * Vec3::Z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f32 = 1e-5;

    fn vec3_approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn default_is_identity() {
        let mut t = Transform::new();
        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.pitch_yaw_roll(), Vec3::ZERO);
        assert_eq!(t.scale(), Vec3::ONE);
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        assert_eq!(t.world_inverse_transpose(), Mat4::IDENTITY);
        assert!(!t.is_matrix_dirty());
    }

    #[test]
    fn translation_tracks_last_absolute_position() {
        let mut t = Transform::new();
        t.move_absolute([1.0, 2.0, 3.0]);
        t.move_absolute([-4.0, 0.5, 1.0]);
        assert!(vec3_approx(t.world_matrix().w_axis.truncate(), Vec3::new(-3.0, 2.5, 4.0)));

        t.set_position([7.0, -1.0, 0.25]);
        t.move_absolute([1.0, 1.0, 1.0]);
        assert_eq!(t.world_matrix().w_axis.truncate(), Vec3::new(8.0, 0.0, 1.25));
    }

    #[test]
    fn world_matrix_is_memoized() {
        let mut t = Transform::new();
        t.set_position([1.0, 2.0, 3.0]);
        t.rotate(0.3, 0.2, 0.1);
        assert!(t.is_matrix_dirty());

        let first = t.world_matrix();
        assert!(!t.is_matrix_dirty());
        assert_eq!(t.matrix_recomputes(), 1);

        let second = t.world_matrix();
        assert_eq!(first.to_cols_array(), second.to_cols_array());
        assert_eq!(t.matrix_recomputes(), 1);

        // The inverse-transpose shares the same cache.
        let _ = t.world_inverse_transpose();
        assert_eq!(t.matrix_recomputes(), 1);

        t.move_absolute([0.0, 1.0, 0.0]);
        assert!(t.is_matrix_dirty());
        let _ = t.world_matrix();
        assert_eq!(t.matrix_recomputes(), 2);
    }

    #[test]
    fn every_mutator_marks_matrix_dirty() {
        let mutators: [fn(&mut Transform); 7] = [
            |t| t.move_absolute([1.0, 0.0, 0.0]),
            |t| t.move_relative([1.0, 0.0, 0.0]),
            |t| t.rotate(0.1, 0.0, 0.0),
            |t| t.scale_by([2.0, 2.0, 2.0]),
            |t| t.set_position([1.0, 1.0, 1.0]),
            |t| t.set_pitch_yaw_roll([0.0, 1.0, 0.0]),
            |t| t.set_scale([3.0, 3.0, 3.0]),
        ];

        for mutate in mutators {
            let mut t = Transform::new();
            let _ = t.world_matrix();
            mutate(&mut t);
            assert!(t.is_matrix_dirty());
        }
    }

    #[test]
    fn only_orientation_changes_dirty_the_basis() {
        let mut t = Transform::new();
        t.move_absolute([1.0, 0.0, 0.0]);
        t.scale_by([2.0, 2.0, 2.0]);
        t.set_position([0.0, 5.0, 0.0]);
        assert!(!t.is_basis_dirty());

        t.rotate(0.0, 0.5, 0.0);
        assert!(t.is_basis_dirty());
        let _ = t.forward();
        assert!(!t.is_basis_dirty());
    }

    #[test]
    fn scale_compounds() {
        let mut t = Transform::new();
        t.scale_by([2.0, 2.0, 2.0]);
        t.scale_by([2.0, 2.0, 2.0]);
        assert_eq!(t.scale(), Vec3::splat(4.0));

        let world = t.world_matrix();
        assert!(vec3_approx(world.transform_vector3(Vec3::X), Vec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn basis_is_orthonormal_for_many_orientations() {
        let mut t = Transform::new();
        for i in 0..16 {
            for j in 0..16 {
                let pitch = -3.0 + i as f32 * 0.4;
                let yaw = -3.0 + j as f32 * 0.4;
                let roll = (i * j) as f32 * 0.05;
                t.set_pitch_yaw_roll([pitch, yaw, roll]);

                let (r, u, f) = (t.right(), t.up(), t.forward());
                for v in [r, u, f] {
                    assert!((v.length() - 1.0).abs() < 1e-4);
                }
                assert!(r.dot(u).abs() < 1e-4);
                assert!(u.dot(f).abs() < 1e-4);
                assert!(f.dot(r).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn move_relative_matches_absolute_at_identity() {
        let mut relative = Transform::new();
        let mut absolute = Transform::new();
        relative.move_relative([0.0, 0.0, 1.0]);
        absolute.move_absolute([0.0, 0.0, 1.0]);
        assert_eq!(relative.position(), absolute.position());
    }

    #[test]
    fn positive_yaw_turns_forward_toward_positive_x() {
        let mut t = Transform::new();
        t.rotate(0.0, FRAC_PI_2, 0.0);
        t.move_relative([0.0, 0.0, 1.0]);
        assert!(vec3_approx(t.position(), Vec3::X));
        assert!(vec3_approx(t.forward(), Vec3::X));
        assert!(vec3_approx(t.right(), Vec3::NEG_Z));
    }

    #[test]
    fn positive_pitch_tilts_forward_downward() {
        let mut t = Transform::new();
        t.rotate(FRAC_PI_4, 0.0, 0.0);
        let f = t.forward();
        assert!(f.y < 0.0);
        assert!(f.z > 0.0);
    }

    #[test]
    fn basis_agrees_with_world_matrix_rotation() {
        let mut t = Transform::new();
        t.set_pitch_yaw_roll([0.4, -1.1, 0.7]);
        t.set_scale([1.0, 1.0, 1.0]);
        let world = t.world_matrix();
        assert!(vec3_approx(world.transform_vector3(Vec3::Z), t.forward()));
        assert!(vec3_approx(world.transform_vector3(Vec3::X), t.right()));
        assert!(vec3_approx(world.transform_vector3(Vec3::Y), t.up()));
    }

    #[test]
    fn world_applies_scale_then_rotation_then_translation() {
        let mut t = Transform::new();
        t.set_scale([2.0, 1.0, 1.0]);
        t.set_pitch_yaw_roll([0.0, FRAC_PI_2, 0.0]);
        t.set_position([10.0, 0.0, 0.0]);

        // Local +X is stretched to 2, yawed onto world -Z, then moved.
        let p = t.world_matrix().transform_point3(Vec3::X);
        assert!(vec3_approx(p, Vec3::new(10.0, 0.0, -2.0)));
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        let mut t = Transform::new();
        t.set_scale([4.0, 1.0, 1.0]);
        t.set_pitch_yaw_roll([0.0, 0.0, 0.3]);

        // A surface tangent and its normal in local space.
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);

        let world = t.world_matrix();
        let normal_matrix = t.world_inverse_transpose();
        let world_tangent = world.transform_vector3(tangent);
        let world_normal = normal_matrix.transform_vector3(normal);
        assert!(world_tangent.dot(world_normal).abs() < 1e-4);
    }

    #[test]
    fn cached_only_recomputes_when_stale() {
        let mut cache = Cached::fresh(1);
        let mut calls = 0;
        assert_eq!(
            cache.get_or_update(|| {
                calls += 1;
                2
            }),
            1
        );
        cache.invalidate();
        assert_eq!(
            cache.get_or_update(|| {
                calls += 1;
                3
            }),
            3
        );
        assert_eq!(calls, 1);
        assert_eq!(cache.recomputes(), 1);
    }
}
