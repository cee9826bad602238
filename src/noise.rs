//! Deterministic 2D gradient (Perlin-style) noise.
//!
//! [`NoiseGenerator::perlin`] returns a continuous pseudo-random value in
//! roughly `[-1, 1]` for any point in the plane. Gradients come from an
//! integer bit-mixing hash rather than a permutation table, so the field is
//! defined for every `i32` lattice coordinate and needs no seed state.
//!
//! [`NoiseField`] samples a generator on a regular grid, which is how the
//! procedural terrain texture is built.
//!
//! # Gradient offset modes
//!
//! The noise this demo originally shipped with computed the corner-to-point
//! offset's y component from `x` instead of `y`. That makes the field
//! drift with `x - y` and leaves the `[-1, 1]` band far from the diagonal.
//! Both behaviours are available and the choice is explicit:
//!
//! - [`GradientOffset::Corrected`] (the default) is true 2D gradient noise.
//! - [`GradientOffset::LegacyXForY`] reproduces the old textures bit-for-bit.
//!
//! ```
//! use terrasphere::{NoiseGenerator, perlin};
//!
//! let value = perlin(3.7, 1.2);
//! assert_eq!(value, NoiseGenerator::new().perlin(3.7, 1.2));
//! assert!(value.abs() <= 1.0);
//! ```

use std::f32::consts::PI;

use glam::Vec2;

/// How the y component of a corner-to-point offset is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientOffset {
    /// `dy = y - iy`.
    #[default]
    Corrected,
    /// `dy = x - iy`, matching textures generated by the original demo.
    LegacyXForY,
}

/// A stateless gradient-noise function with a fixed offset mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoiseGenerator {
    offset: GradientOffset,
}

impl NoiseGenerator {
    /// Corrected 2D noise.
    pub const fn new() -> Self {
        Self {
            offset: GradientOffset::Corrected,
        }
    }

    /// Noise that reproduces the original x-for-y offset.
    pub const fn legacy() -> Self {
        Self {
            offset: GradientOffset::LegacyXForY,
        }
    }

    pub const fn with_offset(offset: GradientOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> GradientOffset {
        self.offset
    }

    /// Samples the noise field at `(x, y)`.
    ///
    /// The result is 0 at every lattice point. Corner contributions are
    /// blended with linear (not smoothstep) weights.
    ///
    /// Offsets are taken from the fractional part of each coordinate and
    /// lattice indices wrap, so inputs far outside the `i32` range stay in
    /// the same band as inputs near the origin.
    pub fn perlin(&self, x: f32, y: f32) -> f32 {
        let floor_x = x.floor();
        let floor_y = y.floor();
        let x0 = lattice_index(floor_x);
        let y0 = lattice_index(floor_y);
        let x1 = x0.wrapping_add(1);
        let y1 = y0.wrapping_add(1);

        let fx = x - floor_x;
        let fy = match self.offset {
            GradientOffset::Corrected => y - floor_y,
            GradientOffset::LegacyXForY => x - floor_y,
        };

        let n0 = dot_grid_gradient(x0, y0, fx, fy);
        let n1 = dot_grid_gradient(x1, y0, fx - 1.0, fy);
        let ix0 = interpolate(n0, n1, fx);

        let n0 = dot_grid_gradient(x0, y1, fx, fy - 1.0);
        let n1 = dot_grid_gradient(x1, y1, fx - 1.0, fy - 1.0);
        let ix1 = interpolate(n0, n1, fx);

        interpolate(ix0, ix1, y - floor_y)
    }

    /// Samples a `width × height` grid starting at the origin, `step` apart.
    pub fn field(&self, width: u32, height: u32, step: f32) -> NoiseField {
        NoiseField::sample(self, width, height, step)
    }
}

/// Wraps a floored coordinate onto the `i32` lattice.
fn lattice_index(floored: f32) -> i32 {
    floored as i64 as i32
}

/// Gradient at lattice point `(ix, iy)` dotted with the offset `(dx, dy)`
/// from that corner to the sample point.
fn dot_grid_gradient(ix: i32, iy: i32, dx: f32, dy: f32) -> f32 {
    let gradient = random_gradient(ix, iy);
    dx * gradient.x + dy * gradient.y
}

/// Corrected Perlin noise at `(x, y)`. See [`NoiseGenerator::perlin`].
pub fn perlin(x: f32, y: f32) -> f32 {
    NoiseGenerator::new().perlin(x, y)
}

fn interpolate(a0: f32, a1: f32, w: f32) -> f32 {
    (a1 - a0) * w + a0
}

/// Unit gradient for a lattice point.
///
/// Multiply/rotate mixing so neighbouring lattice points get uncorrelated
/// directions.
pub(crate) fn random_gradient(ix: i32, iy: i32) -> Vec2 {
    const HALF_WIDTH: u32 = u32::BITS / 2;

    let mut a = ix as u32;
    let mut b = iy as u32;
    a = a.wrapping_mul(3_284_157_443);
    b ^= a.rotate_left(HALF_WIDTH);
    b = b.wrapping_mul(1_911_520_717);
    a ^= b.rotate_left(HALF_WIDTH);
    a = a.wrapping_mul(2_048_419_325);

    // [0, 2^32) onto [0, 2π)
    let angle = a as f32 * (PI / (1u32 << 31) as f32);
    Vec2::new(angle.cos(), angle.sin())
}

/// A grid of noise samples, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl NoiseField {
    /// Samples `generator` at `(col * step, row * step)` for every texel.
    pub fn sample(generator: &NoiseGenerator, width: u32, height: u32, step: f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            let y = row as f32 * step;
            for col in 0..width {
                values.push(generator.perlin(col as f32 * step, y));
            }
        }

        log::debug!(
            "sampled {}x{} noise field ({:?}, step {})",
            width,
            height,
            generator.offset(),
            step
        );

        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw samples, row-major.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    /// Smallest and largest sample, or `None` for an empty field.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Encodes the field as opaque grayscale RGBA8, remapping `[-1, 1]` to
    /// `[0, 1]` and clamping anything outside.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.values.len() * 4);
        for &v in &self.values {
            let level = ((v * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
            data.extend_from_slice(&[level, level, level, 255]);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perlin_is_deterministic() {
        for i in 0..100 {
            let x = i as f32 * 0.37 - 12.0;
            let y = i as f32 * -0.61 + 4.0;
            assert_eq!(perlin(x, y).to_bits(), perlin(x, y).to_bits());
        }
    }

    #[test]
    fn perlin_stays_in_band_on_dense_grid() {
        let generator = NoiseGenerator::new();
        for row in 0..200 {
            for col in 0..200 {
                let v = generator.perlin(col as f32 * 0.05 - 5.0, row as f32 * 0.05 - 5.0);
                assert!(v.is_finite());
                assert!((-1.2..=1.2).contains(&v), "perlin out of band: {v}");
            }
        }
    }

    #[test]
    fn perlin_is_zero_on_lattice_points() {
        for (x, y) in [(0.0, 0.0), (3.0, -7.0), (-100.0, 42.0)] {
            assert_eq!(perlin(x, y), 0.0);
        }
    }

    #[test]
    fn perlin_stays_in_band_beyond_i32_range() {
        let generator = NoiseGenerator::new();
        for (x, y) in [
            (3.0e9, -3.0e9),
            (-3.0e9, 3.0e9),
            (1.0e12, 2.5e11),
            (-7.5e15, 4.0e18),
            (4_194_304.5, -4_194_303.25),
        ] {
            let v = generator.perlin(x, y);
            assert!(v.is_finite(), "perlin({x}, {y}) = {v}");
            assert!((-1.2..=1.2).contains(&v), "perlin({x}, {y}) = {v}");
        }
    }

    #[test]
    fn perlin_is_not_constant() {
        let field = NoiseGenerator::new().field(64, 64, 0.05);
        let (lo, hi) = field.range().unwrap();
        assert!(hi - lo > 0.2);
    }

    #[test]
    fn gradients_are_unit_and_vary() {
        let a = random_gradient(0, 0);
        let b = random_gradient(1, 0);
        let c = random_gradient(0, 1);
        for g in [a, b, c, random_gradient(-5, 9), random_gradient(i32::MAX, i32::MIN)] {
            assert!((g.length() - 1.0).abs() < 1e-5);
        }
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn legacy_matches_corrected_on_the_diagonal() {
        let corrected = NoiseGenerator::new();
        let legacy = NoiseGenerator::legacy();
        for i in 0..50 {
            let t = i as f32 * 0.13;
            assert_eq!(corrected.perlin(t, t), legacy.perlin(t, t));
        }
    }

    #[test]
    fn legacy_differs_away_from_the_diagonal() {
        let corrected = NoiseGenerator::new();
        let legacy = NoiseGenerator::legacy();
        let differs = (0..50).any(|i| {
            let x = 4.0 + i as f32 * 0.21;
            let y = 0.35;
            corrected.perlin(x, y) != legacy.perlin(x, y)
        });
        assert!(differs);
        assert_eq!(GradientOffset::default(), GradientOffset::Corrected);
    }

    #[test]
    fn field_samples_on_grid() {
        let generator = NoiseGenerator::new();
        let field = generator.field(8, 4, 0.05);
        assert_eq!(field.values().len(), 32);
        assert_eq!(field.get(3, 2), Some(generator.perlin(3.0 * 0.05, 2.0 * 0.05)));
        assert_eq!(field.get(8, 0), None);
        assert_eq!(field.get(0, 4), None);
    }

    #[test]
    fn rgba8_remaps_to_unit_range() {
        let field = NoiseField {
            width: 3,
            height: 1,
            values: vec![-1.0, 0.0, 2.0],
        };
        assert_eq!(
            field.to_rgba8(),
            vec![0, 0, 0, 255, 128, 128, 128, 255, 255, 255, 255, 255]
        );
    }
}
