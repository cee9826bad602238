//! Light records and the scene lighting block.
//!
//! [`Light`] is laid out exactly like the WGSL `Light` struct in
//! `terrain.wgsl`, so it is pushed to a shader as raw bytes under its slot
//! name. [`Lighting`] is the fixed set of lights the demo scene uses.

use glam::Vec3;

use crate::params::ParameterTable;
use crate::shader::ShaderProgram;

/// What kind of emitter a [`Light`] is.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
}

/// GPU layout of a single light (48 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    /// Direction the light travels. Directional lights only.
    pub direction: [f32; 3],
    /// Distance at which a point light's contribution reaches zero.
    pub range: f32,
    /// World position. Point lights only.
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    kind: u32,
}

impl Light {
    pub const SIZE: u32 = std::mem::size_of::<Light>() as u32;

    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.to_array(),
            range: 0.0,
            position: [0.0; 3],
            intensity,
            color: color.to_array(),
            kind: LightKind::Directional as u32,
        }
    }

    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: [0.0; 3],
            range,
            position: position.to_array(),
            intensity,
            color: color.to_array(),
            kind: LightKind::Point as u32,
        }
    }

    pub fn kind(&self) -> LightKind {
        if self.kind == LightKind::Point as u32 {
            LightKind::Point
        } else {
            LightKind::Directional
        }
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color.to_array();
    }
}

/// Ambient color plus three directional and two point lights.
#[derive(Clone, Debug, PartialEq)]
pub struct Lighting {
    pub ambient: Vec3,
    pub directional: [Light; 3],
    pub point: [Light; 2],
}

impl Default for Lighting {
    /// One warm key light along +X; the rest start black.
    fn default() -> Self {
        Self {
            ambient: Vec3::new(0.1, 0.1, 0.25),
            directional: [
                Light::directional(Vec3::X, Vec3::new(1.0, 0.8, 0.85), 1.0),
                Light::directional(Vec3::Y, Vec3::ZERO, 1.0),
                Light::directional(Vec3::NEG_Y, Vec3::ZERO, 1.0),
            ],
            point: [
                Light::point(Vec3::new(0.1, -1.0, 0.2), 18.0, Vec3::ZERO, 1.0),
                Light::point(Vec3::new(0.9, -1.6, 4.0), 45.0, Vec3::ZERO, 1.0),
            ],
        }
    }
}

impl Lighting {
    const DIRECTIONAL_SLOTS: [&'static str; 3] = [
        "directional_light_1",
        "directional_light_2",
        "directional_light_3",
    ];
    const POINT_SLOTS: [&'static str; 2] = ["point_light_1", "point_light_2"];

    /// `(slot name, light)` for every light, in slot order.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &Light)> {
        Self::DIRECTIONAL_SLOTS
            .into_iter()
            .zip(self.directional.iter())
            .chain(Self::POINT_SLOTS.into_iter().zip(self.point.iter()))
    }

    /// Stages the lighting block in a parameter table. Returns how many
    /// values the table accepted.
    pub fn write_to(&self, table: &mut ParameterTable) -> usize {
        let mut accepted = usize::from(table.set("ambient", self.ambient));
        for (name, light) in self.slots() {
            accepted += usize::from(table.set_data(name, bytemuck::bytes_of(light)));
        }
        accepted
    }

    /// Stages the lighting block in a shader's pixel parameters.
    pub fn apply(&self, shader: &mut ShaderProgram) -> usize {
        self.write_to(shader.pixel_params_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{UniformKind, UniformLayout};
    use crate::shader::terrain_pixel_layout;

    #[test]
    fn light_matches_wgsl_layout() {
        assert_eq!(Light::SIZE, 48);
        assert_eq!(std::mem::offset_of!(Light, range), 12);
        assert_eq!(std::mem::offset_of!(Light, position), 16);
        assert_eq!(std::mem::offset_of!(Light, intensity), 28);
        assert_eq!(std::mem::offset_of!(Light, color), 32);
        assert_eq!(std::mem::offset_of!(Light, kind), 44);
    }

    #[test]
    fn constructors_tag_kind() {
        let d = Light::directional(Vec3::X, Vec3::ONE, 1.0);
        let p = Light::point(Vec3::ZERO, 10.0, Vec3::ONE, 2.0);
        assert_eq!(d.kind(), LightKind::Directional);
        assert_eq!(p.kind(), LightKind::Point);
        assert_eq!(p.range, 10.0);
    }

    #[test]
    fn default_lighting_has_one_warm_key_light() {
        let lighting = Lighting::default();
        assert_eq!(lighting.directional[0].color, [1.0, 0.8, 0.85]);
        assert_eq!(lighting.directional[0].direction, [1.0, 0.0, 0.0]);
        assert!(lighting.directional[1..].iter().all(|l| l.color == [0.0; 3]));
        assert!(lighting.point.iter().all(|l| l.color == [0.0; 3]));
        assert_eq!(lighting.point[1].range, 45.0);
    }

    #[test]
    fn lighting_fills_every_terrain_slot() {
        let mut table = ParameterTable::new("pixel", terrain_pixel_layout());
        let lighting = Lighting::default();
        assert_eq!(lighting.write_to(&mut table), 6);

        assert_eq!(
            table.field_bytes("point_light_2"),
            Some(bytemuck::bytes_of(&lighting.point[1]))
        );
        assert_eq!(
            table.field_bytes("ambient"),
            Some(bytemuck::cast_slice::<f32, u8>(&[0.1, 0.1, 0.25]))
        );
    }

    #[test]
    fn lighting_skips_slots_the_shader_lacks() {
        let layout = UniformLayout::new()
            .field("ambient", UniformKind::Vec3)
            .field("directional_light_1", UniformKind::Struct { size: Light::SIZE });
        let mut table = ParameterTable::new("simple", layout);
        assert_eq!(Lighting::default().write_to(&mut table), 2);
    }
}
