//! Surface appearance shared between renderables.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec4;

use crate::shader::ShaderProgram;
use crate::texture::{Sampler, Texture};

/// A color tint, a roughness, a shader and the textures it samples.
///
/// Texture and sampler names are the slot names the shader declares. Names
/// the shader doesn't know are carried but ignored by [`Material::prepare`],
/// so one material can serve several shader variants.
pub struct Material {
    color_tint: Vec4,
    roughness: f32,
    shader: Rc<RefCell<ShaderProgram>>,
    textures: BTreeMap<String, Rc<Texture>>,
    samplers: BTreeMap<String, Rc<Sampler>>,
}

impl Material {
    /// `roughness` runs from 0 (shiny) to 1 (matte).
    pub fn new(color_tint: Vec4, roughness: f32, shader: Rc<RefCell<ShaderProgram>>) -> Self {
        Self {
            color_tint,
            roughness: roughness.clamp(0.0, 1.0),
            shader,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    pub fn color_tint(&self) -> Vec4 {
        self.color_tint
    }

    pub fn set_color_tint(&mut self, tint: Vec4) {
        self.color_tint = tint;
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }

    pub fn shader(&self) -> &Rc<RefCell<ShaderProgram>> {
        &self.shader
    }

    pub fn set_shader(&mut self, shader: Rc<RefCell<ShaderProgram>>) {
        self.shader = shader;
    }

    /// Adds or replaces the texture for slot `name`.
    pub fn add_texture(&mut self, name: impl Into<String>, texture: Rc<Texture>) {
        self.textures.insert(name.into(), texture);
    }

    /// Adds or replaces the sampler for slot `name`.
    pub fn add_sampler(&mut self, name: impl Into<String>, sampler: Rc<Sampler>) {
        self.samplers.insert(name.into(), sampler);
    }

    pub fn texture(&self, name: &str) -> Option<&Rc<Texture>> {
        self.textures.get(name)
    }

    pub fn sampler(&self, name: &str) -> Option<&Rc<Sampler>> {
        self.samplers.get(name)
    }

    /// Points every texture and sampler slot of `shader` at this material's
    /// resources by name.
    ///
    /// Slots this material doesn't name are reset to the shader's fallbacks,
    /// so nothing leaks over from the previous material that used the shader.
    pub fn prepare(&self, shader: &mut ShaderProgram) {
        shader.assign_textures(|name| self.textures.get(name).cloned());
        shader.assign_samplers(|name| self.samplers.get(name).cloned());
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("color_tint", &self.color_tint)
            .field("roughness", &self.roughness)
            .field("shader", &self.shader.borrow().label())
            .field("textures", &self.textures.keys().collect::<Vec<_>>())
            .field("samplers", &self.samplers.keys().collect::<Vec<_>>())
            .finish()
    }
}
