//! A drawable object: its own transform plus shared mesh and material.

use std::rc::Rc;

use glam::Vec4;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::params::ParameterTable;
use crate::transform::Transform;

/// Owns a [`Transform`]; shares its [`Mesh`] and [`Material`].
#[derive(Debug)]
pub struct Renderable {
    transform: Transform,
    mesh: Rc<Mesh>,
    material: Rc<Material>,
}

impl Renderable {
    pub fn new(mesh: Rc<Mesh>, material: Rc<Material>) -> Self {
        Self {
            transform: Transform::new(),
            mesh,
            material,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    pub fn set_material(&mut self, material: Rc<Material>) {
        self.material = material;
    }

    /// Stages this object's parameters, flushes them, binds the material's
    /// resources and issues the draw.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass,
        camera: &Camera,
        total_time: f32,
    ) -> Result<(), RenderError> {
        let mut shader = self.material.shader().borrow_mut();

        let (vertex, pixel) = shader.params_mut();
        write_draw_parameters(
            vertex,
            pixel,
            &mut self.transform,
            camera,
            self.material.color_tint(),
            self.material.roughness(),
            total_time,
        );

        let offsets = shader.flush(&gpu.queue)?;
        self.material.prepare(&mut shader);
        shader.bind(&gpu.device, pass, offsets);
        self.mesh.draw(pass);
        Ok(())
    }
}

/// Stages world/view/projection in the vertex table and tint, roughness,
/// time and eye position in the pixel table.
fn write_draw_parameters(
    vertex: &mut ParameterTable,
    pixel: &mut ParameterTable,
    transform: &mut Transform,
    camera: &Camera,
    color_tint: Vec4,
    roughness: f32,
    total_time: f32,
) {
    vertex.set("world", transform.world_matrix());
    vertex.set("world_inverse_transpose", transform.world_inverse_transpose());
    vertex.set("view", camera.view());
    vertex.set("projection", camera.projection());

    pixel.set("color_tint", color_tint);
    pixel.set("roughness", roughness);
    pixel.set("time", total_time);
    pixel.set("camera_position", camera.position());
}
