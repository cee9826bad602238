//! # Terrasphere
//!
//! **A small real-time 3D renderer for procedurally textured terrain.**
//!
//! A fly camera orbits a lit sphere whose surface blends an albedo texture
//! with a Perlin noise map. The pieces are usable on their own:
//!
//! - [`NoiseGenerator`] / [`NoiseField`]: deterministic 2D gradient noise
//! - [`Transform`]: position, pitch/yaw/roll and scale with lazily cached
//!   world matrix and basis vectors
//! - [`Camera`]: WASD + mouse-look camera with left-handed view/projection
//! - [`ShaderProgram`]: named uniform parameters, texture and sampler slots,
//!   and per-draw uniform slots so many objects share one shader per frame
//! - [`Material`], [`Mesh`], [`Renderable`]: what gets drawn
//! - [`Sky`] / [`CubeMap`]: an optional cube-mapped sky box
//! - [`run`] and [`Game`]: the window and frame loop
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use terrasphere::*;
//!
//! struct Demo {
//!     camera: Camera,
//!     ball: Renderable,
//!     shader: Rc<RefCell<ShaderProgram>>,
//!     lighting: Lighting,
//! }
//!
//! impl Game for Demo {
//!     fn update(&mut self, input: &Input, dt: f32, _total: f32) -> Result<(), AppError> {
//!         self.camera.update(input, dt)?;
//!         Ok(())
//!     }
//!
//!     fn draw(
//!         &mut self,
//!         gpu: &GpuContext,
//!         pass: &mut wgpu::RenderPass,
//!         total: f32,
//!     ) -> Result<(), AppError> {
//!         let mut shader = self.shader.borrow_mut();
//!         shader.begin_frame();
//!         self.lighting.apply(&mut shader);
//!         drop(shader);
//!         self.ball.draw(gpu, pass, &self.camera, total)?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new(), |gpu| {
//!         let program = ShaderProgram::new(gpu, ShaderDescriptor::terrain());
//!         let shader = Rc::new(RefCell::new(program));
//!         let material = Material::new(Vec4::ONE, 0.8, shader.clone());
//!         let ball = Renderable::new(Rc::new(Mesh::sphere(gpu, 64, 32)), Rc::new(material));
//!         let camera = Camera::new([0.0, 0.0, -5.0], gpu.aspect(), CameraSettings::default())?;
//!         Ok(Demo { camera, ball, shader, lighting: Lighting::default() })
//!     })
//! }
//! ```

mod app;
mod camera;
mod error;
mod gpu;
mod input;
mod light;
mod material;
mod mesh;
mod noise;
mod params;
mod renderable;
mod shader;
mod sky;
mod texture;
mod transform;

pub use app::{AppConfig, Game, run};
pub use camera::{Camera, CameraSettings, PITCH_LIMIT};
pub use error::{AppError, CameraError, GpuError, RenderError, ShaderError, TextureError};
pub use gpu::{DepthTarget, GpuContext};
pub use input::Input;
pub use light::{Light, LightKind, Lighting};
pub use material::Material;
pub use mesh::{Mesh, MeshData, Vertex3d};
pub use noise::{GradientOffset, NoiseField, NoiseGenerator, perlin};
pub use params::{
    ParameterTable, ResourceSlots, ShaderValue, UniformField, UniformKind, UniformLayout,
};
pub use renderable::Renderable;
pub use shader::{
    DEFAULT_DRAWS_PER_FRAME, ShaderDescriptor, ShaderProgram, TextureSlot,
    UNIFORM_SLOT_ALIGNMENT, UniformArena, UniformOffsets, standard_vertex_layout,
    terrain_pixel_layout,
};
pub use sky::{CUBE_FACE_NAMES, CubeMap, Sky, SkyParams};
pub use texture::{Sampler, SamplerKind, Texture, TextureFallback};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

// Render passes and colors appear in the public API
pub use wgpu;
