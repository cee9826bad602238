//! Terrasphere demo: a slowly spinning sphere textured with Perlin terrain.
//!
//! Usage: `terrasphere [albedo-image [normal-map [sky-dir]]]`. Pass `-` to
//! skip a position. Without an albedo image the sphere is plain white and the
//! terrain colors come from the noise map alone. Without a normal map the
//! surface keeps its geometric normals. A sky directory holds `right.png`,
//! `left.png`, `up.png`, `down.png`, `front.png` and `back.png`.
//!
//! Fly with WASD, Space and X; hold the left mouse button to look around.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use terrasphere::{
    AppConfig, AppError, Camera, CameraSettings, CubeMap, Game, GpuContext, Input, Lighting,
    Material, Mesh, NoiseGenerator, Renderable, Sampler, ShaderDescriptor, ShaderProgram, Sky,
    Texture, Vec4, run, wgpu,
};

const TERRAIN_MAP_SIZE: u32 = 1024;
const TERRAIN_MAP_STEP: f32 = 0.05;
const SPIN_SPEED: f32 = 0.1;

struct TerrainDemo {
    camera: Camera,
    shader: Rc<RefCell<ShaderProgram>>,
    lighting: Lighting,
    renderables: Vec<Renderable>,
    sky: Option<Sky>,
}

/// Optional asset paths taken from the command line.
#[derive(Debug, Default, PartialEq)]
struct DemoAssets {
    albedo: Option<String>,
    normal_map: Option<String>,
    sky_dir: Option<String>,
}

impl DemoAssets {
    fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args
            .into_iter()
            .map(|arg| if arg == "-" { None } else { Some(arg) });
        Self {
            albedo: args.next().flatten(),
            normal_map: args.next().flatten(),
            sky_dir: args.next().flatten(),
        }
    }
}

impl TerrainDemo {
    fn new(gpu: &GpuContext, assets: &DemoAssets) -> Result<Self, AppError> {
        let albedo = match &assets.albedo {
            Some(path) => Texture::from_file(gpu, path)?,
            None => Texture::white(gpu),
        };

        let field =
            NoiseGenerator::new().field(TERRAIN_MAP_SIZE, TERRAIN_MAP_SIZE, TERRAIN_MAP_STEP);
        let terrain_map = Texture::from_noise_field(gpu, &field, "Terrain Map")?;

        let shader = Rc::new(RefCell::new(ShaderProgram::new(
            gpu,
            ShaderDescriptor::terrain(),
        )));

        let mut material = Material::new(Vec4::ONE, 0.8, Rc::clone(&shader));
        material.add_texture("albedo_map", Rc::new(albedo));
        material.add_texture("terrain_map", Rc::new(terrain_map));
        if let Some(path) = &assets.normal_map {
            material.add_texture("normal_map", Rc::new(Texture::from_file_linear(gpu, path)?));
        }
        material.add_sampler("basic_sampler", Rc::new(Sampler::anisotropic_wrap(gpu)));

        let sphere = Rc::new(Mesh::sphere(gpu, 64, 32));
        let mut planet = Renderable::new(sphere, Rc::new(material));
        planet.transform_mut().set_position([0.0, 0.0, 0.0]);

        let sky = match &assets.sky_dir {
            Some(dir) => {
                let cube_map = CubeMap::from_dir(gpu, dir)?;
                Some(Sky::new(gpu, Rc::new(Mesh::cube(gpu)), cube_map))
            }
            None => None,
        };

        let camera = Camera::new([0.0, 0.0, -5.0], gpu.aspect(), CameraSettings::default())?;

        Ok(Self {
            camera,
            shader,
            lighting: Lighting::default(),
            renderables: vec![planet],
            sky,
        })
    }
}

impl Game for TerrainDemo {
    fn resize(&mut self, gpu: &GpuContext, _width: u32, _height: u32) -> Result<(), AppError> {
        self.camera.update_projection_matrix(gpu.aspect())?;
        Ok(())
    }

    fn update(&mut self, input: &Input, dt: f32, _total_time: f32) -> Result<(), AppError> {
        self.camera.update(input, dt)?;
        for renderable in &mut self.renderables {
            renderable.transform_mut().rotate(0.0, dt * SPIN_SPEED, 0.0);
        }
        Ok(())
    }

    fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass,
        total_time: f32,
    ) -> Result<(), AppError> {
        {
            let mut shader = self.shader.borrow_mut();
            shader.begin_frame();
            self.lighting.apply(&mut shader);
        }

        for renderable in &mut self.renderables {
            renderable.draw(gpu, pass, &self.camera, total_time)?;
        }
        if let Some(sky) = &self.sky {
            sky.draw(gpu, pass, &self.camera);
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let assets = DemoAssets::from_args(std::env::args().skip(1));
    log::info!("starting with {assets:?}");
    let config = AppConfig::new().title("Terrasphere").size(1280, 720);

    run(config, move |gpu| TerrainDemo::new(gpu, &assets))
        .context("terrasphere exited with an error")
}
