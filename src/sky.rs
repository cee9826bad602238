//! Cube-mapped sky drawn behind everything else.
//!
//! [`CubeMap`] packs six square images into one six-layer texture viewed as a
//! cube. [`Sky`] draws a cube mesh around the camera with the translation
//! stripped from the view matrix, so the sky never gets closer. Draw it after
//! the opaque scene: its fragments sit on the far plane and only fill pixels
//! nothing else covered.

use std::path::Path;
use std::rc::Rc;

use glam::{Mat3, Mat4};

use crate::camera::Camera;
use crate::error::TextureError;
use crate::gpu::{DepthTarget, GpuContext};
use crate::mesh::{Mesh, Vertex3d};
use crate::texture::{Sampler, SamplerKind};

/// File stems [`CubeMap::from_dir`] looks for, in cube layer order
/// (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACE_NAMES: [&str; 6] = ["right", "left", "up", "down", "front", "back"];

/// A six-layer RGBA8 texture viewed as a cube.
#[derive(Debug)]
pub struct CubeMap {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl CubeMap {
    /// Loads six face images in cube layer order: right, left, up, down,
    /// front, back.
    pub fn from_files<P: AsRef<Path>>(
        gpu: &GpuContext,
        paths: &[P; 6],
    ) -> Result<Self, TextureError> {
        let mut faces = Vec::with_capacity(6);
        for path in paths {
            faces.push(image::open(path.as_ref())?.to_rgba8());
        }
        let (size, data) = pack_faces(&faces)?;
        Ok(Self::upload(gpu, &data, size, "Sky Cube Map"))
    }

    /// Loads `right.png`, `left.png`, ... from a directory.
    pub fn from_dir(gpu: &GpuContext, dir: impl AsRef<Path>) -> Result<Self, TextureError> {
        let dir = dir.as_ref();
        let paths = CUBE_FACE_NAMES.map(|name| dir.join(format!("{name}.png")));
        Self::from_files(gpu, &paths)
    }

    fn upload(gpu: &GpuContext, data: &[u8], size: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        log::debug!("created cube map '{}' (6 x {}x{})", label, size, size);

        Self {
            texture,
            view,
            size,
        }
    }

    /// Edge length of each face in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Checks that every face is square and matches the first, then
/// concatenates them layer by layer.
fn pack_faces(faces: &[image::RgbaImage]) -> Result<(u32, Vec<u8>), TextureError> {
    let expected = faces.first().map_or(0, |face| face.width());
    let mut data = Vec::with_capacity(faces.iter().map(|face| face.as_raw().len()).sum());

    for (index, face) in faces.iter().enumerate() {
        let (width, height) = face.dimensions();
        if width != expected || height != expected {
            return Err(TextureError::CubeFace {
                face: index,
                width,
                height,
                expected,
            });
        }
        data.extend_from_slice(face.as_raw());
    }
    Ok((expected, data))
}

/// The sky's vertex uniforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyParams {
    pub view: Mat4,
    pub projection: Mat4,
}

impl SkyParams {
    /// Keeps the camera's rotation and projection and drops its position.
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view: Mat4::from_mat3(Mat3::from_mat4(camera.view())),
            projection: camera.projection(),
        }
    }

    /// Column-major matrices in WGSL struct order.
    fn to_uniform(self) -> [[f32; 16]; 2] {
        [self.view.to_cols_array(), self.projection.to_cols_array()]
    }
}

/// A cube map drawn on a cube mesh that follows the camera.
#[derive(Debug)]
pub struct Sky {
    pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    map_bind_group: wgpu::BindGroup,
    mesh: Rc<Mesh>,
    cube_map: CubeMap,
}

impl Sky {
    /// Builds the sky pipeline around `cube_map`. `mesh` is normally
    /// [`Mesh::cube`].
    pub fn new(gpu: &GpuContext, mesh: Rc<Mesh>, cube_map: CubeMap) -> Self {
        use wgpu::util::DeviceExt;

        let device = &gpu.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sky.wgsl").into()),
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Params Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let map_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Map Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Params"),
            contents: bytemuck::bytes_of(
                &SkyParams {
                    view: Mat4::IDENTITY,
                    projection: Mat4::IDENTITY,
                }
                .to_uniform(),
            ),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Params Bind Group"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let sampler = Sampler::new(gpu, SamplerKind::LinearClamp, "Sky Sampler");
        let map_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Map Bind Group"),
            layout: &map_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&cube_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[&params_layout, &map_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sky Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: SKY_PRIMITIVE,
            depth_stencil: Some(sky_depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!("built sky pipeline ({}px faces)", cube_map.size);

        Self {
            pipeline,
            params_buffer,
            params_bind_group,
            map_bind_group,
            mesh,
            cube_map,
        }
    }

    pub fn cube_map(&self) -> &CubeMap {
        &self.cube_map
    }

    /// Uploads the camera's rotation and draws the sky box.
    pub fn draw(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass, camera: &Camera) {
        let params = SkyParams::from_camera(camera).to_uniform();
        gpu.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.params_bind_group, &[]);
        pass.set_bind_group(1, &self.map_bind_group, &[]);
        self.mesh.draw(pass);
    }
}

// Generated meshes wind clockwise seen from outside. Culling front faces
// leaves the inside of the cube.
const SKY_PRIMITIVE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Cw,
    cull_mode: Some(wgpu::Face::Front),
    unclipped_depth: false,
    polygon_mode: wgpu::PolygonMode::Fill,
    conservative: false,
};

// Far-plane fragments must pass against a depth buffer cleared to 1.0.
fn sky_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DepthTarget::FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
