//! WGSL shader programs with name-keyed parameters.
//!
//! A [`ShaderProgram`] pairs a vertex and fragment entry point (`vs_main` /
//! `fs_main`) with three bind groups:
//!
//! - **Group 0**: vertex parameters, one uniform struct
//! - **Group 1**: pixel parameters, one uniform struct
//! - **Group 2**: named texture and sampler slots
//!
//! Parameters are staged by name in CPU-side [`ParameterTable`]s and reach
//! the GPU only on [`ShaderProgram::flush`]. Each flush copies both tables
//! into the next free slot of a per-frame [`UniformArena`] and returns the
//! dynamic offsets to bind, so every draw in a frame keeps its own values.
//!
//! ```ignore
//! let mut shader = ShaderProgram::new(&gpu, ShaderDescriptor::terrain());
//! shader.begin_frame();
//! shader.set("world", transform.world_matrix());
//! shader.set("roughness", 0.8);
//! let offsets = shader.flush(&gpu.queue)?;
//! shader.bind(&gpu.device, &mut pass, offsets);
//! mesh.draw(&mut pass);
//! ```

use std::num::NonZeroU64;
use std::rc::Rc;

use crate::error::ShaderError;
use crate::gpu::{DepthTarget, GpuContext};
use crate::light::Light;
use crate::mesh::Vertex3d;
use crate::params::{ParameterTable, ResourceSlots, ShaderValue, UniformKind, UniformLayout};
use crate::texture::{Sampler, Texture, TextureFallback};

/// Dynamic uniform offsets must be multiples of this.
pub const UNIFORM_SLOT_ALIGNMENT: u32 = 256;

/// Draws a shader can flush between two [`ShaderProgram::begin_frame`] calls
/// unless the descriptor asks for more.
pub const DEFAULT_DRAWS_PER_FRAME: u32 = 256;

/// Vertex parameters shared by every shader in the crate.
pub fn standard_vertex_layout() -> UniformLayout {
    UniformLayout::new()
        .field("world", UniformKind::Mat4)
        .field("world_inverse_transpose", UniformKind::Mat4)
        .field("view", UniformKind::Mat4)
        .field("projection", UniformKind::Mat4)
}

/// Pixel parameters of `terrain.wgsl`.
pub fn terrain_pixel_layout() -> UniformLayout {
    let light = UniformKind::Struct {
        size: Light::SIZE,
    };
    UniformLayout::new()
        .field("color_tint", UniformKind::Vec4)
        .field("camera_position", UniformKind::Vec3)
        .field("roughness", UniformKind::F32)
        .field("ambient", UniformKind::Vec3)
        .field("time", UniformKind::F32)
        .field("directional_light_1", light)
        .field("directional_light_2", light)
        .field("directional_light_3", light)
        .field("point_light_1", light)
        .field("point_light_2", light)
}

/// A texture binding in group 2 and what it samples as while unassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSlot<'a> {
    pub name: &'a str,
    pub binding: u32,
    pub fallback: TextureFallback,
}

impl<'a> TextureSlot<'a> {
    pub const fn new(name: &'a str, binding: u32, fallback: TextureFallback) -> Self {
        Self {
            name,
            binding,
            fallback,
        }
    }
}

const TERRAIN_TEXTURES: &[TextureSlot<'static>] = &[
    TextureSlot::new("albedo_map", 0, TextureFallback::White),
    TextureSlot::new("terrain_map", 1, TextureFallback::White),
    TextureSlot::new("normal_map", 3, TextureFallback::FlatNormal),
    TextureSlot::new("roughness_map", 4, TextureFallback::White),
];

/// Everything needed to build a [`ShaderProgram`].
#[derive(Clone, Debug)]
pub struct ShaderDescriptor<'a> {
    pub label: &'a str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub source: &'a str,
    pub vertex_params: UniformLayout,
    pub pixel_params: UniformLayout,
    /// Texture slots in group 2.
    pub textures: &'a [TextureSlot<'a>],
    /// `(name, binding)` of each sampler in group 2.
    pub samplers: &'a [(&'a str, u32)],
    pub max_draws_per_frame: u32,
}

impl ShaderDescriptor<'static> {
    /// The lit, normal-mapped, noise-blended terrain shader.
    pub fn terrain() -> Self {
        Self {
            label: "Terrain Shader",
            source: include_str!("shaders/terrain.wgsl"),
            vertex_params: standard_vertex_layout(),
            pixel_params: terrain_pixel_layout(),
            textures: TERRAIN_TEXTURES,
            samplers: &[("basic_sampler", 2)],
            max_draws_per_frame: DEFAULT_DRAWS_PER_FRAME,
        }
    }
}

/// Dynamic offsets produced by one [`ShaderProgram::flush`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UniformOffsets {
    pub vertex: u32,
    pub pixel: u32,
}

/// Slot bookkeeping for a [`UniformArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlotCursor {
    stride: u32,
    capacity: u32,
    next: u32,
}

impl SlotCursor {
    fn new(binding_size: u32, capacity: u32) -> Self {
        Self {
            stride: binding_size.div_ceil(UNIFORM_SLOT_ALIGNMENT) * UNIFORM_SLOT_ALIGNMENT,
            capacity: capacity.max(1),
            next: 0,
        }
    }

    /// Byte offset of the next free slot.
    fn allocate(&mut self) -> Option<u32> {
        if self.next >= self.capacity {
            return None;
        }
        let offset = self.next * self.stride;
        self.next += 1;
        Some(offset)
    }

    fn reset(&mut self) {
        self.next = 0;
    }

    fn buffer_size(&self) -> u64 {
        self.stride as u64 * self.capacity as u64
    }
}

/// A uniform buffer split into fixed-size slots bound with dynamic offsets.
///
/// Slots are handed out in order and recycled by [`UniformArena::reset`] at
/// the start of every frame.
pub struct UniformArena {
    label: String,
    buffer: wgpu::Buffer,
    binding_size: u32,
    cursor: SlotCursor,
}

impl UniformArena {
    pub fn new(device: &wgpu::Device, label: &str, binding_size: u32, capacity: u32) -> Self {
        let cursor = SlotCursor::new(binding_size, capacity);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: cursor.buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            label: label.to_owned(),
            buffer,
            binding_size,
            cursor,
        }
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    /// Writes `bytes` into the next slot and returns its dynamic offset.
    pub fn push(&mut self, queue: &wgpu::Queue, bytes: &[u8]) -> Result<u32, ShaderError> {
        debug_assert!(bytes.len() <= self.binding_size as usize);
        let offset = self
            .cursor
            .allocate()
            .ok_or_else(|| ShaderError::UniformArenaExhausted {
                label: self.label.clone(),
                capacity: self.cursor.capacity,
            })?;
        queue.write_buffer(&self.buffer, offset as u64, bytes);
        Ok(offset)
    }

    /// Slots used since the last reset.
    pub fn used(&self) -> u32 {
        self.cursor.next
    }

    pub fn capacity(&self) -> u32 {
        self.cursor.capacity
    }

    fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(self.binding_size as u64),
        })
    }
}

/// A compiled vertex/fragment pipeline plus its parameter tables and slots.
pub struct ShaderProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    vertex_params: ParameterTable,
    pixel_params: ParameterTable,
    vertex_arena: UniformArena,
    pixel_arena: UniformArena,
    vertex_bind_group: wgpu::BindGroup,
    pixel_bind_group: wgpu::BindGroup,
    resource_layout: wgpu::BindGroupLayout,
    textures: ResourceSlots<Rc<Texture>>,
    samplers: ResourceSlots<Rc<Sampler>>,
    /// One per texture slot, in slot order.
    fallback_textures: Vec<Rc<Texture>>,
    default_sampler: Rc<Sampler>,
    /// Group 2 as last built, keyed by the slot revisions it was built from.
    resource_bind_group: Option<((u64, u64), wgpu::BindGroup)>,
}

impl ShaderProgram {
    pub fn new(gpu: &GpuContext, desc: ShaderDescriptor<'_>) -> Self {
        let device = &gpu.device;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let vertex_size = desc.vertex_params.size();
        let pixel_size = desc.pixel_params.size();

        let vertex_arena = UniformArena::new(
            device,
            &format!("{} Vertex Params", desc.label),
            vertex_size,
            desc.max_draws_per_frame,
        );
        let pixel_arena = UniformArena::new(
            device,
            &format!("{} Pixel Params", desc.label),
            pixel_size,
            desc.max_draws_per_frame,
        );

        let vertex_layout = uniform_bind_group_layout(
            device,
            "Vertex Params Layout",
            wgpu::ShaderStages::VERTEX,
            vertex_size,
        );
        let pixel_layout = uniform_bind_group_layout(
            device,
            "Pixel Params Layout",
            wgpu::ShaderStages::FRAGMENT,
            pixel_size,
        );

        let vertex_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Vertex Params Bind Group"),
            layout: &vertex_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: vertex_arena.binding(),
            }],
        });
        let pixel_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pixel Params Bind Group"),
            layout: &pixel_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: pixel_arena.binding(),
            }],
        });

        let resource_entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .textures
            .iter()
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .chain(desc.samplers.iter().map(|&(_, binding)| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            }))
            .collect();

        let resource_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shader Resources Layout"),
            entries: &resource_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&vertex_layout, &pixel_layout, &resource_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
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
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTarget::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!(
            "built shader '{}' (vertex params {} B, pixel params {} B, {} draws/frame)",
            desc.label,
            vertex_size,
            pixel_size,
            desc.max_draws_per_frame
        );

        Self {
            label: desc.label.to_owned(),
            pipeline,
            vertex_params: ParameterTable::new(
                format!("{} vertex", desc.label),
                desc.vertex_params,
            ),
            pixel_params: ParameterTable::new(format!("{} pixel", desc.label), desc.pixel_params),
            vertex_arena,
            pixel_arena,
            vertex_bind_group,
            pixel_bind_group,
            resource_layout,
            textures: ResourceSlots::new(
                desc.textures.iter().map(|slot| (slot.name, slot.binding)),
            ),
            samplers: ResourceSlots::new(desc.samplers.iter().copied()),
            fallback_textures: fallback_textures(gpu, desc.textures),
            default_sampler: Rc::new(Sampler::anisotropic_wrap(gpu)),
            resource_bind_group: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Recycles the uniform slots. Call once per frame before any draw.
    pub fn begin_frame(&mut self) {
        self.vertex_arena.reset();
        self.pixel_arena.reset();
    }

    /// Stages `value` in whichever tables declare `name`.
    ///
    /// Returns `false` if neither stage declares it.
    pub fn set(&mut self, name: &str, value: impl Into<ShaderValue>) -> bool {
        let value = value.into();
        let vertex = self.vertex_params.contains(name) && self.vertex_params.set(name, value);
        let pixel = self.pixel_params.contains(name) && self.pixel_params.set(name, value);
        if !vertex && !pixel {
            log::trace!("{}: no parameter named '{}'", self.label, name);
        }
        vertex || pixel
    }

    /// Stages raw struct bytes in whichever tables declare `name`.
    pub fn set_data(&mut self, name: &str, bytes: &[u8]) -> bool {
        let vertex = self.vertex_params.contains(name) && self.vertex_params.set_data(name, bytes);
        let pixel = self.pixel_params.contains(name) && self.pixel_params.set_data(name, bytes);
        vertex || pixel
    }

    pub fn vertex_params(&self) -> &ParameterTable {
        &self.vertex_params
    }

    pub fn vertex_params_mut(&mut self) -> &mut ParameterTable {
        &mut self.vertex_params
    }

    pub fn pixel_params(&self) -> &ParameterTable {
        &self.pixel_params
    }

    pub fn pixel_params_mut(&mut self) -> &mut ParameterTable {
        &mut self.pixel_params
    }

    /// Both tables at once, vertex first.
    pub fn params_mut(&mut self) -> (&mut ParameterTable, &mut ParameterTable) {
        (&mut self.vertex_params, &mut self.pixel_params)
    }

    /// Assigns a texture to a named slot; unknown names are ignored.
    pub fn set_texture(&mut self, name: &str, texture: Rc<Texture>) -> bool {
        self.textures.set_shared(name, texture)
    }

    /// Assigns a sampler to a named slot; unknown names are ignored.
    pub fn set_sampler(&mut self, name: &str, sampler: Rc<Sampler>) -> bool {
        self.samplers.set_shared(name, sampler)
    }

    /// Refills every texture slot from `lookup`. Slots it returns `None` for
    /// go back to their fallback.
    pub fn assign_textures(&mut self, lookup: impl FnMut(&str) -> Option<Rc<Texture>>) -> bool {
        self.textures.assign_with(lookup)
    }

    /// Refills every sampler slot from `lookup`. Slots it returns `None` for
    /// go back to the default sampler.
    pub fn assign_samplers(&mut self, lookup: impl FnMut(&str) -> Option<Rc<Sampler>>) -> bool {
        self.samplers.assign_with(lookup)
    }

    pub fn texture_slots(&self) -> &ResourceSlots<Rc<Texture>> {
        &self.textures
    }

    pub fn sampler_slots(&self) -> &ResourceSlots<Rc<Sampler>> {
        &self.samplers
    }

    /// Uploads both staged tables into fresh uniform slots.
    pub fn flush(&mut self, queue: &wgpu::Queue) -> Result<UniformOffsets, ShaderError> {
        let vertex = self.vertex_arena.push(queue, self.vertex_params.bytes())?;
        let pixel = self.pixel_arena.push(queue, self.pixel_params.bytes())?;
        Ok(UniformOffsets { vertex, pixel })
    }

    /// Sets the pipeline and all three bind groups on `pass`.
    ///
    /// Group 2 is rebuilt only when a texture or sampler slot changed since
    /// the last bind. Unassigned slots get their fallbacks.
    pub fn bind(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass,
        offsets: UniformOffsets,
    ) {
        let revision = (self.textures.revision(), self.samplers.revision());
        if self
            .resource_bind_group
            .as_ref()
            .is_none_or(|(built, _)| *built != revision)
        {
            log::trace!("{}: rebuilding resource bind group", self.label);
            let group = self.create_resource_bind_group(device);
            self.resource_bind_group = Some((revision, group));
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.vertex_bind_group, &[offsets.vertex]);
        pass.set_bind_group(1, &self.pixel_bind_group, &[offsets.pixel]);
        pass.set_bind_group(2, self.resource_bind_group.as_ref().map(|(_, group)| group), &[]);
    }

    fn create_resource_bind_group(&self, device: &wgpu::Device) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = self
            .textures
            .bindings()
            .zip(&self.fallback_textures)
            .map(|((binding, texture), fallback)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&texture.unwrap_or(fallback).view),
            })
            .chain(self.samplers.bindings().map(|(binding, sampler)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(
                    &sampler.unwrap_or(&self.default_sampler).sampler,
                ),
            }))
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shader Resources Bind Group"),
            layout: &self.resource_layout,
            entries: &entries,
        })
    }
}

/// One fallback texture per slot. Slots sharing a fallback kind share the
/// texture.
fn fallback_textures(gpu: &GpuContext, slots: &[TextureSlot<'_>]) -> Vec<Rc<Texture>> {
    let mut created: Vec<(TextureFallback, Rc<Texture>)> = Vec::new();
    slots
        .iter()
        .map(|slot| {
            if let Some((_, texture)) = created.iter().find(|(kind, _)| *kind == slot.fallback) {
                return Rc::clone(texture);
            }
            let texture = Rc::new(Texture::fallback(gpu, slot.fallback));
            created.push((slot.fallback, Rc::clone(&texture)));
            texture
        })
        .collect()
}

fn uniform_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
    size: u32,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(size as u64),
            },
            count: None,
        }],
    })
}
