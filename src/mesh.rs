//! Vertex format and GPU-resident meshes.
//!
//! Geometry is built on the CPU as [`MeshData`] and uploaded once with
//! [`Mesh::new`]. A mesh is immutable after upload and is shared between
//! renderables with `Rc`.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |
//! | tangent   | Float32x3 | 32     | 3               |

use std::f32::consts::PI;

use crate::gpu::GpuContext;

/// A vertex with position, normal, texture coordinates and tangent.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Direction of increasing `u` along the surface.
    pub tangent: [f32; 3],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
            // tangent
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], tangent: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent,
        }
    }
}

/// CPU-side geometry: vertices plus a `u32` triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// A unit cube centered at the origin, four vertices per face.
    pub fn cube() -> Self {
        // (normal, tangent) per face; the other in-plane axis is normal × tangent
        const FACES: [([f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]),
            ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, tangent) in FACES {
            let n = glam::Vec3::from(normal);
            let t = glam::Vec3::from(tangent);
            let b = n.cross(t);
            let base = vertices.len() as u32;

            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = n * 0.5 + t * (u - 0.5) + b * (v - 0.5);
                vertices.push(Vertex3d::new(p.to_array(), normal, [u, 1.0 - v], tangent));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self { vertices, indices }
    }

    /// A UV sphere of radius 0.5 centered at the origin.
    ///
    /// Produces `(segments + 1) × (rings + 1)` vertices; the seam column is
    /// duplicated so `u` runs cleanly from 0 to 1.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * PI * seg as f32 / segments as f32;
                let (sin_t, cos_t) = theta.sin_cos();
                let x = ring_radius * cos_t;
                let z = ring_radius * sin_t;

                vertices.push(Vertex3d::new(
                    [x * 0.5, y * 0.5, z * 0.5],
                    [x, y, z],
                    [seg as f32 / segments as f32, ring as f32 / rings as f32],
                    [-sin_t, 0.0, cos_t],
                ));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, next, current + 1]);
                indices.extend_from_slice(&[current + 1, next, next + 1]);
            }
        }

        Self { vertices, indices }
    }

    /// A flat `size × size` plane on the XZ axis facing +Y.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        let up = [0.0, 1.0, 0.0];
        let tangent = [1.0, 0.0, 0.0];
        let vertices = vec![
            Vertex3d::new([-half, 0.0, -half], up, [0.0, 0.0], tangent),
            Vertex3d::new([half, 0.0, -half], up, [1.0, 0.0], tangent),
            Vertex3d::new([half, 0.0, half], up, [1.0, 1.0], tangent),
            Vertex3d::new([-half, 0.0, half], up, [0.0, 1.0], tangent),
        ];

        Self {
            vertices,
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// GPU-resident geometry with vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Uploads vertex and index data to GPU buffers.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex3d], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        log::debug!(
            "uploaded mesh ({} vertices, {} triangles)",
            vertices.len(),
            indices.len() / 3
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    pub fn from_data(gpu: &GpuContext, data: &MeshData) -> Self {
        Self::new(gpu, &data.vertices, &data.indices)
    }

    pub fn cube(gpu: &GpuContext) -> Self {
        Self::from_data(gpu, &MeshData::cube())
    }

    pub fn sphere(gpu: &GpuContext, segments: u32, rings: u32) -> Self {
        Self::from_data(gpu, &MeshData::sphere(segments, rings))
    }

    pub fn plane(gpu: &GpuContext, size: f32) -> Self {
        Self::from_data(gpu, &MeshData::plane(size))
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Binds the buffers and issues one indexed draw.
    ///
    /// The pipeline and bind groups must already be set on `pass`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
