//! Sampled textures and samplers.
//!
//! Textures and samplers are separate objects so a material can pair any
//! texture with any sampler by slot name. Both are shared with `Rc` between
//! materials.

use std::path::Path;

use crate::error::TextureError;
use crate::gpu::GpuContext;
use crate::noise::NoiseField;

/// A 2D RGBA8 texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads tightly packed RGBA8 pixels.
    ///
    /// `srgb` selects between a color texture (sRGB-decoded on sample) and a
    /// data texture such as a height or noise map.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
        label: &str,
    ) -> Result<Self, TextureError> {
        check_rgba_len(data, width, height)?;

        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        Ok(Self::upload(gpu, data, width, height, format, label))
    }

    fn upload(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("created texture '{}' ({}x{}, {:?})", label, width, height, format);

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Loads a color texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: impl AsRef<Path>) -> Result<Self, TextureError> {
        Self::load_file(gpu, path.as_ref(), true)
    }

    /// Loads a data texture (normal, roughness or height map) from an image
    /// file without sRGB decoding.
    pub fn from_file_linear(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
    ) -> Result<Self, TextureError> {
        Self::load_file(gpu, path.as_ref(), false)
    }

    fn load_file(gpu: &GpuContext, path: &Path, srgb: bool) -> Result<Self, TextureError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_rgba(gpu, &img, width, height, srgb, &path.display().to_string())
    }

    /// Loads a color texture from encoded image bytes (PNG, JPEG, ...).
    pub fn from_bytes(gpu: &GpuContext, bytes: &[u8], label: &str) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_rgba(gpu, &img, width, height, true, label)
    }

    /// Uploads a sampled noise field as a linear grayscale data texture.
    pub fn from_noise_field(
        gpu: &GpuContext,
        field: &NoiseField,
        label: &str,
    ) -> Result<Self, TextureError> {
        Self::from_rgba(
            gpu,
            &field.to_rgba8(),
            field.width(),
            field.height(),
            false,
            label,
        )
    }

    /// A 1×1 texture bound to slots nothing was assigned to.
    pub fn fallback(gpu: &GpuContext, kind: TextureFallback) -> Self {
        Self::upload(gpu, &kind.rgba(), 1, 1, kind.format(), kind.label())
    }

    /// A 1×1 opaque white texture.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::fallback(gpu, TextureFallback::White)
    }
}

/// What an unassigned texture slot samples as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureFallback {
    /// Opaque white: a neutral albedo and a roughness factor of one.
    #[default]
    White,
    /// Tangent-space +Z, so normal mapping leaves the surface normal alone.
    FlatNormal,
}

impl TextureFallback {
    pub const fn rgba(self) -> [u8; 4] {
        match self {
            TextureFallback::White => [255, 255, 255, 255],
            TextureFallback::FlatNormal => [128, 128, 255, 255],
        }
    }

    pub const fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureFallback::White => wgpu::TextureFormat::Rgba8UnormSrgb,
            // normals must not be sRGB-decoded
            TextureFallback::FlatNormal => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    fn label(self) -> &'static str {
        match self {
            TextureFallback::White => "Default White Texture",
            TextureFallback::FlatNormal => "Default Flat Normal Texture",
        }
    }
}

fn check_rgba_len(data: &[u8], width: u32, height: u32) -> Result<(), TextureError> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(TextureError::SizeMismatch {
            width,
            height,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Filtering mode for a [`Sampler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerKind {
    /// Wrap addressing, linear filtering, 8× anisotropy.
    AnisotropicWrap,
    /// Wrap addressing, nearest-neighbor filtering.
    NearestWrap,
    /// Clamp-to-edge addressing, linear filtering. Hides cube map seams.
    LinearClamp,
}

impl SamplerKind {
    fn descriptor(self, label: &str) -> wgpu::SamplerDescriptor<'_> {
        match self {
            SamplerKind::AnisotropicWrap => wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                anisotropy_clamp: 8,
                ..Default::default()
            },
            SamplerKind::NearestWrap => wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            },
            SamplerKind::LinearClamp => wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            },
        }
    }
}

/// Texture sampling options.
#[derive(Debug)]
pub struct Sampler {
    pub(crate) sampler: wgpu::Sampler,
    kind: SamplerKind,
}

impl Sampler {
    pub fn new(gpu: &GpuContext, kind: SamplerKind, label: &str) -> Self {
        let sampler = gpu.device.create_sampler(&kind.descriptor(label));
        Self { sampler, kind }
    }

    /// The sampler the demo's materials use.
    pub fn anisotropic_wrap(gpu: &GpuContext) -> Self {
        Self::new(gpu, SamplerKind::AnisotropicWrap, "Anisotropic Wrap Sampler")
    }

    pub fn nearest(gpu: &GpuContext) -> Self {
        Self::new(gpu, SamplerKind::NearestWrap, "Nearest Sampler")
    }

    pub fn kind(&self) -> SamplerKind {
        self.kind
    }
}
