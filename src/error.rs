//! Error types.
//!
//! Each concern gets its own small enum; [`AppError`] wraps them all so the
//! application shell can propagate with `?`.
//!
//! Matrix math itself has no error surface. The only checked preconditions
//! are the camera's projection and look-direction inputs, which would
//! otherwise silently produce NaN matrices.

use thiserror::Error;

/// Invalid camera parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CameraError {
    /// Field of view must lie strictly between 0 and π radians.
    #[error("field of view must be in (0, π) radians, got {0}")]
    InvalidFieldOfView(f32),

    /// Aspect ratio must be finite and positive.
    #[error("aspect ratio must be positive, got {0}")]
    InvalidAspectRatio(f32),

    /// Near/far planes must satisfy `0 < near < far`.
    #[error("clip planes must satisfy 0 < near < far, got near={near} far={far}")]
    InvalidClipPlanes { near: f32, far: f32 },

    /// The forward vector is zero-length or parallel to world up.
    #[error("look direction is degenerate (zero-length or parallel to world up)")]
    DegenerateLookDirection,
}

/// Failures while bringing up the GPU.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find a suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,
}

/// Shader parameter upload failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// Every uniform slot for this frame has already been flushed.
    #[error("shader '{label}' ran out of uniform slots ({capacity} per frame)")]
    UniformArenaExhausted { label: String, capacity: u32 },
}

/// Texture creation failures.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Cube faces must be square and all the same size.
    #[error("cube face {face} is {width}x{height}, expected {expected}x{expected}")]
    CubeFace {
        face: usize,
        width: u32,
        height: u32,
        expected: u32,
    },
}

/// Failures while drawing a renderable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Umbrella error for the application shell.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
