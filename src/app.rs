//! Window, event loop and frame driver.
//!
//! [`run`] opens a window, brings up the GPU, hands the [`GpuContext`] to a
//! setup closure that builds the [`Game`], and then drives one
//! [`Game::update`] followed by one [`Game::draw`] per frame until the window
//! closes. Errors from setup, update or draw stop the loop and are returned
//! from [`run`].
//!
//! ```no_run
//! use terrasphere::{AppConfig, AppError, Game, GpuContext, Input, run};
//!
//! struct Blank;
//!
//! impl Game for Blank {
//!     fn update(&mut self, _input: &Input, _dt: f32, _total: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn draw(
//!         &mut self,
//!         _gpu: &GpuContext,
//!         _pass: &mut wgpu::RenderPass,
//!         _total: f32,
//!     ) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new().title("Blank"), |_gpu| Ok(Blank))
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::AppError;
use crate::gpu::GpuContext;
use crate::input::Input;

/// Per-frame hooks implemented by the application.
pub trait Game: 'static {
    /// Called after the surface has been resized to a non-zero size.
    #[allow(unused_variables)]
    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> Result<(), AppError> {
        Ok(())
    }

    /// Advances the simulation. Runs to completion before [`Game::draw`].
    fn update(&mut self, input: &Input, dt: f32, total_time: f32) -> Result<(), AppError>;

    /// Records draw commands into the frame's render pass.
    ///
    /// The pass targets the swap chain image and the depth buffer, both
    /// already cleared.
    fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass,
        total_time: f32,
    ) -> Result<(), AppError>;
}

/// Window and frame loop settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// RGBA the frame is cleared to before drawing.
    pub clear_color: [f64; 4],
    pub exit_on_escape: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Terrasphere".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            // cornflower blue
            clear_color: [0.4, 0.6, 0.75, 1.0],
            exit_on_escape: true,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn clear_color(mut self, rgba: [f64; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn exit_on_escape(mut self, exit: bool) -> Self {
        self.exit_on_escape = exit;
        self
    }

    fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

/// Frame timing: delta since the previous tick and time since start.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    /// Returns `(dt, total_time)` in seconds.
    pub(crate) fn tick(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        (dt, now.duration_since(self.start).as_secs_f32())
    }
}

/// Opens the window and runs `setup`'s game until it closes.
pub fn run<G, S>(config: AppConfig, setup: S) -> Result<(), AppError>
where
    G: Game,
    S: FnOnce(&GpuContext) -> Result<G, AppError> + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TerrasphereApp {
        state: AppState::Pending {
            config,
            setup: Some(Box::new(setup)),
        },
        error: None,
    };

    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

type SetupFn<G> = Box<dyn FnOnce(&GpuContext) -> Result<G, AppError>>;

enum AppState<G> {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn<G>>,
    },
    Running {
        config: AppConfig,
        window: Arc<Window>,
        gpu: GpuContext,
        game: G,
        input: Input,
        clock: FrameClock,
    },
}

struct TerrasphereApp<G> {
    state: AppState<G>,
    error: Option<AppError>,
}

impl<G: Game> TerrasphereApp<G> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        setup: SetupFn<G>,
    ) -> Result<(Arc<Window>, GpuContext, G), AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let game = setup(&gpu)?;
        Ok((window, gpu, game))
    }
}

impl<G: Game> ApplicationHandler for TerrasphereApp<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config, setup } = &mut self.state else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };
        let config = config.clone();

        match Self::start(event_loop, &config, setup) {
            Ok((window, gpu, game)) => {
                window.request_redraw();
                self.state = AppState::Running {
                    config,
                    window,
                    gpu,
                    game,
                    input: Input::new(),
                    clock: FrameClock::new(),
                };
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running {
            config,
            window,
            gpu,
            game,
            input,
            clock,
        } = &mut self.state
        else {
            return;
        };

        input.handle_event(&event);

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                gpu.resize(size.width, size.height);
                game.resize(gpu, size.width, size.height)
            }
            WindowEvent::RedrawRequested => {
                if config.exit_on_escape && input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }

                let (dt, total_time) = clock.tick();
                let frame = game
                    .update(input, dt, total_time)
                    .and_then(|()| render_frame(gpu, game, config, total_time));

                input.begin_frame();
                window.request_redraw();
                frame
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }
}

/// Clears color and depth, lets the game draw, and presents.
fn render_frame<G: Game>(
    gpu: &GpuContext,
    game: &mut G,
    config: &AppConfig,
    total_time: f32,
) -> Result<(), AppError> {
    let output = match gpu.surface.get_current_texture() {
        Ok(output) => output,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            log::warn!("surface lost or outdated, reconfiguring");
            gpu.reconfigure();
            return Ok(());
        }
        Err(wgpu::SurfaceError::Timeout) => {
            log::warn!("timed out acquiring surface texture, skipping frame");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(config.wgpu_clear_color()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gpu.depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        game.draw(gpu, &mut pass, total_time)?;
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_clears_to_cornflower_blue() {
        let config = AppConfig::default();
        assert_eq!(config.clear_color, [0.4, 0.6, 0.75, 1.0]);
        assert!(config.vsync);
        assert!(config.exit_on_escape);

        let color = config.wgpu_clear_color();
        assert_eq!((color.r, color.g, color.b, color.a), (0.4, 0.6, 0.75, 1.0));
    }

    #[test]
    fn config_builder_overrides_fields() {
        let config = AppConfig::new()
            .title("Test")
            .size(640, 480)
            .vsync(false)
            .exit_on_escape(false);
        assert_eq!(config.title, "Test");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.vsync);
        assert!(!config.exit_on_escape);
    }

    #[test]
    fn frame_clock_is_monotonic() {
        let mut clock = FrameClock::new();
        let (dt1, total1) = clock.tick();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let (dt2, total2) = clock.tick();
        assert!(dt1 >= 0.0);
        assert!(dt2 > 0.0);
        assert!(total2 >= total1 + dt2 - 1e-6);
    }
}
