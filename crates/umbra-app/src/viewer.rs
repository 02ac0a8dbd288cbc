//! Interactive viewer driving the frame compositor from the window's redraw loop

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use wgpu::{Instance, Surface, SurfaceConfiguration};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use umbra_core::gpu::GpuDevice;
use umbra_core::{FrameCompositor, FrameStatus, GpuEvaluator, RenderConfig, SceneRegistry};

use crate::renderer::Renderer;

/// Presentation surface; the device itself belongs to the evaluator
pub struct Display {
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
}

/// Main viewer state
pub struct Viewer {
    window: Arc<Window>,
    display: Display,
    evaluator: GpuEvaluator,
    compositor: FrameCompositor,
    renderer: Renderer,
    paused: bool,
    last_frame_time: Instant,
    frame_count: u64,
}

impl Viewer {
    pub fn new(
        window: Arc<Window>,
        display: Display,
        mut evaluator: GpuEvaluator,
        config: RenderConfig,
        registry: SceneRegistry,
    ) -> Result<Self> {
        let compositor = FrameCompositor::new(config, registry, &mut evaluator)?;
        let renderer = Renderer::new(&evaluator.gpu().device, &display.config)?;

        Ok(Self {
            window,
            display,
            evaluator,
            compositor,
            renderer,
            paused: false,
            last_frame_time: Instant::now(),
            frame_count: 0,
        })
    }

    /// Reconfigure the surface and recreate the output image at the new size
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }
        let device = &self.evaluator.gpu().device;
        self.display.config.width = new_size.width;
        self.display.config.height = new_size.height;
        self.display.surface.configure(device, &self.display.config);

        self.compositor
            .resize(&mut self.evaluator, [new_size.width, new_size.height])?;
        log::info!("Resized to {}x{}", new_size.width, new_size.height);
        Ok(())
    }

    /// Advance one frame with the wall-clock time since the previous one
    pub fn update(&mut self) -> Result<()> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        if self.paused {
            return Ok(());
        }

        let report = self.compositor.advance_frame(&mut self.evaluator, elapsed)?;
        if report.status == FrameStatus::Retained {
            log::warn!("Frame {} kept the previous image", report.frame);
        }

        if report.frame % 120 == 0 {
            log::info!(
                "Frame {}: {:?}, {} objects, {} shapes, {} agents, {:.1} fps",
                report.frame,
                report.mode,
                report.objects,
                report.shapes,
                report.agents,
                if elapsed > 0.0 { 1.0 / elapsed } else { 0.0 }
            );
        }
        Ok(())
    }

    /// Blit the front image to the window
    pub fn render(&mut self) -> Result<()> {
        let output = match self.display.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let device = &self.evaluator.gpu().device;
                self.display.surface.configure(device, &self.display.config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let gpu = self.evaluator.gpu();
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blit_encoder"),
        });
        self.renderer
            .render(&gpu.device, &mut encoder, &view, self.evaluator.front_view())?;
        gpu.queue.submit(Some(encoder.finish()));
        output.present();

        self.frame_count += 1;
        Ok(())
    }

    pub fn handle_key(&mut self, key: &Key) -> Result<()> {
        match key {
            Key::Named(NamedKey::Space) => {
                self.paused = !self.paused;
                log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
            }
            Key::Character(c) if c == "r" || c == "R" => {
                self.compositor.reset(&mut self.evaluator)?;
                log::info!("Simulation reinitialized");
            }
            _ => {}
        }
        Ok(())
    }

    /// Release evaluator resources before the device goes away
    pub fn shutdown(self) {
        let Viewer {
            mut evaluator,
            compositor,
            frame_count,
            ..
        } = self;
        compositor.teardown(&mut evaluator);
        log::info!("Viewer closed after {} presented frames", frame_count);
    }
}

/// Run the interactive viewer
pub async fn run_viewer(config: RenderConfig, registry: SceneRegistry) -> Result<()> {
    let event_loop = EventLoop::new()?;

    let [width, height] = config.surface.size;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("Umbra ({:?})", config.mode))
            .with_inner_size(PhysicalSize::new(width, height))
            .build(&event_loop)?,
    );

    let instance = Instance::default();
    let surface = instance.create_surface(window.clone())?;
    let gpu = GpuDevice::with_instance(instance, Some(&surface)).await?;

    let surface_caps = surface.get_capabilities(&gpu.adapter);
    let Some(&default_format) = surface_caps.formats.first() else {
        anyhow::bail!("Surface reports no supported formats");
    };
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .unwrap_or(default_format);

    let size = window.inner_size();
    let surface_config = SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: surface_caps.present_modes[0],
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&gpu.device, &surface_config);

    // The output image follows the window, not the configured size
    let mut config = config;
    config.surface.size = [surface_config.width, surface_config.height];

    let display = Display {
        surface,
        config: surface_config,
    };
    let evaluator = GpuEvaluator::new(gpu, config.surface.size)?;
    let mut viewer = Some(Viewer::new(window.clone(), display, evaluator, config, registry)?);
    log::info!("Viewer ready: Escape quits, R resets, Space pauses");

    window.request_redraw();

    event_loop.run(move |event, elwt| {
        let Some(active) = viewer.as_mut() else {
            return;
        };
        match event {
            Event::WindowEvent { ref event, window_id } if window_id == active.window.id() => match event {
                WindowEvent::CloseRequested => {
                    if let Some(closing) = viewer.take() {
                        closing.shutdown();
                    }
                    elwt.exit();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    if let Some(closing) = viewer.take() {
                        closing.shutdown();
                    }
                    elwt.exit();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    if let Err(e) = active.handle_key(logical_key) {
                        log::error!("Key handling error: {}", e);
                    }
                }
                WindowEvent::Resized(physical_size) => {
                    if let Err(e) = active.resize(*physical_size) {
                        log::error!("Resize error: {}", e);
                    }
                    active.window.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    if let Err(e) = active.update() {
                        log::error!("Frame error: {}", e);
                        if let Some(closing) = viewer.take() {
                            closing.shutdown();
                        }
                        elwt.exit();
                        return;
                    }
                    if let Err(e) = active.render() {
                        log::error!("Render error: {}", e);
                    }
                    active.window.request_redraw();
                }
                _ => {}
            },
            _ => {}
        }
    })?;

    Ok(())
}
