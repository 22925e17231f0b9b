use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use twist_flower::assembler::{SceneConfig, SceneContext};
use twist_flower::cli::Cli;
use twist_flower::core::PointerTracker;
use twist_flower::frame::FrameDriver;
use twist_flower::loaders::GltfLoader;
use twist_flower::renderer::Renderer;
use twist_flower::viewport::Viewport;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct App {
    cli: Cli,
    config: SceneConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    ctx: Option<SceneContext>,
    driver: FrameDriver,
    pointer: PointerTracker,
}

impl App {
    fn new(cli: Cli, config: SceneConfig) -> Self {
        Self {
            cli,
            config,
            window: None,
            renderer: None,
            ctx: None,
            driver: FrameDriver::new(),
            pointer: PointerTracker::new(),
        }
    }

    fn handle_resize(&mut self, size: winit::dpi::PhysicalSize<u32>, scale_factor: f64) {
        let logical = size.to_logical::<f64>(scale_factor);
        let (width, height) = (logical.width.round() as u32, logical.height.round() as u32);

        if let Some(ctx) = &mut self.ctx {
            ctx.resize(width, height, scale_factor as f32);
            if let Some(renderer) = &mut self.renderer {
                renderer.resize(size, ctx.viewport.drawing_buffer_size());
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            Window::default_attributes()
                .with_title("Twist Flower")
                .with_inner_size(winit::dpi::LogicalSize::new(self.cli.width, self.cli.height)),
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale_factor);
        let viewport = Viewport::new(
            logical.width.round() as u32,
            logical.height.round() as u32,
            scale_factor as f32,
        );

        let renderer = match pollster::block_on(Renderer::new(
            window.clone(),
            viewport.drawing_buffer_size(),
            !self.cli.no_ui,
        )) {
            Ok(r) => r,
            Err(e) => {
                log::error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut ctx = SceneContext::assemble(&self.config, viewport);
        ctx.load_mesh(GltfLoader);

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.ctx = Some(ctx);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first
        if let Some(renderer) = &mut self.renderer {
            if renderer.handle_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.scale_factor());
                self.handle_resize(size, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size, scale_factor);
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(ctx), Some(renderer)) = (&mut self.ctx, &mut self.renderer) {
                    if let Err(e) = self.driver.tick(ctx, renderer) {
                        log::error!("Render error: {:#}", e);
                    }
                }
            }
            ref pointer_event => {
                let gestures = self.pointer.process_event(pointer_event);
                if gestures.is_empty() {
                    return;
                }
                let height = self
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.inner_size().height as f32);
                if let Some(ctx) = &mut self.ctx {
                    for gesture in gestures {
                        ctx.controls.handle(gesture, height);
                    }
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.scene_config()?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, config);

    log::info!("Twist Flower - drag to orbit, scroll to zoom, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
