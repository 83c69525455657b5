// =============================================================================
// gfx-core - triangle demo on top of the frame synchronization core
// =============================================================================
//
// FRAME FLOW (one RedrawRequested):
// 1. Rebuild the swapchain if a resize or stale present asked for it
// 2. Acquire an image, wait for and reset that slot's fence
// 3. Record clear + triangle into the slot's command buffer
// 4. Submit, then present
//
// =============================================================================

use anyhow::{Context, Result};
use gfx_core::config::Config;
use gfx_core::{FrameOutcome, Renderer};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

fn main() -> Result<()> {
    init_logging();

    let config = Config::load();
    log::info!("Starting gfx-core");
    log::info!("Window: {}x{}", config.window.width, config.window.height);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop terminated abnormally")?;
    Ok(())
}

/// Info by default, `RUST_LOG` overrides.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    // Renderer before window: the surface must go first
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    frames_presented: u64,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            frames_presented: 0,
        }
    }

    fn init_renderer(&mut self, window: &Window) -> Result<()> {
        let size = window.inner_size();
        let renderer = Renderer::new(window, size.width, size.height, &self.config)
            .context("Failed to initialize renderer")?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.render_frame() {
            Ok(FrameOutcome::Presented { .. }) => self.frames_presented += 1,
            Ok(FrameOutcome::Skipped) => {}
            Err(err) => {
                log::error!("Render error: {}", err);
                event_loop.exit();
            }
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_renderer(&window) {
            log::error!("{:#}", e);
            event_loop.exit();
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Redraw continuously; FIFO present paces the loop.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("Presented {} frames", self.frames_presented);
        // Tear the GPU side down while the window still exists
        self.renderer = None;
    }
}
