//! Clear Demo
//!
//! Opens a window and clears it to a slowly cycling color every frame.
//!
//! Features demonstrated:
//! - Continuous animation through `Driver::set_animating`
//! - GPU context creation, `make_current` and `present`
//! - Scroll events, including fling continuation
//!
//! Run with: cargo run -p tessera_platform_desktop --example clear

use tessera_platform::prelude::*;
use tessera_platform_desktop::{DesktopPlatform, WgpuContext, WgpuTarget};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct ClearApp {
    driver: Option<Arc<dyn Driver>>,
    ctx: Option<Box<dyn GpuContext>>,
    frames: u64,
    offset: f32,
}

impl ClearApp {
    fn draw(&mut self) -> Result<()> {
        let Some(driver) = self.driver.as_ref() else {
            return Ok(());
        };
        if self.ctx.is_none() {
            self.ctx = Some(driver.new_context()?);
        }
        let Some(ctx) = self.ctx.as_mut() else {
            return Ok(());
        };

        ctx.make_current()?;
        if ctx.state() != ContextState::SurfaceBound {
            return Ok(());
        }

        if let Some(wgpu_ctx) = ctx.as_any_mut().downcast_mut::<WgpuContext>() {
            if let Some(view) = wgpu_ctx.target_view() {
                let t = self.frames as f32 / 120.0 + self.offset / 500.0;
                let color = wgpu::Color {
                    r: (0.5 + 0.5 * t.sin()) as f64,
                    g: (0.5 + 0.5 * (t + 2.0).sin()) as f64,
                    b: (0.5 + 0.5 * (t + 4.0).sin()) as f64,
                    a: 1.0,
                };
                let device = wgpu_ctx.backend().device();
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Clear Encoder"),
                });
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Clear Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                wgpu_ctx.backend().queue().submit(Some(encoder.finish()));
            }
        }

        ctx.present()?;
        self.frames += 1;
        Ok(())
    }
}

impl Callbacks for ClearApp {
    fn set_driver(&mut self, driver: Arc<dyn Driver>) {
        driver.set_animating(true);
        self.driver = Some(driver);
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Frame(_) => {
                if let Err(e) = self.draw() {
                    tracing::error!("draw failed: {}", e);
                    // A lost device needs a fresh context.
                    self.ctx = None;
                }
            }
            Event::Pointer(p) if p.is_scroll() => {
                self.offset += p.scroll.y;
            }
            Event::Key(key) if key.key == Key::Escape => {
                if let Some(driver) = &self.driver {
                    driver.close();
                }
            }
            Event::Destroy(err) => {
                if let Some(err) = err {
                    tracing::error!("window destroyed: {}", err);
                }
                self.ctx = None;
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let platform = DesktopPlatform::new(PlatformConfig::default())?;
    let event_loop = platform.create_event_loop(WindowOptions::new("Clear Demo"))?;
    event_loop.run(ClearApp::default())?;
    Ok(())
}
