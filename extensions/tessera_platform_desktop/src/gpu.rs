//! wgpu surface backend
//!
//! [`WgpuBackend`] implements the primitive surface operations for one winit
//! window on top of wgpu. The lifecycle itself is driven by
//! [`SurfaceContext`]; applications receive it as a boxed
//! [`GpuContext`](tessera_platform::GpuContext) and downcast to
//! [`WgpuContext`] to reach the device, queue and render target.

use raw_window_handle::{HasDisplayHandle, RawDisplayHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_platform::{
    with_version_fallback, ApiVersion, ContextBackend, OffscreenFormat, PlatformError,
    PresentError, Result, SurfaceContext, VsyncPolicy,
};
use winit::window::{Window as WinitWindow, WindowId};

/// GPU context of a desktop window
pub type WgpuContext = SurfaceContext<WgpuBackend>;

/// Blit shader: fullscreen triangle sampling the offscreen and applying the
/// sRGB encode
const BLIT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@group(0) @binding(0) var offscreen_tex: texture_2d<f32>;
@group(0) @binding(1) var offscreen_sampler: sampler;

fn srgb_encode(rgb: vec3<f32>) -> vec3<f32> {
    let lin = rgb * 12.92;
    let ex = 1.055 * pow(rgb, vec3<f32>(1.0 / 2.4)) - vec3<f32>(0.055);
    return select(ex, lin, rgb < vec3<f32>(0.0031308));
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let col = textureSample(offscreen_tex, offscreen_sampler, in.uv);
    return vec4<f32>(srgb_encode(col.rgb), col.a);
}
"#;

/// Color and depth targets used by sRGB emulation
pub struct WgpuOffscreen {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
}

/// wgpu implementation of [`ContextBackend`] for a winit window
pub struct WgpuBackend {
    window: Arc<WinitWindow>,
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    version: ApiVersion,
    native_srgb: bool,
    /// Surface created while picking the adapter, reused by the first bind
    spare: Option<wgpu::Surface<'static>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    frame: Option<wgpu::SurfaceTexture>,
    /// Size and format at which a suboptimal acquire last asked for a rebind
    suboptimal_at: Option<SurfaceKey>,
    blit: Option<BlitPipeline>,
    lost: Arc<AtomicBool>,
}

/// Create the GPU context for a window
pub fn create_context(window: Arc<WinitWindow>, vsync: VsyncPolicy) -> Result<WgpuContext> {
    let backend = WgpuBackend::new(window)?;
    Ok(SurfaceContext::new(backend, vsync))
}

impl WgpuBackend {
    pub fn new(window: Arc<WinitWindow>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| PlatformError::Context(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| PlatformError::ResourceUnavailable("no compatible GPU adapter".into()))?;

        let ((device, queue), version) = with_version_fallback(|version| {
            let limits = match version {
                ApiVersion::V3 => wgpu::Limits::default(),
                ApiVersion::V2 => wgpu::Limits::downlevel_webgl2_defaults(),
            };
            pollster::block_on(adapter.request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Tessera GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            ))
            .map_err(|e| PlatformError::Context(e.to_string()))
        })?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            tracing::error!(?reason, %message, "wgpu device lost");
            flag.store(true, Ordering::Release);
        });

        let caps = surface.get_capabilities(&adapter);
        let native_srgb = caps.formats.iter().any(|f| f.is_srgb());
        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            ?version,
            native_srgb,
            "wgpu context created"
        );
        tracing::debug!("Surface capabilities - formats: {:?}", caps.formats);

        Ok(Self {
            window,
            instance,
            adapter,
            device,
            queue,
            version,
            native_srgb,
            spare: Some(surface),
            surface: None,
            surface_config: None,
            frame: None,
            suboptimal_at: None,
            blit: None,
            lost,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn api_version(&self) -> ApiVersion {
        self.version
    }

    /// Format of the bound surface
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface_config.as_ref().map(|c| c.format)
    }

    /// View of the image acquired by the last `make_current`
    pub fn frame_view(&self) -> Option<wgpu::TextureView> {
        self.frame
            .as_ref()
            .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn configure(&mut self) -> Result<()> {
        let (Some(surface), Some(config)) = (&self.surface, &self.surface_config) else {
            return Ok(());
        };
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        surface.configure(&self.device, config);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(PlatformError::Context(err.to_string())),
            None => Ok(()),
        }
    }

    fn ensure_blit_pipeline(&mut self, format: wgpu::TextureFormat) {
        if self.blit.as_ref().map(|b| b.format) != Some(format) {
            self.blit = Some(BlitPipeline::new(&self.device, format));
        }
    }

    fn padded_bytes_per_row(width: u32) -> u32 {
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        ((unpadded + align - 1) / align) * align
    }
}

impl BlitPipeline {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sRGB Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sRGB Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sRGB Blit Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sRGB Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Offscreen and surface have the same size, so nearest sampling is exact.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sRGB Blit Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
            format,
        }
    }
}

impl ContextBackend for WgpuBackend {
    type Drawable = WindowId;
    type Offscreen = WgpuOffscreen;

    fn current_drawable(&self) -> Option<(WindowId, u32, u32)> {
        let size = self.window.inner_size();
        Some((self.window.id(), size.width, size.height))
    }

    fn native_srgb(&self) -> bool {
        self.native_srgb
    }

    fn needs_vsync(&self) -> bool {
        // Wayland compositors pace frames through frame callbacks.
        !matches!(
            self.window.display_handle().map(|h| h.as_raw()),
            Ok(RawDisplayHandle::Wayland(_))
        )
    }

    fn finish(&mut self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    fn create_surface(
        &mut self,
        _drawable: &WindowId,
        width: u32,
        height: u32,
        srgb: bool,
    ) -> Result<()> {
        let surface = match self.spare.take() {
            Some(surface) => surface,
            None => self
                .instance
                .create_surface(Arc::clone(&self.window))
                .map_err(|e| PlatformError::Context(e.to_string()))?,
        };
        let caps = surface.get_capabilities(&self.adapter);
        let Some(format) = caps.formats.iter().copied().find(|f| f.is_srgb() == srgb) else {
            self.spare = Some(surface);
            return Err(PlatformError::Context(format!(
                "no {} surface format",
                if srgb { "sRGB" } else { "linear" }
            )));
        };
        tracing::debug!("Selected texture format: {:?}", format);

        self.surface_config = Some(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        });
        self.surface = Some(surface);
        if let Err(e) = self.configure() {
            self.spare = self.surface.take();
            self.surface_config = None;
            return Err(e);
        }
        Ok(())
    }

    fn destroy_surface(&mut self) {
        self.frame = None;
        self.surface = None;
        self.surface_config = None;
    }

    fn set_swap_interval(&mut self, vsync: bool) {
        let Some(surface) = &self.surface else {
            return;
        };
        let modes = surface.get_capabilities(&self.adapter).present_modes;
        let mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
                .into_iter()
                .find(|m| modes.contains(m))
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        if let Some(config) = self.surface_config.as_mut() {
            if config.present_mode == mode {
                return;
            }
            config.present_mode = mode;
        }
        tracing::debug!(?mode, "present mode");
        if let Err(e) = self.configure() {
            tracing::warn!(error = %e, "failed to apply present mode");
        }
    }

    fn begin_frame(&mut self) -> std::result::Result<(), PresentError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(PresentError::DeviceLost("device lost".into()));
        }
        if self.frame.is_some() {
            return Ok(());
        }
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        match surface.get_current_texture() {
            Ok(frame) if frame.suboptimal => {
                // Usable. Rebuild once per size and format; a surface that
                // stays suboptimal after that is kept.
                self.frame = Some(frame);
                let key = self
                    .surface_config
                    .as_ref()
                    .map(|c| (c.width, c.height, c.format));
                match key {
                    Some(key) if rebind_for_suboptimal(&mut self.suboptimal_at, key) => {
                        Err(PresentError::Outdated)
                    }
                    _ => Ok(()),
                }
            }
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => Err(PresentError::Ignorable),
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                Err(PresentError::Outdated)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                Err(PresentError::DeviceLost("out of GPU memory".into()))
            }
            #[allow(unreachable_patterns)]
            Err(e) => Err(PresentError::Other(e.to_string())),
        }
    }

    fn swap(&mut self) -> std::result::Result<(), PresentError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(PresentError::DeviceLost("device lost".into()));
        }
        match self.frame.take() {
            Some(frame) => {
                frame.present();
                Ok(())
            }
            // Nothing was acquired this frame.
            None => Err(PresentError::Ignorable),
        }
    }

    fn create_offscreen(
        &mut self,
        width: u32,
        height: u32,
        format: OffscreenFormat,
    ) -> Result<WgpuOffscreen> {
        let color_format = match format {
            OffscreenFormat::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            OffscreenFormat::Unmanaged => wgpu::TextureFormat::Rgba8Unorm,
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sRGB Offscreen"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sRGB Offscreen Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth16Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(PlatformError::Context(format!(
                "sRGB offscreen incomplete ({}x{}): {}",
                width, height, err
            )));
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuOffscreen {
            texture,
            view,
            depth,
            depth_view,
            format: color_format,
        })
    }

    fn probe_offscreen(&mut self, offscreen: &WgpuOffscreen, gray: f32) -> Result<[u8; 4]> {
        let bytes_per_row = Self::padded_bytes_per_row(1);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sRGB Probe Buffer"),
            size: bytes_per_row as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sRGB Probe Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sRGB Probe Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &offscreen.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: gray as f64,
                            g: gray as f64,
                            b: gray as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &offscreen.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| PlatformError::Context(e.to_string()))?
            .map_err(|e| PlatformError::Context(e.to_string()))?;

        let pixel = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2], data[3]]
        };
        buffer.unmap();
        Ok(pixel)
    }

    fn blit_offscreen(&mut self, offscreen: &WgpuOffscreen, format: OffscreenFormat) -> Result<()> {
        let Some(target) = self.frame_view() else {
            return Ok(());
        };
        let Some(surface_format) = self.surface_format() else {
            return Ok(());
        };
        tracing::trace!(?format, "sRGB blit");

        self.ensure_blit_pipeline(surface_format);
        let Some(blit) = self.blit.as_ref() else {
            return Ok(());
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sRGB Blit Bind Group"),
            layout: &blit.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&offscreen.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&blit.sampler),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sRGB Blit Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sRGB Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Magenta makes a missed blit obvious.
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 1.0,
                            g: 0.0,
                            b: 1.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&blit.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn invalidate_offscreen(&mut self, offscreen: &WgpuOffscreen) {
        // An empty pass that discards both attachments.
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sRGB Offscreen Invalidate"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sRGB Offscreen Invalidate"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &offscreen.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &offscreen.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn destroy_offscreen(&mut self, offscreen: WgpuOffscreen) {
        offscreen.texture.destroy();
        offscreen.depth.destroy();
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    fn release(&mut self) {
        self.frame = None;
        self.surface = None;
        self.spare = None;
        self.surface_config = None;
        self.blit = None;
        self.device.destroy();
    }
}

/// Surface width, height and format
type SurfaceKey = (u32, u32, wgpu::TextureFormat);

/// Whether a suboptimal acquire at `current` should rebuild the surface.
/// Only the first one per size and format does.
fn rebind_for_suboptimal(last: &mut Option<SurfaceKey>, current: SurfaceKey) -> bool {
    if *last == Some(current) {
        return false;
    }
    *last = Some(current);
    true
}

/// Render target access for [`WgpuContext`]
pub trait WgpuTarget {
    /// The view to render the current frame into: the sRGB emulation
    /// offscreen when emulating, the acquired surface image otherwise
    fn target_view(&self) -> Option<wgpu::TextureView>;

    /// Format of [`WgpuTarget::target_view`]
    fn target_format(&self) -> Option<wgpu::TextureFormat>;
}

impl WgpuTarget for WgpuContext {
    fn target_view(&self) -> Option<wgpu::TextureView> {
        match self.offscreen_target() {
            Some(offscreen) => Some(
                offscreen
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
            ),
            None => self.backend().frame_view(),
        }
    }

    fn target_format(&self) -> Option<wgpu::TextureFormat> {
        match self.offscreen_target() {
            Some(offscreen) => Some(offscreen.format),
            None => self.backend().surface_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(
            WgpuBackend::padded_bytes_per_row(1),
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
        );
        assert_eq!(WgpuBackend::padded_bytes_per_row(64), 256);
        assert_eq!(WgpuBackend::padded_bytes_per_row(65), 512);
    }

    #[test]
    fn test_suboptimal_rebinds_once_per_size_and_format() {
        let srgb = wgpu::TextureFormat::Bgra8UnormSrgb;
        let mut last = None;
        assert!(rebind_for_suboptimal(&mut last, (800, 600, srgb)));
        // Still suboptimal after the rebuild: keep presenting.
        assert!(!rebind_for_suboptimal(&mut last, (800, 600, srgb)));
        assert!(!rebind_for_suboptimal(&mut last, (800, 600, srgb)));

        assert!(rebind_for_suboptimal(&mut last, (1024, 768, srgb)));
        assert!(rebind_for_suboptimal(
            &mut last,
            (1024, 768, wgpu::TextureFormat::Bgra8Unorm)
        ));
    }

    #[test]
    fn test_blit_shader_entry_points() {
        assert!(BLIT_SHADER.contains("fn vs_main"));
        assert!(BLIT_SHADER.contains("fn fs_main"));
        assert!(BLIT_SHADER.contains("0.0031308"));
    }
}
