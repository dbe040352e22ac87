//! Software GPU backend
//!
//! A CPU framebuffer implementing [`ContextBackend`], so the context
//! lifecycle runs unchanged without a GPU. Pixels are stored as RGBA8 and
//! follow the same color rules as a real device: sRGB-typed targets encode
//! on write and decode on sampling, unmanaged targets store values as is.
//!
//! Every operation is counted in [`SoftwareStats`], and [`SoftwareFaults`]
//! injects presentation failures and device loss.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tessera_platform::srgb::{srgb_decode, srgb_encode, to_u8};
use tessera_platform::{
    with_version_fallback, ApiVersion, ContextBackend, OffscreenFormat, PlatformError,
    PresentError, Result, SurfaceContext, VsyncPolicy,
};

/// GPU context over the software backend
pub type SoftwareContext = SurfaceContext<SoftwareBackend>;

/// Color the blit clears to before drawing, so unwritten pixels stand out
const BLIT_CLEAR: [u8; 4] = [255, 0, 255, 255];

/// Capabilities of the simulated device
#[derive(Clone, Debug, PartialEq)]
pub struct SoftwareOptions {
    /// sRGB surfaces are supported
    pub native_srgb: bool,
    /// Creating an sRGB surface fails even though it is advertised
    pub refuse_srgb_surface: bool,
    /// sRGB offscreen targets store values without encoding them
    pub broken_srgb_offscreen: bool,
    /// Offscreen targets cannot be created
    pub offscreen_unsupported: bool,
    /// A compositor paces frames, so vsync is not needed
    pub compositor_paced: bool,
    /// Highest API version the device accepts; `None` for no device at all
    pub max_version: Option<ApiVersion>,
}

impl Default for SoftwareOptions {
    fn default() -> Self {
        Self {
            native_srgb: true,
            refuse_srgb_surface: false,
            broken_srgb_offscreen: false,
            offscreen_unsupported: false,
            compositor_paced: true,
            max_version: Some(ApiVersion::V3),
        }
    }
}

/// Operation counters shared by all contexts of a window
#[derive(Debug, Default)]
pub struct SoftwareStats {
    contexts_created: AtomicUsize,
    contexts_released: AtomicUsize,
    surfaces_created: AtomicUsize,
    surfaces_destroyed: AtomicUsize,
    offscreens_created: AtomicUsize,
    offscreens_destroyed: AtomicUsize,
    self_tests: AtomicUsize,
    blits: AtomicUsize,
    frames_presented: AtomicUsize,
    frames_dropped: AtomicUsize,
    finishes: AtomicUsize,
    vsync: AtomicBool,
}

/// Point-in-time copy of [`SoftwareStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub contexts_created: usize,
    pub contexts_released: usize,
    pub surfaces_created: usize,
    pub surfaces_destroyed: usize,
    pub offscreens_created: usize,
    pub offscreens_destroyed: usize,
    pub self_tests: usize,
    pub blits: usize,
    pub frames_presented: usize,
    pub frames_dropped: usize,
    pub finishes: usize,
    /// Last swap interval applied
    pub vsync: bool,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SoftwareStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        StatsSnapshot {
            contexts_created: get(&self.contexts_created),
            contexts_released: get(&self.contexts_released),
            surfaces_created: get(&self.surfaces_created),
            surfaces_destroyed: get(&self.surfaces_destroyed),
            offscreens_created: get(&self.offscreens_created),
            offscreens_destroyed: get(&self.offscreens_destroyed),
            self_tests: get(&self.self_tests),
            blits: get(&self.blits),
            frames_presented: get(&self.frames_presented),
            frames_dropped: get(&self.frames_dropped),
            finishes: get(&self.finishes),
            vsync: self.vsync.load(Ordering::Relaxed),
        }
    }
}

/// Failures to inject into the next frames
#[derive(Debug, Default)]
pub struct SoftwareFaults {
    acquire: Mutex<VecDeque<PresentError>>,
    present: Mutex<VecDeque<PresentError>>,
    device_loss: AtomicBool,
}

impl SoftwareFaults {
    /// Fail the next image acquisition with `err`
    pub fn inject_acquire(&self, err: PresentError) {
        self.acquire
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(err);
    }

    /// Fail the next swap with `err`
    pub fn inject_present(&self, err: PresentError) {
        self.present
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(err);
    }

    /// Lose the device of the context that next touches it
    pub fn lose_device(&self) {
        self.device_loss.store(true, Ordering::Release);
    }

    fn take_loss(&self) -> bool {
        self.device_loss.swap(false, Ordering::AcqRel)
    }

    fn pop(queue: &Mutex<VecDeque<PresentError>>) -> Option<PresentError> {
        queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }
}

/// The native surface of a headless window, as the event loop sees it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeSurface {
    /// Changes whenever the surface object is recreated
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
}

/// GPU-facing half of a headless window, shared by its contexts
#[derive(Clone, Debug, Default)]
pub struct SoftwareWindow {
    pub surface: Arc<Mutex<NativeSurface>>,
    pub stats: Arc<SoftwareStats>,
    pub faults: Arc<SoftwareFaults>,
}

impl SoftwareWindow {
    pub fn native_surface(&self) -> NativeSurface {
        *self.surface.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn update_surface(&self, update: impl FnOnce(&mut NativeSurface)) {
        update(&mut self.surface.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

/// RGBA8 pixel buffer
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    srgb: bool,
    pixels: Vec<[u8; 4]>,
}

impl Framebuffer {
    fn new(width: u32, height: u32, srgb: bool) -> Self {
        Self {
            width,
            height,
            srgb,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    fn fill(&mut self, color: [f32; 4]) {
        let px = quantize(color, self.srgb);
        self.pixels.fill(px);
    }
}

/// Offscreen render target handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftwareOffscreen {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub format: OffscreenFormat,
}

fn quantize(color: [f32; 4], encode: bool) -> [u8; 4] {
    let channel = |v: f32| if encode { to_u8(srgb_encode(v)) } else { to_u8(v) };
    [
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        to_u8(color[3]),
    ]
}

fn linearize(px: [u8; 4], decode: bool) -> [f32; 4] {
    let channel = |v: u8| {
        let v = v as f32 / 255.0;
        if decode {
            srgb_decode(v)
        } else {
            v
        }
    };
    [
        channel(px[0]),
        channel(px[1]),
        channel(px[2]),
        px[3] as f32 / 255.0,
    ]
}

/// CPU implementation of [`ContextBackend`]
pub struct SoftwareBackend {
    options: SoftwareOptions,
    version: ApiVersion,
    window: SoftwareWindow,
    framebuffer: Option<Framebuffer>,
    presented: Option<Framebuffer>,
    acquired: bool,
    offscreens: HashMap<u64, Vec<[u8; 4]>>,
    next_offscreen: u64,
    lost: bool,
    released: bool,
}

/// Create a context for a headless window
pub fn create_context(
    options: SoftwareOptions,
    window: SoftwareWindow,
    vsync: VsyncPolicy,
) -> Result<SoftwareContext> {
    let backend = SoftwareBackend::new(options, window)?;
    Ok(SurfaceContext::new(backend, vsync))
}

impl SoftwareBackend {
    pub fn new(options: SoftwareOptions, window: SoftwareWindow) -> Result<Self> {
        let max = options.max_version;
        let ((), version) = with_version_fallback(|version| match max {
            Some(max) if version <= max => Ok(()),
            _ => Err(PlatformError::ResourceUnavailable(format!(
                "software device does not support {:?}",
                version
            ))),
        })?;
        bump(&window.stats.contexts_created);
        tracing::info!(?version, "software context created");

        Ok(Self {
            options,
            version,
            window,
            framebuffer: None,
            presented: None,
            acquired: false,
            offscreens: HashMap::new(),
            next_offscreen: 1,
            lost: false,
            released: false,
        })
    }

    pub fn api_version(&self) -> ApiVersion {
        self.version
    }

    pub fn stats(&self) -> &Arc<SoftwareStats> {
        &self.window.stats
    }

    /// The bound surface's back buffer
    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    /// The last presented image
    pub fn presented(&self) -> Option<&Framebuffer> {
        self.presented.as_ref()
    }

    pub fn live_offscreens(&self) -> usize {
        self.offscreens.len()
    }

    fn offscreen_encodes(&self, format: OffscreenFormat) -> bool {
        format == OffscreenFormat::Srgb && !self.options.broken_srgb_offscreen
    }

    fn fill_offscreen(&mut self, id: u64, format: OffscreenFormat, color: [f32; 4]) -> Result<()> {
        let px = quantize(color, self.offscreen_encodes(format));
        let pixels = self
            .offscreens
            .get_mut(&id)
            .ok_or_else(|| PlatformError::Context(format!("unknown offscreen {}", id)))?;
        pixels.fill(px);
        Ok(())
    }

    /// Clear the current render target: the offscreen `target` if given,
    /// the surface otherwise
    fn clear_target(
        &mut self,
        target: Option<(u64, OffscreenFormat)>,
        color: [f32; 4],
    ) -> Result<()> {
        match target {
            Some((id, format)) => self.fill_offscreen(id, format, color),
            None => match self.framebuffer.as_mut() {
                Some(fb) => {
                    fb.fill(color);
                    Ok(())
                }
                None => Err(PlatformError::Context("no surface bound".to_string())),
            },
        }
    }

    fn check_loss(&mut self) -> std::result::Result<(), PresentError> {
        if self.lost || self.window.faults.take_loss() {
            self.lost = true;
            return Err(PresentError::DeviceLost("software device reset".to_string()));
        }
        Ok(())
    }
}

impl ContextBackend for SoftwareBackend {
    type Drawable = u64;
    type Offscreen = SoftwareOffscreen;

    fn current_drawable(&self) -> Option<(u64, u32, u32)> {
        let surface = self.window.native_surface();
        surface
            .visible
            .then_some((surface.id, surface.width, surface.height))
    }

    fn native_srgb(&self) -> bool {
        self.options.native_srgb
    }

    fn needs_vsync(&self) -> bool {
        !self.options.compositor_paced
    }

    fn finish(&mut self) {
        bump(&self.window.stats.finishes);
    }

    fn create_surface(&mut self, drawable: &u64, width: u32, height: u32, srgb: bool) -> Result<()> {
        if srgb && self.options.refuse_srgb_surface {
            return Err(PlatformError::Context(
                "sRGB surface format refused".to_string(),
            ));
        }
        tracing::debug!(surface = drawable, width, height, srgb, "software surface created");
        self.framebuffer = Some(Framebuffer::new(width, height, srgb));
        self.acquired = false;
        bump(&self.window.stats.surfaces_created);
        Ok(())
    }

    fn destroy_surface(&mut self) {
        if self.framebuffer.take().is_some() {
            bump(&self.window.stats.surfaces_destroyed);
        }
        self.acquired = false;
    }

    fn set_swap_interval(&mut self, vsync: bool) {
        self.window.stats.vsync.store(vsync, Ordering::Relaxed);
    }

    fn begin_frame(&mut self) -> std::result::Result<(), PresentError> {
        self.check_loss()?;
        if let Some(err) = SoftwareFaults::pop(&self.window.faults.acquire) {
            return Err(err);
        }
        self.acquired = true;
        Ok(())
    }

    fn swap(&mut self) -> std::result::Result<(), PresentError> {
        self.check_loss()?;
        let acquired = std::mem::take(&mut self.acquired);
        if let Some(err) = SoftwareFaults::pop(&self.window.faults.present) {
            return Err(err);
        }
        if !acquired {
            bump(&self.window.stats.frames_dropped);
            return Err(PresentError::Ignorable);
        }
        let Some(fb) = self.framebuffer.as_ref() else {
            return Err(PresentError::Other("no surface bound".to_string()));
        };
        self.presented = Some(fb.clone());
        bump(&self.window.stats.frames_presented);
        Ok(())
    }

    fn create_offscreen(
        &mut self,
        width: u32,
        height: u32,
        format: OffscreenFormat,
    ) -> Result<SoftwareOffscreen> {
        if self.options.offscreen_unsupported {
            return Err(PlatformError::Context(
                "offscreen render targets unsupported".to_string(),
            ));
        }
        let id = self.next_offscreen;
        self.next_offscreen += 1;
        self.offscreens
            .insert(id, vec![[0; 4]; width as usize * height as usize]);
        bump(&self.window.stats.offscreens_created);
        Ok(SoftwareOffscreen {
            id,
            width,
            height,
            format,
        })
    }

    fn probe_offscreen(&mut self, offscreen: &SoftwareOffscreen, gray: f32) -> Result<[u8; 4]> {
        bump(&self.window.stats.self_tests);
        self.fill_offscreen(offscreen.id, offscreen.format, [gray, gray, gray, 1.0])?;
        self.offscreens
            .get(&offscreen.id)
            .and_then(|pixels| pixels.first().copied())
            .ok_or_else(|| PlatformError::Context("empty offscreen".to_string()))
    }

    fn blit_offscreen(&mut self, offscreen: &SoftwareOffscreen, format: OffscreenFormat) -> Result<()> {
        let Some(fb) = self.framebuffer.as_mut() else {
            return Err(PlatformError::Context("no surface bound".to_string()));
        };
        let Some(src) = self.offscreens.get(&offscreen.id) else {
            return Err(PlatformError::Context(format!(
                "unknown offscreen {}",
                offscreen.id
            )));
        };

        fb.pixels.fill(BLIT_CLEAR);
        // Sampling an sRGB texture decodes; the shader encodes again.
        let decode = format == OffscreenFormat::Srgb;
        let target_srgb = fb.srgb;
        for (dst, src) in fb.pixels.iter_mut().zip(src) {
            let linear = linearize(*src, decode);
            let shaded = [
                srgb_encode(linear[0]),
                srgb_encode(linear[1]),
                srgb_encode(linear[2]),
                linear[3],
            ];
            *dst = quantize(shaded, target_srgb);
        }
        bump(&self.window.stats.blits);
        Ok(())
    }

    fn invalidate_offscreen(&mut self, offscreen: &SoftwareOffscreen) {
        if let Some(pixels) = self.offscreens.get_mut(&offscreen.id) {
            pixels.fill([0; 4]);
        }
    }

    fn destroy_offscreen(&mut self, offscreen: SoftwareOffscreen) {
        if self.offscreens.remove(&offscreen.id).is_some() {
            bump(&self.window.stats.offscreens_destroyed);
        }
    }

    fn is_lost(&self) -> bool {
        self.lost
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.framebuffer = None;
        self.offscreens.clear();
        bump(&self.window.stats.contexts_released);
        tracing::debug!("software context released");
    }
}

/// Render target access for [`SoftwareContext`]
pub trait SoftwareTarget {
    /// Clear the frame's render target to a linear color
    fn clear(&mut self, color: [f32; 4]) -> Result<()>;

    /// Read a pixel of the last presented frame
    fn presented_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]>;

    /// Size of the bound surface
    fn surface_size(&self) -> Option<(u32, u32)>;
}

impl SoftwareTarget for SoftwareContext {
    fn clear(&mut self, color: [f32; 4]) -> Result<()> {
        let target = self.offscreen_target().map(|o| (o.id, o.format));
        self.backend_mut().clear_target(target, color)
    }

    fn presented_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.backend().presented().and_then(|fb| fb.pixel(x, y))
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        self.backend().framebuffer().map(|fb| fb.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_platform::{ColorCorrection, ContextState};

    const GRAY: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

    fn window(width: u32, height: u32) -> SoftwareWindow {
        let window = SoftwareWindow::default();
        window.update_surface(|s| {
            *s = NativeSurface {
                id: 1,
                width,
                height,
                visible: true,
            }
        });
        window
    }

    fn render_gray(options: SoftwareOptions) -> (SoftwareContext, [u8; 4]) {
        let mut ctx = create_context(options, window(8, 4), VsyncPolicy::Auto).unwrap();
        ctx.make_current().unwrap();
        ctx.clear(GRAY).unwrap();
        ctx.present().unwrap();
        let px = ctx.presented_pixel(3, 2).unwrap();
        (ctx, px)
    }

    #[test]
    fn test_native_srgb_surface() {
        let (ctx, px) = render_gray(SoftwareOptions::default());
        assert_eq!(ctx.color_correction(), ColorCorrection::NativeSrgb);
        assert_eq!(px, [188, 188, 188, 255]);
        assert_eq!(ctx.backend().stats().snapshot().blits, 0);
    }

    #[test]
    fn test_emulated_srgb_matches_native() {
        let (ctx, px) = render_gray(SoftwareOptions {
            native_srgb: false,
            ..Default::default()
        });
        assert_eq!(ctx.color_correction(), ColorCorrection::EmulatedSrgbBlit);
        assert_eq!(ctx.offscreen_format(), Some(OffscreenFormat::Srgb));
        assert_eq!(px, [188, 188, 188, 255]);

        let stats = ctx.backend().stats().snapshot();
        assert_eq!(stats.self_tests, 1);
        assert_eq!(stats.blits, 1);
    }

    #[test]
    fn test_broken_offscreen_switches_to_unmanaged() {
        let (ctx, px) = render_gray(SoftwareOptions {
            native_srgb: false,
            broken_srgb_offscreen: true,
            ..Default::default()
        });
        assert_eq!(ctx.offscreen_format(), Some(OffscreenFormat::Unmanaged));
        assert_eq!(px, [188, 188, 188, 255]);
        assert_eq!(ctx.backend().live_offscreens(), 1);
    }

    #[test]
    fn test_refused_srgb_surface_emulates() {
        let (ctx, px) = render_gray(SoftwareOptions {
            refuse_srgb_surface: true,
            ..Default::default()
        });
        assert_eq!(ctx.color_correction(), ColorCorrection::EmulatedSrgbBlit);
        assert_eq!(px[0], 188);
    }

    #[test]
    fn test_no_offscreen_degrades_uncorrected() {
        let (ctx, px) = render_gray(SoftwareOptions {
            native_srgb: false,
            offscreen_unsupported: true,
            ..Default::default()
        });
        assert_eq!(ctx.color_correction(), ColorCorrection::None);
        assert_eq!(px[0], 128);
    }

    #[test]
    fn test_blit_reads_invalidated_offscreen() {
        let mut ctx = create_context(
            SoftwareOptions {
                native_srgb: false,
                ..Default::default()
            },
            window(2, 2),
            VsyncPolicy::Auto,
        )
        .unwrap();
        ctx.make_current().unwrap();
        ctx.clear([1.0, 1.0, 1.0, 1.0]).unwrap();
        ctx.present().unwrap();
        assert_eq!(ctx.presented_pixel(0, 0), Some([255, 255, 255, 255]));

        // Nothing drawn: the discarded offscreen shows through.
        ctx.make_current().unwrap();
        ctx.present().unwrap();
        assert_eq!(ctx.presented_pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_version_fallback() {
        let backend = SoftwareBackend::new(
            SoftwareOptions {
                max_version: Some(ApiVersion::V2),
                ..Default::default()
            },
            SoftwareWindow::default(),
        )
        .unwrap();
        assert_eq!(backend.api_version(), ApiVersion::V2);

        let err = SoftwareBackend::new(
            SoftwareOptions {
                max_version: None,
                ..Default::default()
            },
            SoftwareWindow::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, PlatformError::ResourceUnavailable(_)));
    }

    #[test]
    fn test_vsync_without_compositor() {
        let paced = window(4, 4);
        let mut ctx = create_context(SoftwareOptions::default(), paced.clone(), VsyncPolicy::Auto)
            .unwrap();
        ctx.make_current().unwrap();
        assert!(!paced.stats.snapshot().vsync);

        let unpaced = window(4, 4);
        let mut ctx = create_context(
            SoftwareOptions {
                compositor_paced: false,
                ..Default::default()
            },
            unpaced.clone(),
            VsyncPolicy::Auto,
        )
        .unwrap();
        ctx.make_current().unwrap();
        assert!(unpaced.stats.snapshot().vsync);
    }

    #[test]
    fn test_injected_faults() {
        let win = window(4, 4);
        let mut ctx =
            create_context(SoftwareOptions::default(), win.clone(), VsyncPolicy::Auto).unwrap();
        ctx.make_current().unwrap();

        win.faults.inject_present(PresentError::Ignorable);
        ctx.present().unwrap();
        win.faults.inject_present(PresentError::Other("bad".into()));
        assert!(matches!(ctx.present(), Err(PlatformError::Present(_))));

        win.faults.lose_device();
        let err = ctx.make_current().unwrap_err();
        assert!(err.is_device_lost());
        assert_eq!(ctx.state(), ContextState::Lost);
        assert!(ctx.make_current().unwrap_err().is_device_lost());
    }

    #[test]
    fn test_hidden_surface_unbinds() {
        let win = window(4, 4);
        let mut ctx =
            create_context(SoftwareOptions::default(), win.clone(), VsyncPolicy::Auto).unwrap();
        ctx.make_current().unwrap();
        win.update_surface(|s| s.visible = false);
        ctx.make_current().unwrap();
        assert_eq!(ctx.state(), ContextState::SurfaceUnbound);
        assert_eq!(ctx.surface_size(), None);
        assert_eq!(win.stats.snapshot().surfaces_destroyed, 1);
    }

    #[test]
    fn test_release_frees_everything() {
        let win = window(4, 4);
        {
            let mut ctx = create_context(
                SoftwareOptions {
                    native_srgb: false,
                    ..Default::default()
                },
                win.clone(),
                VsyncPolicy::Auto,
            )
            .unwrap();
            ctx.make_current().unwrap();
            ctx.release();
            ctx.release();
        }
        let stats = win.stats.snapshot();
        assert_eq!(stats.contexts_released, 1);
        assert_eq!(stats.surfaces_created, stats.surfaces_destroyed);
        assert_eq!(stats.offscreens_created, stats.offscreens_destroyed);
    }
}
