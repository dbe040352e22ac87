//! GPU context lifecycle
//!
//! [`SurfaceContext`] sequences a backend's native surface through creation,
//! resize, presentation, loss and release. Backends only implement the
//! primitive steps of [`ContextBackend`]; the ordering rules live here:
//!
//! - `make_current` rebinds only when the drawable or its size changed.
//!   A rebind finishes outstanding GPU work, destroys the old surface,
//!   creates the new one (retrying without sRGB if refused), applies the
//!   presentation interval and refreshes the sRGB emulation target.
//! - `present` blits the emulation target if any, then swaps. Transient
//!   failures are absorbed; device loss is sticky until `release`.
//! - `release` tears down offscreen, surface and context, in that order.

use crate::config::VsyncPolicy;
use crate::error::{PlatformError, Result};
use crate::srgb::{ColorCorrection, OffscreenFormat, SrgbEmulation};
use std::any::Any;
use std::fmt::Debug;

/// Lifecycle state of a GPU context
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// Context exists, no surface was ever bound
    Created,
    /// No native drawable is available (window hidden or zero sized)
    SurfaceUnbound,
    /// Surface bound and ready to render
    SurfaceBound,
    /// A frame was presented
    Presenting,
    /// The device was lost; only `release` is valid
    Lost,
    /// Released; no further use
    Released,
}

/// Classified presentation failure, reported by backends
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentError {
    /// The frame was dropped (occluded window, acquire timeout)
    Ignorable,
    /// The surface no longer matches the drawable and must be rebuilt
    Outdated,
    /// The device or context is gone
    DeviceLost(String),
    /// Anything else
    Other(String),
}

/// Native API generation a context was created with
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
    /// Reduced feature level for older drivers
    V2,
    /// Full feature level
    V3,
}

impl ApiVersion {
    /// Preferred order of context creation attempts
    pub const FALLBACK_ORDER: [ApiVersion; 2] = [ApiVersion::V3, ApiVersion::V2];
}

/// Try to create a context at each API version in [`ApiVersion::FALLBACK_ORDER`].
///
/// Returns the first success with the version that produced it, or the last
/// error.
pub fn with_version_fallback<T>(
    mut create: impl FnMut(ApiVersion) -> Result<T>,
) -> Result<(T, ApiVersion)> {
    let mut last_err = None;
    for version in ApiVersion::FALLBACK_ORDER {
        match create(version) {
            Ok(ctx) => return Ok((ctx, version)),
            Err(e) => {
                tracing::debug!(?version, error = %e, "context creation failed");
                last_err = Some(e);
            }
        }
    }
    Err(match last_err {
        Some(e) => e,
        None => PlatformError::ResourceUnavailable("no API version available".to_string()),
    })
}

/// Primitive operations of a native GPU surface API
pub trait ContextBackend {
    /// Identity of a native drawable (window, wl_surface, ...)
    type Drawable: Clone + PartialEq + Debug;
    /// Offscreen target used by sRGB emulation
    type Offscreen;

    /// The drawable to render into and its size in pixels, or `None` when
    /// the window currently has no surface
    fn current_drawable(&self) -> Option<(Self::Drawable, u32, u32)>;

    /// Whether sRGB surfaces are supported natively
    fn native_srgb(&self) -> bool;

    /// Whether the platform lacks compositor-driven frame pacing, so the
    /// swap must block on vertical sync
    fn needs_vsync(&self) -> bool;

    /// Block until submitted GPU work has completed
    fn finish(&mut self);

    /// Create and bind a surface for `drawable`
    fn create_surface(
        &mut self,
        drawable: &Self::Drawable,
        width: u32,
        height: u32,
        srgb: bool,
    ) -> Result<()>;

    /// Destroy the bound surface
    fn destroy_surface(&mut self);

    fn set_swap_interval(&mut self, vsync: bool);

    /// Acquire the image for the next frame
    fn begin_frame(&mut self) -> std::result::Result<(), PresentError> {
        Ok(())
    }

    /// Present the current image
    fn swap(&mut self) -> std::result::Result<(), PresentError>;

    fn create_offscreen(
        &mut self,
        width: u32,
        height: u32,
        format: OffscreenFormat,
    ) -> Result<Self::Offscreen>;

    /// Clear the offscreen to `gray` and read back pixel (0, 0) as RGBA8
    fn probe_offscreen(&mut self, offscreen: &Self::Offscreen, gray: f32) -> Result<[u8; 4]>;

    /// Draw the offscreen into the current image, applying the sRGB encode
    fn blit_offscreen(&mut self, offscreen: &Self::Offscreen, format: OffscreenFormat)
        -> Result<()>;

    /// Hint that the offscreen contents are no longer needed
    fn invalidate_offscreen(&mut self, _offscreen: &Self::Offscreen) {}

    fn destroy_offscreen(&mut self, offscreen: Self::Offscreen);

    /// Whether the device was lost outside a present call
    fn is_lost(&self) -> bool {
        false
    }

    /// Destroy the native context
    fn release(&mut self);

    fn lock(&mut self) -> Result<()> {
        Ok(())
    }

    fn unlock(&mut self) {}
}

/// The context handed to applications
pub trait GpuContext: Any {
    /// Bind the window's surface for rendering, rebuilding it if the window
    /// changed since the last call
    fn make_current(&mut self) -> Result<()>;

    /// Present the rendered frame.
    ///
    /// # Panics
    ///
    /// Panics if no surface is bound.
    fn present(&mut self) -> Result<()>;

    /// Release all native resources. Idempotent.
    fn release(&mut self);

    /// Acquire the platform lock around rendering, on backends that need one
    fn lock(&mut self) -> Result<()> {
        Ok(())
    }

    fn unlock(&mut self) {}

    fn state(&self) -> ContextState;

    fn color_correction(&self) -> ColorCorrection;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Surface lifecycle state machine over a [`ContextBackend`]
pub struct SurfaceContext<B: ContextBackend> {
    backend: B,
    state: ContextState,
    bound: Option<(B::Drawable, u32, u32)>,
    srgb: Option<SrgbEmulation<B::Offscreen>>,
    correction: ColorCorrection,
    vsync: VsyncPolicy,
    force_rebind: bool,
    lost: Option<String>,
}

impl<B: ContextBackend> SurfaceContext<B> {
    pub fn new(backend: B, vsync: VsyncPolicy) -> Self {
        let correction = if backend.native_srgb() {
            ColorCorrection::NativeSrgb
        } else {
            ColorCorrection::EmulatedSrgbBlit
        };
        tracing::info!(?correction, "GPU context created");
        Self {
            backend,
            state: ContextState::Created,
            bound: None,
            srgb: None,
            correction,
            vsync,
            force_rebind: false,
            lost: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The emulation offscreen, when the application must render into it
    /// instead of the surface image
    pub fn offscreen_target(&self) -> Option<&B::Offscreen> {
        match self.correction {
            ColorCorrection::EmulatedSrgbBlit => self.srgb.as_ref().and_then(|s| s.offscreen()),
            _ => None,
        }
    }

    /// Format of the emulation offscreen, if emulating
    pub fn offscreen_format(&self) -> Option<OffscreenFormat> {
        match self.correction {
            ColorCorrection::EmulatedSrgbBlit => self.srgb.as_ref().map(|s| s.format()),
            _ => None,
        }
    }

    fn check_usable(&mut self) -> Result<()> {
        match self.state {
            ContextState::Released => Err(PlatformError::ContextReleased),
            ContextState::Lost => Err(PlatformError::DeviceLost(
                self.lost.clone().unwrap_or_default(),
            )),
            _ if self.backend.is_lost() => Err(self.mark_lost("device lost".to_string())),
            _ => Ok(()),
        }
    }

    fn mark_lost(&mut self, reason: String) -> PlatformError {
        tracing::error!(%reason, "GPU device lost");
        self.state = ContextState::Lost;
        self.lost = Some(reason.clone());
        PlatformError::DeviceLost(reason)
    }

    fn absorb(&mut self, err: PresentError) -> Result<()> {
        match err {
            PresentError::Ignorable => {
                tracing::trace!("frame dropped");
                Ok(())
            }
            PresentError::Outdated => {
                tracing::debug!("surface outdated, rebinding on next frame");
                self.force_rebind = true;
                Ok(())
            }
            PresentError::DeviceLost(reason) => Err(self.mark_lost(reason)),
            PresentError::Other(reason) => Err(PlatformError::Present(reason)),
        }
    }

    fn unbind(&mut self) {
        if self.bound.take().is_some() {
            self.backend.finish();
            if let Some(srgb) = self.srgb.as_mut() {
                srgb.release(&mut self.backend);
            }
            self.backend.destroy_surface();
        }
    }

    fn rebind(&mut self, drawable: B::Drawable, width: u32, height: u32) -> Result<()> {
        tracing::debug!(?drawable, width, height, "binding surface");
        if self.bound.take().is_some() {
            self.backend.finish();
            self.backend.destroy_surface();
        }

        let mut srgb = self.correction == ColorCorrection::NativeSrgb;
        if let Err(e) = self.backend.create_surface(&drawable, width, height, srgb) {
            if !srgb {
                return Err(e);
            }
            tracing::debug!(error = %e, "sRGB surface refused, retrying without sRGB");
            srgb = false;
            self.backend.create_surface(&drawable, width, height, false)?;
            self.correction = ColorCorrection::EmulatedSrgbBlit;
        }

        let vsync = self.vsync.resolve(self.backend.needs_vsync());
        self.backend.set_swap_interval(vsync);
        self.bound = Some((drawable, width, height));
        self.force_rebind = false;

        if !srgb && self.correction == ColorCorrection::EmulatedSrgbBlit {
            let emulation = self.srgb.get_or_insert_with(SrgbEmulation::new);
            if let Err(e) = emulation.refresh(&mut self.backend, width, height) {
                tracing::warn!(error = %e, "sRGB emulation unavailable, colors will not be gamma corrected");
                emulation.release(&mut self.backend);
                self.srgb = None;
                self.correction = ColorCorrection::None;
            }
        }
        Ok(())
    }

    /// See [`GpuContext::make_current`]
    pub fn make_current(&mut self) -> Result<()> {
        self.check_usable()?;
        let Some((drawable, width, height)) = self
            .backend
            .current_drawable()
            .filter(|(_, w, h)| *w > 0 && *h > 0)
        else {
            self.unbind();
            self.state = ContextState::SurfaceUnbound;
            return Ok(());
        };

        let unchanged = matches!(
            &self.bound,
            Some((d, w, h)) if *d == drawable && *w == width && *h == height
        );
        if self.force_rebind || !unchanged {
            self.rebind(drawable.clone(), width, height)?;
        }

        if let Err(err) = self.backend.begin_frame() {
            if err == PresentError::Outdated {
                // One retry with a fresh surface.
                self.rebind(drawable, width, height)?;
                if let Err(err) = self.backend.begin_frame() {
                    self.absorb(err)?;
                }
            } else {
                self.absorb(err)?;
            }
        }
        self.state = ContextState::SurfaceBound;
        Ok(())
    }

    /// See [`GpuContext::present`]
    pub fn present(&mut self) -> Result<()> {
        match self.state {
            ContextState::Created | ContextState::SurfaceUnbound => {
                panic!("present called without a bound surface")
            }
            _ => self.check_usable()?,
        }
        self.state = ContextState::Presenting;
        if self.correction == ColorCorrection::EmulatedSrgbBlit {
            if let Some(srgb) = self.srgb.as_mut() {
                srgb.blit(&mut self.backend)?;
            }
        }
        match self.backend.swap() {
            Ok(()) => Ok(()),
            Err(err) => self.absorb(err),
        }
    }

    /// See [`GpuContext::release`]
    pub fn release(&mut self) {
        if self.state == ContextState::Released {
            return;
        }
        let lost = self.state == ContextState::Lost;
        if let Some(mut srgb) = self.srgb.take() {
            srgb.release(&mut self.backend);
        }
        if self.bound.take().is_some() {
            if !lost {
                self.backend.finish();
            }
            self.backend.destroy_surface();
        }
        self.backend.release();
        self.state = ContextState::Released;
        tracing::debug!("GPU context released");
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn color_correction(&self) -> ColorCorrection {
        self.correction
    }
}

impl<B: ContextBackend> Drop for SurfaceContext<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: ContextBackend + 'static> GpuContext for SurfaceContext<B> {
    fn make_current(&mut self) -> Result<()> {
        SurfaceContext::make_current(self)
    }

    fn present(&mut self) -> Result<()> {
        SurfaceContext::present(self)
    }

    fn release(&mut self) {
        SurfaceContext::release(self)
    }

    fn lock(&mut self) -> Result<()> {
        self.backend.lock()
    }

    fn unlock(&mut self) {
        self.backend.unlock()
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn color_correction(&self) -> ColorCorrection {
        self.correction
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
