//! sRGB emulation
//!
//! When the native surface cannot do sRGB conversion, the application renders
//! into an offscreen sRGB-typed target and [`SrgbEmulation::blit`] copies it
//! to the surface through a shader applying the sRGB transfer function.
//!
//! Some drivers convert twice when an sRGB texture is both rendered to and
//! sampled. The first allocation runs a self-test: the offscreen is cleared
//! to 0.5 gray and one pixel is read back. A correct sRGB store reads ~188; a
//! double-converting driver reads 128, in which case the offscreen switches
//! to an unmanaged RGBA format and the blit shader does the only conversion.

use crate::context::ContextBackend;
use crate::error::Result;

/// Clear value used by the self-test
pub const SELF_TEST_CLEAR: f32 = 0.5;

/// Red byte read back from a double-converting driver
pub const DOUBLE_CORRECTED_SIGNATURE: u8 = 128;

/// How a context gets gamma-correct output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorCorrection {
    /// The surface itself is sRGB
    NativeSrgb,
    /// Offscreen target blitted through an encoding shader
    EmulatedSrgbBlit,
    /// No correction; colors are presented as written
    None,
}

/// Format of the emulation offscreen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OffscreenFormat {
    /// sRGB-typed texture; the hardware encodes on write
    #[default]
    Srgb,
    /// Plain RGBA; values are stored linear
    Unmanaged,
}

/// sRGB transfer function, linear → encoded
pub fn srgb_encode(linear: f32) -> f32 {
    if linear < 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Inverse sRGB transfer function, encoded → linear
pub fn srgb_decode(encoded: f32) -> f32 {
    if encoded <= 0.040_45 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

/// Quantize a unit float to a byte
pub fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Whether a self-test readback shows double conversion
pub fn is_double_corrected(pixel: [u8; 4]) -> bool {
    pixel[0] == DOUBLE_CORRECTED_SIGNATURE
}

/// Offscreen target and blit state for one context
#[derive(Debug)]
pub struct SrgbEmulation<O> {
    offscreen: Option<O>,
    size: (u32, u32),
    format: OffscreenFormat,
    tested: bool,
}

impl<O> SrgbEmulation<O> {
    pub fn new() -> Self {
        Self {
            offscreen: None,
            size: (0, 0),
            format: OffscreenFormat::Srgb,
            tested: false,
        }
    }

    /// Reallocate the offscreen for a new surface size.
    ///
    /// A zero size leaves the target unallocated.
    pub fn refresh<B>(&mut self, backend: &mut B, width: u32, height: u32) -> Result<()>
    where
        B: ContextBackend<Offscreen = O>,
    {
        if self.offscreen.is_some() && self.size == (width, height) {
            return Ok(());
        }
        if let Some(old) = self.offscreen.take() {
            backend.destroy_offscreen(old);
        }
        self.size = (width, height);
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut offscreen = backend.create_offscreen(width, height, self.format)?;
        if !self.tested {
            self.tested = true;
            let pixel = match backend.probe_offscreen(&offscreen, SELF_TEST_CLEAR) {
                Ok(pixel) => pixel,
                Err(e) => {
                    backend.destroy_offscreen(offscreen);
                    return Err(e);
                }
            };
            if is_double_corrected(pixel) {
                tracing::debug!(
                    ?pixel,
                    "sRGB offscreen converts twice, switching to unmanaged RGBA"
                );
                backend.destroy_offscreen(offscreen);
                self.format = OffscreenFormat::Unmanaged;
                offscreen = backend.create_offscreen(width, height, self.format)?;
            }
        }
        self.offscreen = Some(offscreen);
        Ok(())
    }

    /// Copy the offscreen into the current surface image, then drop its
    /// contents
    pub fn blit<B>(&mut self, backend: &mut B) -> Result<()>
    where
        B: ContextBackend<Offscreen = O>,
    {
        if let Some(offscreen) = &self.offscreen {
            backend.blit_offscreen(offscreen, self.format)?;
            backend.invalidate_offscreen(offscreen);
        }
        Ok(())
    }

    /// The render target the application draws into
    pub fn offscreen(&self) -> Option<&O> {
        self.offscreen.as_ref()
    }

    pub fn format(&self) -> OffscreenFormat {
        self.format
    }

    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: ContextBackend<Offscreen = O>,
    {
        if let Some(offscreen) = self.offscreen.take() {
            backend.destroy_offscreen(offscreen);
        }
        self.size = (0, 0);
    }
}

impl<O> Default for SrgbEmulation<O> {
    fn default() -> Self {
        Self::new()
    }
}
