//! Headless input conversion
//!
//! Pointer buttons are posted as Linux input event codes, as a compositor
//! would deliver them.

use tessera_platform::Buttons;

/// `BTN_LEFT`
pub const BTN_LEFT: u32 = 0x110;
/// `BTN_RIGHT`
pub const BTN_RIGHT: u32 = 0x111;
/// `BTN_MIDDLE`
pub const BTN_MIDDLE: u32 = 0x112;

/// Convert an input event code to a button flag
pub fn convert_button(code: u32) -> Option<Buttons> {
    match code {
        BTN_LEFT => Some(Buttons::PRIMARY),
        BTN_RIGHT => Some(Buttons::SECONDARY),
        BTN_MIDDLE => Some(Buttons::TERTIARY),
        _ => None,
    }
}
