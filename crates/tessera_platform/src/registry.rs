//! Window registry
//!
//! Maps native handles to window state. Native callbacks identify their
//! window by one of several handles (a surface, a toplevel, a winit
//! `WindowId`), so a window is stored once in an arena and any number of
//! handles alias its key.

use crate::error::{PlatformError, Result};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

new_key_type! {
    /// Handle to a registered window
    pub struct WindowKey;
}

/// Native handle → window map, owned by the event loop thread
pub struct WindowRegistry<H, W> {
    windows: SlotMap<WindowKey, W>,
    handles: HashMap<H, WindowKey>,
}

impl<H: Hash + Eq + Clone, W> WindowRegistry<H, W> {
    pub fn new() -> Self {
        Self {
            windows: SlotMap::with_key(),
            handles: HashMap::new(),
        }
    }

    /// Register a window under its primary native handle
    pub fn insert(&mut self, handle: H, window: W) -> WindowKey {
        let key = self.windows.insert(window);
        self.handles.insert(handle, key);
        key
    }

    /// Make `handle` resolve to an already registered window.
    ///
    /// Returns false if `key` is not registered.
    pub fn alias(&mut self, handle: H, key: WindowKey) -> bool {
        if !self.windows.contains_key(key) {
            return false;
        }
        self.handles.insert(handle, key);
        true
    }

    pub fn key(&self, handle: &H) -> Option<WindowKey> {
        self.handles.get(handle).copied()
    }

    pub fn get(&self, handle: &H) -> Option<&W> {
        self.key(handle).and_then(|k| self.windows.get(k))
    }

    pub fn get_mut(&mut self, handle: &H) -> Option<&mut W> {
        let key = self.key(handle)?;
        self.windows.get_mut(key)
    }

    /// Remove a window and every handle aliasing it
    pub fn remove(&mut self, handle: &H) -> Option<W> {
        let key = self.handles.remove(handle)?;
        self.handles.retain(|_, k| *k != key);
        self.windows.remove(key)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut W> {
        self.windows.values_mut()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl<H: Hash + Eq + Clone, W> Default for WindowRegistry<H, W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide guard for backends that support one live window.
///
/// The slot is released when the guard drops.
#[derive(Debug)]
pub struct SingleWindowGuard {
    slot: &'static AtomicBool,
}

impl SingleWindowGuard {
    /// Claim the slot, failing with [`PlatformError::MultipleWindows`] if a
    /// window already holds it
    pub fn acquire(slot: &'static AtomicBool) -> Result<Self> {
        if slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PlatformError::MultipleWindows);
        }
        Ok(Self { slot })
    }
}

impl Drop for SingleWindowGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}
