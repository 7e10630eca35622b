//! Recording toggle shared between the button handler and the main loop.
//!
//! The producer side (button edge handler) only ever flips the flag. The
//! consumer side (recording controller) only reads it, once per tick. Two
//! flips between reads cancel out, which is the intended behavior of a
//! toggle button.

use portable_atomic::{AtomicBool, Ordering};

/// Single-slot, interrupt-safe toggle flag.
///
/// `true` means recording has been requested.
pub struct ToggleSignal {
    requested: AtomicBool,
}

impl ToggleSignal {
    /// Creates a signal in the "not recording" position.
    ///
    /// `const` so it can back a `static` shared with an interrupt context.
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    /// Inverts the flag and returns the new value.
    ///
    /// Safe to call from interrupt or task context; the read-modify-write is
    /// atomic with respect to [`ToggleSignal::is_set`].
    pub fn toggle(&self) -> bool {
        !self.requested.fetch_not(Ordering::AcqRel)
    }

    /// Current requested state.
    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

impl Default for ToggleSignal {
    fn default() -> Self {
        Self::new()
    }
}
