//! Capture timer abstraction
//!
//! A 16-bit free-running counter whose input-capture unit latches the
//! counter value on a falling edge of the receive pin and raises the
//! capture interrupt.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counter clock divider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
}

impl Prescaler {
    /// All dividers, smallest first
    pub const ALL: [Prescaler; 3] = [Prescaler::Div1, Prescaler::Div8, Prescaler::Div64];

    /// Division factor applied to the CPU clock
    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
        }
    }
}

/// Free-running timer with input capture
///
/// Methods take `&self` where the hardware register read has no side
/// effect, so spin loops can poll without exclusive access.
pub trait CaptureTimer {
    /// Start the counter in normal (free-running) mode
    ///
    /// Selects the clock divider, arms falling-edge capture on the receive
    /// pin, clears any pending capture and enables the capture interrupt.
    fn start(&mut self, prescaler: Prescaler);

    /// Current counter value
    fn counter(&self) -> u16;

    /// Overwrite the counter
    fn set_counter(&mut self, ticks: u16);

    /// Counter value latched by the last capture event
    fn captured(&self) -> u16;

    /// Check if a capture event is pending (interrupt flag set)
    fn capture_pending(&self) -> bool;

    /// Clear the pending capture flag
    fn clear_capture(&mut self);

    /// Restart the counter at the captured edge
    ///
    /// After this call the counter reads the number of ticks elapsed since
    /// the capture event.
    fn rebase_to_capture(&mut self) {
        let elapsed = self.counter().wrapping_sub(self.captured());
        self.set_counter(elapsed);
    }

    /// Spin until the counter reaches `ticks`
    fn wait_until(&self, ticks: u16) {
        while self.counter() < ticks {
            core::hint::spin_loop();
        }
    }
}
