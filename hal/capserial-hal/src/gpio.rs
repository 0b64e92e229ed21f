//! GPIO abstractions
//!
//! The link addresses its pins by number so the configuration can be
//! validated (RTS/CTS must not collide with each other or with RXD/TXD)
//! before any pin is touched.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Digital pin number as used by the board's pin map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinId(pub u8);

impl PinId {
    /// Raw pin number
    pub const fn number(self) -> u8 {
        self.0
    }
}

/// Electrical level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Check if the level is high
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Check if the level is low
    pub const fn is_low(self) -> bool {
        !self.is_high()
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
}

/// Pin-level digital I/O
///
/// Implementations map pin numbers onto port registers. Writes to an
/// output must take effect immediately: the transmit engine relies on the
/// level changing at the instant of the call.
pub trait DigitalIo {
    /// Set the direction of a pin
    fn set_mode(&mut self, pin: PinId, mode: PinMode);

    /// Drive an output pin to the given level
    fn set_level(&mut self, pin: PinId, level: Level);

    /// Read the current level of a pin
    fn level(&self, pin: PinId) -> Level;

    /// Drive an output pin high
    fn set_high(&mut self, pin: PinId) {
        self.set_level(pin, Level::High);
    }

    /// Drive an output pin low
    fn set_low(&mut self, pin: PinId) {
        self.set_level(pin, Level::Low);
    }

    /// Check if a pin reads high
    fn is_high(&self, pin: PinId) -> bool {
        self.level(pin).is_high()
    }
}
