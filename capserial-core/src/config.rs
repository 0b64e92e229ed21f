//! Link configuration types

use capserial_hal::{FrameFormat, PinId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flow::FlowControl;

/// Default receive pin (timer capture input)
pub const DEFAULT_RXD: PinId = PinId(8);

/// Default transmit pin
pub const DEFAULT_TXD: PinId = PinId(9);

/// Data pins of the link
///
/// `rxd` must be the pin wired to the timer's capture input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataPins {
    /// Receive data input
    pub rxd: PinId,
    /// Transmit data output
    pub txd: PinId,
}

impl DataPins {
    /// Create a data pin pair
    pub const fn new(rxd: PinId, txd: PinId) -> Self {
        Self { rxd, txd }
    }

    /// Check if `pin` is one of the data pins
    pub fn contains(&self, pin: PinId) -> bool {
        pin == self.rxd || pin == self.txd
    }
}

impl Default for DataPins {
    fn default() -> Self {
        Self::new(DEFAULT_RXD, DEFAULT_TXD)
    }
}

/// Everything `begin` needs besides the baud rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Frame format; only 8N1 is accepted
    pub format: FrameFormat,
    /// Data pins
    pub pins: DataPins,
    /// RTS/CTS flow control
    pub flow: FlowControl,
}

impl LinkConfig {
    /// 8N1 on the default pins without flow control
    pub const fn new() -> Self {
        Self {
            format: FrameFormat::SERIAL_8N1,
            pins: DataPins::new(DEFAULT_RXD, DEFAULT_TXD),
            flow: FlowControl::new(),
        }
    }

    /// Use a different frame format
    pub const fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    /// Use different data pins
    pub const fn with_pins(mut self, pins: DataPins) -> Self {
        self.pins = pins;
        self
    }

    /// Use the given flow control
    pub const fn with_flow(mut self, flow: FlowControl) -> Self {
        self.flow = flow;
        self
    }

    /// Check the frame format and pin assignment
    ///
    /// RXD and TXD must differ; flow-control pins are checked by
    /// [`FlowControl::validate`].
    ///
    /// The baud rate is checked separately by the timing calculator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format != FrameFormat::SERIAL_8N1 {
            return Err(ConfigError::UnsupportedFrame);
        }
        if self.pins.rxd == self.pins.txd {
            return Err(ConfigError::PinConflict);
        }
        self.flow.validate(&self.pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capserial_hal::uart::{DataBits, Parity, StopBits};

    #[test]
    fn test_default_config_is_valid() {
        let config = LinkConfig::default();
        assert_eq!(config, LinkConfig::new());
        assert_eq!(config.pins.rxd, PinId(8));
        assert_eq!(config.pins.txd, PinId(9));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_only_8n1_accepted() {
        let formats = [
            FrameFormat::new(DataBits::Seven, Parity::None, StopBits::One),
            FrameFormat::new(DataBits::Eight, Parity::Even, StopBits::One),
            FrameFormat::new(DataBits::Eight, Parity::None, StopBits::Two),
        ];
        for format in formats {
            let config = LinkConfig::new().with_format(format);
            assert_eq!(config.validate(), Err(ConfigError::UnsupportedFrame));
        }
    }

    #[test]
    fn test_shared_data_pin_rejected() {
        let config = LinkConfig::new().with_pins(DataPins::new(PinId(3), PinId(3)));
        assert_eq!(config.validate(), Err(ConfigError::PinConflict));

        let swapped = LinkConfig::new().with_pins(DataPins::new(DEFAULT_TXD, DEFAULT_RXD));
        assert_eq!(swapped.validate(), Ok(()));
    }
}
