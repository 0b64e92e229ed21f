//! RTS/CTS flow-control policy
//!
//! RTS is driven by this side: asserted while the receive buffer has room,
//! negated while a frame is being sent or the buffer is at or above the
//! threshold. CTS is read from the peer and gates every transmit.
//!
//! Both lines share one polarity setting. Active-high is the default;
//! with `inverted` set, "asserted" means electrically low.

use capserial_hal::{DigitalIo, Level, PinId, PinMode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::DataPins;
use crate::error::ConfigError;

/// Default RTS output pin
pub const DEFAULT_RTS: PinId = PinId(10);

/// Default CTS input pin
pub const DEFAULT_CTS: PinId = PinId(11);

/// Flow-control settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowControl {
    /// Drive RTS from receive buffer occupancy
    pub rts_enabled: bool,
    /// Wait for CTS before each transmit
    pub cts_enabled: bool,
    /// RTS and CTS are active-low
    pub inverted: bool,
    /// RTS output pin
    pub rts_pin: PinId,
    /// CTS input pin
    pub cts_pin: PinId,
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowControl {
    /// No flow control, default pins
    pub const fn new() -> Self {
        Self {
            rts_enabled: false,
            cts_enabled: false,
            inverted: false,
            rts_pin: DEFAULT_RTS,
            cts_pin: DEFAULT_CTS,
        }
    }

    /// Enable RTS on `pin`
    pub const fn with_rts(mut self, pin: PinId) -> Self {
        self.rts_enabled = true;
        self.rts_pin = pin;
        self
    }

    /// Enable CTS on `pin`
    pub const fn with_cts(mut self, pin: PinId) -> Self {
        self.cts_enabled = true;
        self.cts_pin = pin;
        self
    }

    /// Make both lines active-low
    pub const fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Check the enabled lines against each other and the data pins
    pub fn validate(&self, data: &DataPins) -> Result<(), ConfigError> {
        let shared = self.rts_enabled && self.cts_enabled && self.rts_pin == self.cts_pin;
        let rts_on_data = self.rts_enabled && data.contains(self.rts_pin);
        let cts_on_data = self.cts_enabled && data.contains(self.cts_pin);
        if shared || rts_on_data || cts_on_data {
            return Err(ConfigError::PinConflict);
        }
        Ok(())
    }

    /// Electrical level meaning "asserted"
    pub const fn asserted_level(&self) -> Level {
        if self.inverted {
            Level::Low
        } else {
            Level::High
        }
    }

    /// Set up the enabled pins; RTS starts asserted
    pub fn init<D: DigitalIo>(&self, io: &mut D) {
        if self.rts_enabled {
            io.set_level(self.rts_pin, self.asserted_level());
            io.set_mode(self.rts_pin, PinMode::Output);
        }
        if self.cts_enabled {
            io.set_mode(self.cts_pin, PinMode::Input);
        }
    }

    /// Assert RTS, if enabled
    pub fn assert_rts<D: DigitalIo>(&self, io: &mut D) {
        if self.rts_enabled {
            io.set_level(self.rts_pin, self.asserted_level());
        }
    }

    /// Negate RTS, if enabled
    pub fn negate_rts<D: DigitalIo>(&self, io: &mut D) {
        if self.rts_enabled {
            io.set_level(self.rts_pin, !self.asserted_level());
        }
    }

    /// Drive RTS from buffer occupancy
    ///
    /// Asserted while `occupancy < threshold`, negated otherwise.
    pub fn auto_rts<D: DigitalIo>(&self, io: &mut D, occupancy: usize, threshold: usize) {
        if occupancy < threshold {
            self.assert_rts(io);
        } else {
            self.negate_rts(io);
        }
    }

    /// Check the peer's CTS line
    ///
    /// Always true when CTS is disabled.
    pub fn clear_to_send<D: DigitalIo>(&self, io: &D) -> bool {
        !self.cts_enabled || io.level(self.cts_pin) == self.asserted_level()
    }
}

/// Bound on the CTS poll before a transmit
pub trait CtsWait {
    /// Called once per negative CTS poll; return false to give up
    fn keep_waiting(&mut self) -> bool;
}

/// Wait for CTS forever
#[derive(Debug, Clone, Copy, Default)]
pub struct Forever;

impl CtsWait for Forever {
    fn keep_waiting(&mut self) -> bool {
        true
    }
}

/// Give up after a number of negative CTS polls
#[derive(Debug, Clone, Copy)]
pub struct MaxPolls(pub u32);

impl CtsWait for MaxPolls {
    fn keep_waiting(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(left) => {
                self.0 = left;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capserial_hal_sim::SimBoard;

    const RTS: PinId = DEFAULT_RTS;
    const CTS: PinId = DEFAULT_CTS;

    #[test]
    fn test_rts_cts_sharing_pin_rejected() {
        let flow = FlowControl::new().with_rts(PinId(5)).with_cts(PinId(5));
        assert_eq!(flow.validate(&DataPins::default()), Err(ConfigError::PinConflict));

        // sharing is fine while one of them is disabled
        let mut flow = flow;
        flow.cts_enabled = false;
        assert_eq!(flow.validate(&DataPins::default()), Ok(()));
    }

    #[test]
    fn test_flow_pins_on_data_pins_rejected() {
        let data = DataPins::default();
        for pin in [data.rxd, data.txd] {
            let rts = FlowControl::new().with_rts(pin);
            assert_eq!(rts.validate(&data), Err(ConfigError::PinConflict));
            let cts = FlowControl::new().with_cts(pin);
            assert_eq!(cts.validate(&data), Err(ConfigError::PinConflict));
        }
        // disabled lines are not checked
        let mut flow = FlowControl::new();
        flow.rts_pin = data.rxd;
        assert_eq!(flow.validate(&data), Ok(()));
    }

    #[test]
    fn test_auto_rts_sweep_both_polarities() {
        const CAPACITY: usize = 16;
        const THRESHOLD: usize = CAPACITY / 2;

        for flow in [
            FlowControl::new().with_rts(RTS),
            FlowControl::new().with_rts(RTS).inverted(),
        ] {
            let board = SimBoard::new();
            let mut io = board.io();
            for occupancy in 0..=CAPACITY {
                flow.auto_rts(&mut io, occupancy, THRESHOLD);
                let asserted = board.pin_level(RTS) == flow.asserted_level();
                assert_eq!(asserted, occupancy < THRESHOLD, "occupancy {occupancy}");
            }
        }
    }

    #[test]
    fn test_rts_disabled_leaves_pin_alone() {
        let board = SimBoard::new();
        let mut io = board.io();
        board.drive(RTS, Level::Low);
        FlowControl::new().auto_rts(&mut io, 0, 8);
        assert_eq!(board.pin_level(RTS), Level::Low);
    }

    #[test]
    fn test_clear_to_send_polarity() {
        let board = SimBoard::new();
        let io = board.io();
        let normal = FlowControl::new().with_cts(CTS);
        let inverted = normal.inverted();

        board.drive(CTS, Level::High);
        assert!(normal.clear_to_send(&io));
        assert!(!inverted.clear_to_send(&io));

        board.drive(CTS, Level::Low);
        assert!(!normal.clear_to_send(&io));
        assert!(inverted.clear_to_send(&io));

        assert!(FlowControl::new().clear_to_send(&io));
    }

    #[test]
    fn test_init_asserts_rts() {
        let board = SimBoard::new();
        let mut io = board.io();
        FlowControl::new().with_rts(RTS).with_cts(CTS).inverted().init(&mut io);
        assert_eq!(board.pin_mode(RTS), PinMode::Output);
        assert_eq!(board.pin_level(RTS), Level::Low);
        assert_eq!(board.pin_mode(CTS), PinMode::Input);
    }

    #[test]
    fn test_max_polls() {
        let mut wait = MaxPolls(2);
        assert!(wait.keep_waiting());
        assert!(wait.keep_waiting());
        assert!(!wait.keep_waiting());
        assert!(Forever.keep_waiting());
    }
}
