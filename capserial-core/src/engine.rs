//! Transmit and receive engines
//!
//! Both engines run off the same free-running counter:
//!
//! - Transmit resets the counter to zero, drives TXD for each bit and
//!   spins until the counter reaches that bit's output instant. It runs
//!   with interrupts masked so nothing can stretch a bit.
//! - Receive runs from the capture interrupt. It rebases the counter to
//!   the captured start edge, then spins to each sampling instant and
//!   reads RXD.
//!
//! Because transmit masks the capture interrupt, a start edge that
//! arrives mid-transmit is only noticed after the frame. It is reported as
//! [`ErrorCode::ReceiveConflict`] and dropped.

use capserial_hal::{CaptureTimer, DigitalIo, Level, PinMode};

use crate::config::LinkConfig;
use crate::ring::RxRing;
use crate::status::{ErrorCode, Status};
use crate::timing::{FrameTiming, STOP_BIT};

/// Bit index after which the receive engine re-evaluates auto-RTS
const RTS_CHECK_BIT: usize = 4;

/// Bit index after which the payload is complete (last data bit)
const LAST_DATA_BIT: usize = 8;

/// Frame accumulator mask for the start bit, once all ten bits are in
const START_MASK: u16 = 1;

/// Frame accumulator mask for the stop bit, once all ten bits are in
const STOP_MASK: u16 = 1 << STOP_BIT;

/// Hardware and configuration owned by one link
///
/// The link keeps this behind a critical-section mutex; every method here
/// expects to run with interrupts masked.
pub struct Engine<T, D> {
    timer: T,
    io: D,
    config: LinkConfig,
    timing: Option<FrameTiming>,
}

impl<T: CaptureTimer, D: DigitalIo> Engine<T, D> {
    /// Wrap the timer and pin bank; the engine starts unconfigured
    pub const fn new(timer: T, io: D) -> Self {
        Self {
            timer,
            io,
            config: LinkConfig::new(),
            timing: None,
        }
    }

    /// Active timing, if configured
    pub fn timing(&self) -> Option<&FrameTiming> {
        self.timing.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Forget the current configuration
    pub fn deconfigure(&mut self) {
        self.timing = None;
    }

    /// Apply a validated configuration and start the timer
    pub fn configure(&mut self, config: LinkConfig, timing: FrameTiming) {
        let pins = config.pins;
        self.io.set_mode(pins.rxd, PinMode::Input);
        self.io.set_level(pins.txd, Level::High);
        self.io.set_mode(pins.txd, PinMode::Output);
        config.flow.init(&mut self.io);

        self.timer.start(timing.prescaler());

        self.config = config;
        self.timing = Some(timing);
    }

    /// Drive RTS from the receive buffer occupancy
    pub fn auto_rts(&mut self, occupancy: usize, threshold: usize) {
        let flow = self.config.flow;
        flow.auto_rts(&mut self.io, occupancy, threshold);
    }

    /// Negate RTS ahead of a transmit
    pub fn negate_rts(&mut self) {
        let flow = self.config.flow;
        flow.negate_rts(&mut self.io);
    }

    /// Check the peer's CTS line
    pub fn clear_to_send(&self) -> bool {
        self.config.flow.clear_to_send(&self.io)
    }

    /// Send one frame
    ///
    /// Must run with interrupts masked. Returns false if the link is not
    /// configured.
    pub fn transmit(&mut self, byte: u8, status: &Status) -> bool {
        let Some(timing) = self.timing else {
            return false;
        };
        let txd = self.config.pins.txd;

        // stop bit, data LSB first, start bit; shifted out from bit 0
        let mut frame = STOP_MASK | (u16::from(byte) << 1);

        self.timer.set_counter(0);
        for &instant in timing.tx_output_instants() {
            self.io.set_level(txd, Level::from(frame & 1 != 0));
            frame >>= 1;
            self.timer.wait_until(instant);
        }

        if self.timer.capture_pending() {
            // an incoming start edge was masked for too long to decode
            status.record(ErrorCode::ReceiveConflict);
            self.timer.clear_capture();
        }
        true
    }

    /// Service one capture event: sample a frame and queue its payload
    pub fn receive<const N: usize>(&mut self, rx: &RxRing<N>, status: &Status) {
        let Some(timing) = self.timing else {
            self.timer.clear_capture();
            return;
        };
        let rxd = self.config.pins.rxd;

        self.timer.rebase_to_capture();

        let mut frame: u16 = 0;
        for (bit, &instant) in timing.rx_sample_instants().iter().enumerate() {
            self.timer.wait_until(instant);

            frame >>= 1;
            if self.io.is_high(rxd) {
                frame |= STOP_MASK;
            }

            match bit {
                RTS_CHECK_BIT => self.auto_rts(rx.occupancy(), N / 2),
                LAST_DATA_BIT => {
                    // bits 1..=8 hold the start bit and d0..d7 at this point
                    let byte = (frame >> 2) as u8;
                    if rx.push(byte) {
                        status.record(ErrorCode::Overflow);
                    }
                }
                _ => {}
            }
        }

        if frame & START_MASK != 0 && status.is_clear() {
            status.record(ErrorCode::BadStartBit);
        }
        if frame & STOP_MASK == 0 {
            // unconditional: a bad stop bit replaces any earlier fault
            status.overwrite(ErrorCode::BadStopBit);
        }

        self.timer.clear_capture();
    }
}
