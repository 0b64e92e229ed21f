//! The software serial link
//!
//! [`SoftSerial`] owns the hardware (inside a critical-section mutex), the
//! receive ring and the status register. All methods take `&self`, so a
//! link normally lives in a `static` and is handed to the platform's
//! capture interrupt with [`SoftSerial::attach`].
//!
//! ```ignore
//! static SERIAL: SoftSerial<Tc1, PortPins> = SoftSerial::new(F_CPU, Tc1::new(), PortPins::new());
//!
//! SERIAL.attach(&mut irq);
//! SERIAL.begin(115_200, FrameFormat::SERIAL_8N1, None, None)?;
//! SERIAL.write(b'A');
//! ```

use core::cell::RefCell;

use capserial_hal::{CaptureHandler, CaptureInterrupt, CaptureTimer, DigitalIo, FrameFormat, PinId};
use critical_section::Mutex;

use crate::config::LinkConfig;
use crate::engine::Engine;
use crate::error::ConfigError;
use crate::flow::{CtsWait, FlowControl, Forever};
use crate::ring::RxRing;
use crate::status::{ErrorCode, Status};
use crate::timing::FrameTiming;
use crate::DEFAULT_RX_CAPACITY;

/// Software UART on one capture timer
pub struct SoftSerial<T, D, const N: usize = DEFAULT_RX_CAPACITY> {
    cpu_hz: u32,
    engine: Mutex<RefCell<Engine<T, D>>>,
    rx: RxRing<N>,
    status: Status,
}

impl<T, D, const N: usize> SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    /// Create an unconfigured link for a CPU clocked at `cpu_hz`
    pub const fn new(cpu_hz: u32, timer: T, io: D) -> Self {
        Self {
            cpu_hz,
            engine: Mutex::new(RefCell::new(Engine::new(timer, io))),
            rx: RxRing::new(),
            status: Status::new(),
        }
    }

    /// Configure the link
    ///
    /// `rts_pin` / `cts_pin` enable the corresponding flow-control line on
    /// the given pin; `None` leaves it disabled.
    pub fn begin(
        &self,
        baud_rate: u32,
        format: FrameFormat,
        rts_pin: Option<PinId>,
        cts_pin: Option<PinId>,
    ) -> Result<(), ConfigError> {
        let mut flow = FlowControl::new();
        if let Some(pin) = rts_pin {
            flow = flow.with_rts(pin);
        }
        if let Some(pin) = cts_pin {
            flow = flow.with_cts(pin);
        }
        self.begin_with(baud_rate, LinkConfig::new().with_format(format).with_flow(flow))
    }

    /// Configure the link from a full [`LinkConfig`]
    ///
    /// On failure the link is left unusable and the sticky status holds
    /// the configuration error until the next successful call.
    pub fn begin_with(&self, baud_rate: u32, config: LinkConfig) -> Result<(), ConfigError> {
        let result = FrameTiming::compute(self.cpu_hz, baud_rate)
            .and_then(|timing| config.validate().map(|()| timing));

        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            engine.deconfigure();
            match result {
                Ok(timing) => {
                    self.rx.reset();
                    self.status.clear();
                    engine.configure(config, timing);
                    #[cfg(feature = "defmt")]
                    defmt::debug!(
                        "soft serial: {} baud, prescaler {}, {} ticks/frame",
                        baud_rate,
                        timing.prescaler().divisor(),
                        timing.ticks_per_frame()
                    );
                }
                Err(err) => {
                    self.status.overwrite(err.into());
                    #[cfg(feature = "defmt")]
                    defmt::warn!("soft serial: rejected configuration: {}", err);
                }
            }
        });
        result.map(|_| ())
    }

    /// Register this link as the capture interrupt handler
    pub fn attach<I: CaptureInterrupt>(&'static self, irq: &mut I)
    where
        Self: CaptureHandler,
    {
        irq.register(self);
    }

    /// Number of received bytes waiting
    pub fn available(&self) -> usize {
        let count = self.rx.occupancy();
        self.auto_rts(self.default_threshold());
        count
    }

    /// Oldest received byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        let byte = self.rx.peek();
        self.auto_rts(self.default_threshold());
        byte
    }

    /// Take the oldest received byte
    pub fn read(&self) -> Option<u8> {
        let byte = self.rx.pop();
        self.auto_rts(self.default_threshold());
        byte
    }

    /// Send one byte, waiting for CTS as long as it takes
    ///
    /// Returns the number of bytes sent: 1, or 0 if the link is not
    /// configured.
    pub fn write(&self, byte: u8) -> usize {
        self.write_until(byte, &mut Forever)
    }

    /// Send one byte, waiting for CTS as long as `wait` allows
    ///
    /// Returns 0 without touching the line if the link is not configured
    /// or `wait` gives up.
    pub fn write_until<W: CtsWait>(&self, byte: u8, wait: &mut W) -> usize {
        if !self.is_configured() {
            return 0;
        }

        while !self.can_write() {
            if !wait.keep_waiting() {
                return 0;
            }
            core::hint::spin_loop();
        }

        // masks interrupts for one frame; restores the previous state on exit
        let sent = critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            engine.negate_rts();
            engine.transmit(byte, &self.status)
        });

        self.auto_rts(self.default_threshold());
        usize::from(sent)
    }

    /// Nothing is buffered on the transmit side
    pub fn flush(&self) {}

    /// Check the peer's CTS line right now
    ///
    /// Always true when CTS flow control is disabled.
    pub fn can_write(&self) -> bool {
        critical_section::with(|cs| self.engine.borrow_ref(cs).clear_to_send())
    }

    /// [`can_write`](Self::can_write) as a byte count
    pub fn available_for_write(&self) -> usize {
        usize::from(self.can_write())
    }

    /// Drive RTS from the current buffer occupancy
    ///
    /// Asserted while fewer than `threshold` bytes are waiting.
    pub fn auto_rts(&self, threshold: usize) {
        critical_section::with(|cs| {
            let occupancy = self.rx.occupancy();
            self.engine.borrow_ref_mut(cs).auto_rts(occupancy, threshold);
        });
    }

    /// Default auto-RTS threshold: half the buffer
    pub const fn default_threshold(&self) -> usize {
        N / 2
    }

    /// Check if `begin` succeeded and no fault has been recorded since
    pub fn is_operational(&self) -> bool {
        self.status.is_clear() && self.is_configured()
    }

    /// Check if `begin` succeeded
    pub fn is_configured(&self) -> bool {
        critical_section::with(|cs| self.engine.borrow_ref(cs).timing().is_some())
    }

    /// Sticky error code
    pub fn error(&self) -> ErrorCode {
        self.status.get()
    }

    /// Timing derived by the last successful `begin`
    pub fn timing(&self) -> Option<FrameTiming> {
        critical_section::with(|cs| self.engine.borrow_ref(cs).timing().copied())
    }

    /// Active configuration
    pub fn config(&self) -> LinkConfig {
        critical_section::with(|cs| *self.engine.borrow_ref(cs).config())
    }

    /// Receive buffer capacity in bytes (one slot stays unused)
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, D, const N: usize> CaptureHandler for SoftSerial<T, D, N>
where
    T: CaptureTimer + Send,
    D: DigitalIo + Send,
{
    fn on_capture_event(&self) {
        critical_section::with(|cs| {
            self.engine
                .borrow_ref_mut(cs)
                .receive(&self.rx, &self.status);
        });
    }
}
