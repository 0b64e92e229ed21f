//! Simulated board: counter, capture unit and pin bank
//!
//! All state lives in atomics or critical-section mutexes so a `SimBoard`
//! can be placed in a `static` and shared by the timer, the pin bank and
//! the interrupt dispatcher.

use core::cell::RefCell;

use capserial_hal::{
    CaptureHandler, CaptureInterrupt, CaptureTimer, DigitalIo, Level, PinId, PinMode, Prescaler,
};
use critical_section::Mutex;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::waveform::Waveform;

/// Number of simulated pins
pub const PIN_COUNT: u8 = 32;

/// Sentinel for "no capture scheduled"
const NO_EDGE: u32 = u32::MAX;

/// Input pin that changes level after a number of reads
#[derive(Debug, Clone, Copy)]
struct Script {
    pin: PinId,
    level: Level,
    reads_left: u32,
}

/// Shared simulated board state
pub struct SimBoard {
    counter: AtomicU16,
    step: AtomicU16,
    captured: AtomicU16,
    capture_pending: AtomicBool,
    capture_irq_enabled: AtomicBool,
    /// Divisor of the running prescaler, 0 while stopped
    prescaler: AtomicU8,
    scheduled_edge: AtomicU32,
    levels: AtomicU32,
    outputs: AtomicU32,
    reads: AtomicU32,
    script: Mutex<RefCell<Option<Script>>>,
    line: Mutex<RefCell<Option<(PinId, Waveform)>>>,
    trace: Mutex<RefCell<Option<(PinId, Waveform)>>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    /// Create a board with all pins low, inputs, and a counter that
    /// advances one tick per read
    pub const fn new() -> Self {
        Self {
            counter: AtomicU16::new(0),
            step: AtomicU16::new(1),
            captured: AtomicU16::new(0),
            capture_pending: AtomicBool::new(false),
            capture_irq_enabled: AtomicBool::new(false),
            prescaler: AtomicU8::new(0),
            scheduled_edge: AtomicU32::new(NO_EDGE),
            levels: AtomicU32::new(0),
            outputs: AtomicU32::new(0),
            reads: AtomicU32::new(0),
            script: Mutex::new(RefCell::new(None)),
            line: Mutex::new(RefCell::new(None)),
            trace: Mutex::new(RefCell::new(None)),
        }
    }

    /// Timer view of this board
    pub const fn timer(&self) -> SimTimer<'_> {
        SimTimer { board: self }
    }

    /// Pin bank view of this board
    pub const fn io(&self) -> SimIo<'_> {
        SimIo { board: self }
    }

    /// Set how many ticks the counter advances per read
    pub fn set_counter_step(&self, step: u16) {
        self.step.store(step.max(1), Ordering::Relaxed);
    }

    /// Counter value without advancing it
    pub fn counter_value(&self) -> u16 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Running prescaler, if the timer has been started
    pub fn prescaler(&self) -> Option<Prescaler> {
        match self.prescaler.load(Ordering::Relaxed) {
            1 => Some(Prescaler::Div1),
            8 => Some(Prescaler::Div8),
            64 => Some(Prescaler::Div64),
            _ => None,
        }
    }

    /// Check if the capture interrupt is enabled
    pub fn capture_irq_enabled(&self) -> bool {
        self.capture_irq_enabled.load(Ordering::Relaxed)
    }

    /// Check if a capture event is pending
    pub fn capture_pending(&self) -> bool {
        self.capture_pending.load(Ordering::Relaxed)
    }

    /// Latch a capture event at the current counter value
    pub fn raise_capture(&self) {
        self.captured.store(self.counter_value(), Ordering::Relaxed);
        self.capture_pending.store(true, Ordering::Relaxed);
    }

    /// Latch a capture event once the counter reaches `tick`
    pub fn schedule_capture(&self, tick: u16) {
        self.scheduled_edge.store(u32::from(tick), Ordering::Relaxed);
    }

    /// Start an incoming frame on `pin`
    ///
    /// Latches a capture at the current counter value, lets `latency` ticks
    /// pass (interrupt entry) and makes `pin` follow `waveform`, measured
    /// from the captured edge.
    pub fn begin_frame(&self, pin: PinId, waveform: Waveform, latency: u16) {
        self.raise_capture();
        let edge = self.captured.load(Ordering::Relaxed);
        self.counter.store(edge.wrapping_add(latency), Ordering::Relaxed);
        self.feed(pin, waveform);
    }

    /// Make `pin` follow `waveform`, indexed by the current counter value
    pub fn feed(&self, pin: PinId, waveform: Waveform) {
        critical_section::with(|cs| {
            *self.line.borrow_ref_mut(cs) = Some((pin, waveform));
        });
    }

    /// Return `pin` to a static level
    pub fn drive(&self, pin: PinId, level: Level) {
        critical_section::with(|cs| {
            let mut line = self.line.borrow_ref_mut(cs);
            if matches!(*line, Some((fed, _)) if fed == pin) {
                *line = None;
            }
        });
        self.store_level(pin, level);
    }

    /// Switch `pin` to `level` after it has been read `reads` more times
    pub fn drive_after(&self, pin: PinId, level: Level, reads: u32) {
        critical_section::with(|cs| {
            *self.script.borrow_ref_mut(cs) = Some(Script {
                pin,
                level,
                reads_left: reads,
            });
        });
    }

    /// Total number of pin reads since creation
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Start recording every write to `pin`, stamped with the counter
    pub fn record(&self, pin: PinId) {
        critical_section::with(|cs| {
            *self.trace.borrow_ref_mut(cs) = Some((pin, Waveform::idle()));
        });
    }

    /// Stop recording and return what was written
    pub fn take_trace(&self) -> Waveform {
        critical_section::with(|cs| {
            self.trace
                .borrow_ref_mut(cs)
                .take()
                .map(|(_, waveform)| waveform)
                .unwrap_or_default()
        })
    }

    /// Last level written to or driven on `pin`
    pub fn pin_level(&self, pin: PinId) -> Level {
        Level::from(self.levels.load(Ordering::Relaxed) & mask(pin) != 0)
    }

    /// Direction of `pin`
    pub fn pin_mode(&self, pin: PinId) -> PinMode {
        if self.outputs.load(Ordering::Relaxed) & mask(pin) != 0 {
            PinMode::Output
        } else {
            PinMode::Input
        }
    }

    fn store_level(&self, pin: PinId, level: Level) {
        match level {
            Level::High => self.levels.fetch_or(mask(pin), Ordering::Relaxed),
            Level::Low => self.levels.fetch_and(!mask(pin), Ordering::Relaxed),
        };
    }

    fn advance(&self) -> u16 {
        let step = self.step.load(Ordering::Relaxed);
        let now = self
            .counter
            .fetch_add(step, Ordering::Relaxed)
            .wrapping_add(step);

        let edge = self.scheduled_edge.load(Ordering::Relaxed);
        if edge != NO_EDGE && u32::from(now) >= edge {
            self.scheduled_edge.store(NO_EDGE, Ordering::Relaxed);
            self.captured.store(edge as u16, Ordering::Relaxed);
            self.capture_pending.store(true, Ordering::Relaxed);
        }
        now
    }

    fn read_pin(&self, pin: PinId) -> Level {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let fed = critical_section::with(|cs| {
            self.line
                .borrow_ref(cs)
                .as_ref()
                .filter(|(fed, _)| *fed == pin)
                .map(|(_, waveform)| waveform.level_at(self.counter_value()))
        });
        if let Some(level) = fed {
            return level;
        }

        let switched = critical_section::with(|cs| {
            let mut script = self.script.borrow_ref_mut(cs);
            match script.as_mut() {
                Some(s) if s.pin == pin => {
                    if s.reads_left == 0 {
                        let level = s.level;
                        *script = None;
                        Some(level)
                    } else {
                        s.reads_left -= 1;
                        None
                    }
                }
                _ => None,
            }
        });
        if let Some(level) = switched {
            self.store_level(pin, level);
        }

        self.pin_level(pin)
    }

    fn write_pin(&self, pin: PinId, level: Level) {
        self.store_level(pin, level);
        critical_section::with(|cs| {
            if let Some((traced, waveform)) = self.trace.borrow_ref_mut(cs).as_mut() {
                if *traced == pin {
                    waveform.push(self.counter_value(), level);
                }
            }
        });
    }
}

fn mask(pin: PinId) -> u32 {
    1 << (pin.number() % PIN_COUNT)
}

/// Capture timer backed by a [`SimBoard`]
#[derive(Clone, Copy)]
pub struct SimTimer<'a> {
    board: &'a SimBoard,
}

impl<'a> SimTimer<'a> {
    /// Create a timer view of `board`
    pub const fn new(board: &'a SimBoard) -> Self {
        Self { board }
    }
}

impl CaptureTimer for SimTimer<'_> {
    fn start(&mut self, prescaler: Prescaler) {
        self.board
            .prescaler
            .store(prescaler.divisor() as u8, Ordering::Relaxed);
        self.board.capture_pending.store(false, Ordering::Relaxed);
        self.board.capture_irq_enabled.store(true, Ordering::Relaxed);
    }

    fn counter(&self) -> u16 {
        self.board.advance()
    }

    fn set_counter(&mut self, ticks: u16) {
        self.board.counter.store(ticks, Ordering::Relaxed);
    }

    fn captured(&self) -> u16 {
        self.board.captured.load(Ordering::Relaxed)
    }

    fn capture_pending(&self) -> bool {
        self.board.capture_pending()
    }

    fn clear_capture(&mut self) {
        self.board.capture_pending.store(false, Ordering::Relaxed);
    }
}

/// Pin bank backed by a [`SimBoard`]
#[derive(Clone, Copy)]
pub struct SimIo<'a> {
    board: &'a SimBoard,
}

impl<'a> SimIo<'a> {
    /// Create a pin bank view of `board`
    pub const fn new(board: &'a SimBoard) -> Self {
        Self { board }
    }
}

impl DigitalIo for SimIo<'_> {
    fn set_mode(&mut self, pin: PinId, mode: PinMode) {
        match mode {
            PinMode::Output => self.board.outputs.fetch_or(mask(pin), Ordering::Relaxed),
            PinMode::Input => self.board.outputs.fetch_and(!mask(pin), Ordering::Relaxed),
        };
    }

    fn set_level(&mut self, pin: PinId, level: Level) {
        self.board.write_pin(pin, level);
    }

    fn level(&self, pin: PinId) -> Level {
        self.board.read_pin(pin)
    }
}

/// Capture interrupt controller backed by a [`SimBoard`]
///
/// Tests call [`SimIrq::poll`] where real hardware would take the
/// interrupt.
pub struct SimIrq<'a> {
    board: &'a SimBoard,
    handler: Option<&'static dyn CaptureHandler>,
}

impl<'a> SimIrq<'a> {
    /// Create an interrupt controller with no handler registered
    pub const fn new(board: &'a SimBoard) -> Self {
        Self {
            board,
            handler: None,
        }
    }

    /// Dispatch a pending capture event to the registered handler
    ///
    /// Returns true if the handler ran.
    pub fn poll(&self) -> bool {
        if !self.board.capture_irq_enabled() || !self.board.capture_pending() {
            return false;
        }
        match self.handler {
            Some(handler) => {
                handler.on_capture_event();
                true
            }
            None => false,
        }
    }

    /// Check if a handler has been registered
    pub fn is_registered(&self) -> bool {
        self.handler.is_some()
    }
}

impl CaptureInterrupt for SimIrq<'_> {
    fn register(&mut self, handler: &'static dyn CaptureHandler) {
        self.handler = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: PinId = PinId(3);

    #[test]
    fn test_counter_advances_per_read() {
        let board = SimBoard::new();
        board.set_counter_step(4);
        let timer = board.timer();
        assert_eq!(timer.counter(), 4);
        assert_eq!(timer.counter(), 8);
        assert_eq!(board.counter_value(), 8);
    }

    #[test]
    fn test_rebase_to_capture() {
        let board = SimBoard::new();
        let mut timer = board.timer();
        timer.set_counter(1000);
        board.raise_capture();
        timer.set_counter(1030);

        // rebase reads the counter once (advancing it by one tick)
        timer.rebase_to_capture();
        assert_eq!(board.counter_value(), 31);
    }

    #[test]
    fn test_scheduled_capture_latches() {
        let board = SimBoard::new();
        let timer = board.timer();
        board.schedule_capture(3);
        timer.counter();
        timer.counter();
        assert!(!board.capture_pending());
        timer.counter();
        assert!(board.capture_pending());
        assert_eq!(timer.captured(), 3);
    }

    #[test]
    fn test_scripted_pin_switches_after_reads() {
        let board = SimBoard::new();
        let io = board.io();
        board.drive(PIN, Level::Low);
        board.drive_after(PIN, Level::High, 2);
        assert_eq!(io.level(PIN), Level::Low);
        assert_eq!(io.level(PIN), Level::Low);
        assert_eq!(io.level(PIN), Level::High);
        assert_eq!(board.reads(), 3);
    }

    #[test]
    fn test_fed_waveform_follows_counter() {
        let board = SimBoard::new();
        let io = board.io();
        let mut timer = board.timer();
        board.feed(PIN, Waveform::from_edges(&[(0, Level::Low), (10, Level::High)]));
        timer.set_counter(5);
        assert_eq!(io.level(PIN), Level::Low);
        timer.set_counter(10);
        assert_eq!(io.level(PIN), Level::High);
    }

    #[test]
    fn test_trace_records_writes() {
        let board = SimBoard::new();
        let mut io = board.io();
        let mut timer = board.timer();
        board.record(PIN);
        timer.set_counter(7);
        io.set_low(PIN);
        timer.set_counter(20);
        io.set_high(PIN);
        let trace = board.take_trace();
        assert_eq!(trace.edges(), &[(7, Level::Low), (20, Level::High)]);
        assert_eq!(board.pin_level(PIN), Level::High);
    }

    #[test]
    fn test_start_enables_capture_irq() {
        let board = SimBoard::new();
        let mut timer = board.timer();
        board.raise_capture();
        timer.start(Prescaler::Div8);
        assert_eq!(board.prescaler(), Some(Prescaler::Div8));
        assert!(board.capture_irq_enabled());
        assert!(!board.capture_pending());
    }
}
