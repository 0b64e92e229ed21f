//! Capserial Hardware Abstraction Layer
//!
//! This crate defines the platform services the software UART consumes.
//! Chip-specific crates implement them on top of real registers; the
//! `capserial-hal-sim` crate implements them for host-side testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  capserial-core (timing + engines)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  capserial-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ capserial-    │       │  chip HAL     │
//! │   hal-sim     │       │ (AVR, ...)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::DigitalIo`] - Digital I/O addressed by pin number
//! - [`timer::CaptureTimer`] - Free-running counter with input capture
//! - [`irq::CaptureInterrupt`], [`irq::CaptureHandler`] - Capture interrupt dispatch
//! - [`uart::UartTx`], [`uart::UartRx`] - Byte-level serial traits
//!
//! Interrupt masking is not abstracted here: platforms provide it through
//! the `critical-section` crate.

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod irq;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{DigitalIo, Level, PinId, PinMode};
pub use irq::{CaptureHandler, CaptureInterrupt};
pub use timer::{CaptureTimer, Prescaler};
pub use uart::{FrameFormat, UartRx, UartTx};
