//! Simulated platform for the capserial software UART
//!
//! Implements the `capserial-hal` traits against an in-memory board model
//! so the timing engines can run on the host:
//!
//! - [`SimBoard`] - shared board state (counter, capture unit, pin levels)
//! - [`SimTimer`] - [`CaptureTimer`](capserial_hal::CaptureTimer) view of the board
//! - [`SimIo`] - [`DigitalIo`](capserial_hal::DigitalIo) view of the board
//! - [`SimIrq`] - capture interrupt registration and manual dispatch
//! - [`Waveform`] - line levels over counter ticks, recorded or synthesized
//!
//! The simulated counter advances by a fixed step every time it is read,
//! which is what makes the engines' spin loops terminate.

#![no_std]
#![deny(unsafe_code)]

pub mod board;
pub mod waveform;

pub use board::{SimBoard, SimIo, SimIrq, SimTimer};
pub use waveform::{Waveform, MAX_EDGES};
