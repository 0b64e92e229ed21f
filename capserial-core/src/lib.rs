//! Software UART driven by a single capture timer
//!
//! This crate contains everything above the platform traits of
//! `capserial-hal`:
//!
//! - Timing calculator (baud rate → prescaler → per-bit tick tables)
//! - Lock-free receive ring buffer
//! - RTS/CTS flow-control policy
//! - Transmit and receive engines sharing one free-running counter
//! - Sticky status register
//! - The [`SoftSerial`] link with its byte-stream API and trait adapters
//!
//! # Frame
//!
//! Only 8N1 is supported: start bit (low), 8 data bits LSB first, stop bit
//! (high). Ten bit times per frame.
//!
//! # Concurrency
//!
//! The receive engine runs from the capture interrupt; everything else runs
//! in the foreground. The transmit engine masks interrupts for one frame
//! with a critical section, so an edge arriving during a transmit is
//! serviced late and reported as [`ErrorCode::ReceiveConflict`].

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod io;
pub mod link;
pub mod ring;
pub mod status;
pub mod timing;

pub use config::{DataPins, LinkConfig};
pub use error::{ConfigError, LinkError};
pub use flow::{CtsWait, FlowControl, Forever, MaxPolls};
pub use link::SoftSerial;
pub use ring::RxRing;
pub use status::{ErrorCode, Status};
pub use timing::FrameTiming;

/// Default receive buffer capacity in bytes
pub const DEFAULT_RX_CAPACITY: usize = 64;
