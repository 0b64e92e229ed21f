//! Sticky status register
//!
//! Holds one error code. Engines record faults; nothing but a successful
//! `begin` clears it. The numeric codes match the status byte of the
//! classic AVR driver so host tools can decode either.

use portable_atomic::{AtomicI8, Ordering};

use crate::error::ConfigError;

/// Fault categories, with their numeric status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum ErrorCode {
    /// No fault recorded
    None = 0,
    /// Baud rate outside the timer's resolution
    BaudRate = -1,
    /// Unsupported frame format or colliding pin assignment
    BadParameter = -2,
    /// A start edge arrived while a transmit had interrupts masked
    ReceiveConflict = -3,
    /// Receive buffer overflow
    Overflow = -4,
    /// Start bit sampled high
    BadStartBit = -5,
    /// Stop bit sampled low
    BadStopBit = -6,
}

impl ErrorCode {
    /// Numeric status code
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Decode a numeric status code
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::None),
            -1 => Some(ErrorCode::BaudRate),
            -2 => Some(ErrorCode::BadParameter),
            -3 => Some(ErrorCode::ReceiveConflict),
            -4 => Some(ErrorCode::Overflow),
            -5 => Some(ErrorCode::BadStartBit),
            -6 => Some(ErrorCode::BadStopBit),
            _ => None,
        }
    }

    /// Check if this code denotes a fault
    pub const fn is_error(self) -> bool {
        !matches!(self, ErrorCode::None)
    }

    /// Check if this code comes from configuration rather than traffic
    pub const fn is_config_error(self) -> bool {
        matches!(self, ErrorCode::BaudRate | ErrorCode::BadParameter)
    }
}

impl From<ConfigError> for ErrorCode {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedBaud => ErrorCode::BaudRate,
            ConfigError::UnsupportedFrame | ConfigError::PinConflict => ErrorCode::BadParameter,
        }
    }
}

/// Sticky error register shared by the foreground and the capture handler
///
/// Writers never race: the capture handler runs to completion and the
/// foreground only writes from inside a critical section, so plain
/// load/store is enough and no compare-and-swap is required.
#[derive(Debug)]
pub struct Status {
    code: AtomicI8,
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// Create a clear register
    pub const fn new() -> Self {
        Self {
            code: AtomicI8::new(0),
        }
    }

    /// Current error code
    pub fn get(&self) -> ErrorCode {
        ErrorCode::from_code(self.code.load(Ordering::Acquire)).unwrap_or(ErrorCode::None)
    }

    /// Check if no fault is recorded
    pub fn is_clear(&self) -> bool {
        !self.get().is_error()
    }

    /// Record `code` unless a fault is already recorded
    pub fn record(&self, code: ErrorCode) {
        if self.is_clear() {
            self.code.store(code.code(), Ordering::Release);
        }
    }

    /// Record `code`, replacing whatever was recorded before
    pub fn overwrite(&self, code: ErrorCode) {
        self.code.store(code.code(), Ordering::Release);
    }

    /// Reset to [`ErrorCode::None`]
    pub fn clear(&self) {
        self.code.store(ErrorCode::None.code(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in -6..=0 {
            let decoded = ErrorCode::from_code(code).unwrap();
            assert_eq!(decoded.code(), code);
        }
        assert_eq!(ErrorCode::from_code(-7), None);
        assert_eq!(ErrorCode::from_code(1), None);
    }

    #[test]
    fn test_first_error_sticks() {
        let status = Status::new();
        assert!(status.is_clear());

        status.record(ErrorCode::Overflow);
        status.record(ErrorCode::BadStartBit);
        assert_eq!(status.get(), ErrorCode::Overflow);
    }

    #[test]
    fn test_overwrite_replaces() {
        let status = Status::new();
        status.record(ErrorCode::ReceiveConflict);
        status.overwrite(ErrorCode::BadStopBit);
        assert_eq!(status.get(), ErrorCode::BadStopBit);

        status.clear();
        assert_eq!(status.get(), ErrorCode::None);
    }

    #[test]
    fn test_config_error_mapping() {
        assert_eq!(ErrorCode::from(ConfigError::UnsupportedBaud), ErrorCode::BaudRate);
        assert_eq!(ErrorCode::from(ConfigError::PinConflict), ErrorCode::BadParameter);
        assert_eq!(
            ErrorCode::from(ConfigError::UnsupportedFrame),
            ErrorCode::BadParameter
        );
        assert!(ErrorCode::BaudRate.is_config_error());
        assert!(!ErrorCode::Overflow.is_config_error());
    }
}
