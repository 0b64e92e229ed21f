//! Synchronous error types
//!
//! Runtime faults of the link are sticky and live in the
//! [`Status`](crate::status::Status) register; the types here are only
//! returned from configuration and from the stream trait adapters.

/// Reasons `begin` rejects a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate cannot be represented with the timer's resolution
    UnsupportedBaud,
    /// Frame format other than 8N1 requested
    UnsupportedFrame,
    /// RTS/CTS pins collide with each other or with RXD/TXD
    PinConflict,
}

/// Errors returned by the `embedded-io` and `UartTx`/`UartRx` adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// `begin` has not succeeded
    NotConfigured,
    /// The CTS wait policy gave up before the peer became ready
    CtsTimeout,
}

impl embedded_io::Error for LinkError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            LinkError::NotConfigured => embedded_io::ErrorKind::Other,
            LinkError::CtsTimeout => embedded_io::ErrorKind::TimedOut,
        }
    }
}
