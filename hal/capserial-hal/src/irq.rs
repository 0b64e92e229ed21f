//! Capture interrupt dispatch
//!
//! The platform keeps a handler reference registered at setup time and
//! calls it from the capture vector.

/// Receiver of capture interrupts
///
/// Called from interrupt context with the capture interrupt masked for
/// the duration of the call.
pub trait CaptureHandler: Sync {
    /// Service one capture event
    fn on_capture_event(&self);
}

/// Platform capture interrupt registration
pub trait CaptureInterrupt {
    /// Route the capture interrupt to `handler`
    ///
    /// Replaces any previously registered handler.
    fn register(&mut self, handler: &'static dyn CaptureHandler);
}
