//! Error types for raster encoding and printer transport operations.
//!
//! Every failure surfaces as one of five categories. None of them are retried
//! inside this crate; a caller that wants to try again starts a new print
//! invocation from scratch.

use thiserror::Error;

/// Main error type for raster encoding and printing.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or zero-sized buffers, or a value that overflows a
    /// command field.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The capture source produced an image with a zero dimension.
    #[error("Captured image is empty ({width}x{height})")]
    CaptureInvalid { width: u32, height: u32 },

    /// The host lacks the requested transport, or no device was selected.
    ///
    /// The message names the missing capability.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The selected device has no endpoint we can stream print data to.
    #[error("Device unsupported: {0}")]
    DeviceUnsupported(String),

    /// Writing to, or connecting to, the device failed.
    ///
    /// Transport state is not recoverable mid-buffer, so a retry has to
    /// reframe and resend the whole command.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),
}

impl Error {
    /// Whether starting a fresh invocation could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}

/// Cause of a [`Error::TransportFailure`].
#[derive(Error, Debug)]
pub enum TransportError {
    /// USB communication error.
    ///
    /// Wraps underlying rusb errors for device communication issues,
    /// timeouts, or permission problems.
    #[error(transparent)]
    Usb(#[from] rusb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Socket(#[from] tungstenite::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("transport is not connected")]
    NotConnected,
}

impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        Self::TransportFailure(TransportError::Usb(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::TransportFailure(TransportError::Io(err))
    }
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Self::TransportFailure(TransportError::Socket(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(Error::from(rusb::Error::Timeout).is_retryable());
        assert!(Error::from(TransportError::NotConnected).is_retryable());
        assert!(!Error::InvalidInput("zero width".into()).is_retryable());
        assert!(!Error::DeviceUnsupported("no OUT endpoint".into()).is_retryable());
        assert!(!Error::CaptureInvalid { width: 0, height: 3 }.is_retryable());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = Error::from(TransportError::ShortWrite {
            written: 3,
            expected: 8,
        });
        assert_eq!(err.to_string(), "Transport failure: short write: 3 of 8 bytes");

        let err = Error::DeviceUnavailable("serial ports are not supported on this host".into());
        assert!(err.to_string().contains("serial ports"));
    }
}
