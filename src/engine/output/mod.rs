pub mod cpal_backend;
pub mod device;
pub mod stream;

#[cfg(test)]
pub mod mock;

use std::fmt;
use std::num::NonZeroI32;

use crate::engine::config::SampleFormat;

/// A backend failure code. Zero means success and is never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(NonZeroI32);

impl ErrorCode {
    /// Converts a raw backend code, treating zero as success.
    pub fn check(raw: i32) -> Status {
        match NonZeroI32::new(raw) {
            Some(code) => Err(ErrorCode(code)),
            None => Ok(()),
        }
    }

    pub fn raw(self) -> i32 {
        self.0.get()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a backend call.
pub type Status = Result<(), ErrorCode>;

/// Creates native output devices.
pub trait AudioBackend {
    type Device: AudioDevice;

    /// Returns `None` when no device could be created.
    fn create_device(&self, app_name: &str, stream_name: &str) -> Option<Self::Device>;
}

/// A native output device handle.
///
/// Every call blocks until the backend has finished with it.
pub trait AudioDevice {
    /// Configures the device and starts accepting audio.
    fn open(&mut self, format: SampleFormat, sample_rate: u32, channels: u8) -> Status;

    /// Stops the stream opened by [`AudioDevice::open`].
    fn close(&mut self);

    /// Queues raw sample bytes in the opened format.
    fn write(&mut self, data: &[u8]) -> Status;

    /// Blocks until everything written so far has been played.
    fn drain(&mut self) -> Status;

    /// Human-readable text for a code returned by this device.
    fn describe_error(&self, code: ErrorCode) -> String;

    /// Releases the device. Never combined with `close`.
    fn destroy(self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_code_is_success() {
        assert_eq!(ErrorCode::check(0), Ok(()));
    }

    #[test]
    fn non_zero_code_keeps_its_value() {
        let code = ErrorCode::check(-22).unwrap_err();
        assert_eq!(code.raw(), -22);
        assert_eq!(code.to_string(), "-22");
    }
}
