use tracing::{debug, trace};

use crate::engine::config::StreamParams;
use crate::engine::error::{self, PlayerError};
use crate::engine::output::device::DeviceHandle;
use crate::engine::output::AudioDevice;

/// An open stream on a device owned by a [`DeviceHandle`].
///
/// The guard holds no handle of its own. What it manages is the fact that the
/// borrowed device is open, so it is closed again when the guard drops. The
/// mutable borrow keeps the device alive and unshared for the guard's lifetime.
pub struct StreamGuard<'a, D: AudioDevice> {
    device: &'a mut D,
}

impl<'a, D: AudioDevice> StreamGuard<'a, D> {
    /// Opens a stream on `handle`. On failure nothing is left open.
    pub fn open(
        handle: &'a mut DeviceHandle<D>,
        params: StreamParams,
    ) -> Result<Self, PlayerError> {
        let device = handle.get_mut().ok_or(PlayerError::NoDevice)?;
        let status = device.open(params.format, params.sample_rate, params.channels);
        error::check(&*device, status)?;
        debug!(
            rate = params.sample_rate,
            channels = params.channels,
            "opened output stream"
        );
        Ok(Self { device })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), PlayerError> {
        trace!(bytes = data.len(), "write");
        let status = self.device.write(data);
        error::check(&*self.device, status)
    }

    pub fn drain(&mut self) -> Result<(), PlayerError> {
        let status = self.device.drain();
        error::check(&*self.device, status)
    }
}

impl<D: AudioDevice> Drop for StreamGuard<'_, D> {
    fn drop(&mut self) {
        debug!("closing output stream");
        self.device.close();
    }
}
