use tracing::debug;

use crate::engine::output::AudioDevice;

/// Owns a native device and destroys it when dropped.
///
/// Built from whatever the backend returned, so a missing device is allowed;
/// dropping such a handle does nothing.
pub struct DeviceHandle<D: AudioDevice> {
    device: Option<D>,
}

impl<D: AudioDevice> DeviceHandle<D> {
    pub fn new(device: Option<D>) -> Self {
        Self { device }
    }

    pub fn is_valid(&self) -> bool {
        self.device.is_some()
    }

    pub fn get_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }
}

impl<D: AudioDevice> Drop for DeviceHandle<D> {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            debug!("destroying audio device");
            device.destroy();
        }
    }
}
