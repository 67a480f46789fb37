use std::path::Path;

use tracing::{debug, info};

use crate::engine::buffer::SampleBuffer;
use crate::engine::config::PlayerConfig;
use crate::engine::error::PlayerError;
use crate::engine::output::device::DeviceHandle;
use crate::engine::output::stream::StreamGuard;
use crate::engine::output::AudioBackend;
use crate::engine::playback::{self, PlaybackReport};
use crate::engine::source::RawPcmFile;

pub struct AudioEngine<B: AudioBackend> {
    backend: B,
    config: PlayerConfig,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(backend: B, config: PlayerConfig) -> Self {
        Self { backend, config }
    }

    /// Plays a raw PCM file from start to end.
    ///
    /// Resources are taken in the order file, device, stream and released in
    /// reverse on every return path. The file is opened first so a bad path
    /// fails before the backend is touched.
    pub fn play<P: AsRef<Path>>(&self, path: P) -> Result<PlaybackReport, PlayerError> {
        let mut file = RawPcmFile::open(path)?;
        let mut device = DeviceHandle::new(
            self.backend
                .create_device(&self.config.app_name, &self.config.stream_name),
        );
        if !device.is_valid() {
            debug!("audio backend returned no device");
        }
        let mut stream = StreamGuard::open(&mut device, self.config.stream)?;
        let mut buffer = SampleBuffer::new(self.config.chunk_bytes());
        debug!(capacity = buffer.capacity(), "playing");

        let report = playback::run(&mut file, &mut stream, &mut buffer)?;
        info!(
            path = %file.path().display(),
            chunks = report.chunks,
            bytes = report.bytes,
            "playback finished"
        );
        Ok(report)
    }
}
