/// Sample encodings understood by the output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit PCM, little-endian.
    S16Le,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16Le => 2,
        }
    }
}

/// Parameters handed to the device when a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub format: SampleFormat,
    pub sample_rate: u32,
    pub channels: u8,
}

/// Fixed settings for a playback run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub app_name: String,
    pub stream_name: String,
    pub stream: StreamParams,
    /// Seconds of audio held by the read buffer.
    pub chunk_secs: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            app_name: "raw-audio-player".to_string(),
            stream_name: "playback".to_string(),
            stream: StreamParams {
                format: SampleFormat::S16Le,
                sample_rate: 44100,
                channels: 1,
            },
            chunk_secs: 1,
        }
    }
}

impl PlayerConfig {
    /// Size in bytes of one read chunk.
    pub fn chunk_bytes(&self) -> usize {
        self.stream.sample_rate as usize
            * self.stream.channels as usize
            * self.stream.format.bytes_per_sample()
            * self.chunk_secs as usize
    }
}
