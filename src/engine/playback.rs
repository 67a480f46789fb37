use std::io::Read;

use tracing::trace;

use crate::engine::buffer::SampleBuffer;
use crate::engine::error::PlayerError;
use crate::engine::output::stream::StreamGuard;
use crate::engine::output::AudioDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    /// Holds the number of bytes just read.
    Writing(usize),
    Draining,
    Done,
}

/// What a finished playback pushed to the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub chunks: usize,
    pub bytes: u64,
}

/// Streams `source` into `stream` one buffer at a time, then drains.
///
/// Each chunk is written with exactly the byte count that was read. The first
/// read or backend failure ends playback; the stream is never drained after
/// a failed write.
pub fn run<R: Read, D: AudioDevice>(
    source: &mut R,
    stream: &mut StreamGuard<'_, D>,
    buffer: &mut SampleBuffer,
) -> Result<PlaybackReport, PlayerError> {
    let mut report = PlaybackReport::default();
    let mut state = State::Reading;

    loop {
        state = match state {
            State::Reading => match buffer.fill_from(source)? {
                0 => State::Draining,
                read => State::Writing(read),
            },
            State::Writing(len) => {
                stream.write(buffer.filled(len))?;
                report.chunks += 1;
                report.bytes += len as u64;
                trace!(chunk = report.chunks, bytes = len, "chunk written");
                State::Reading
            }
            State::Draining => {
                stream.drain()?;
                State::Done
            }
            State::Done => return Ok(report),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::PlayerConfig;
    use crate::engine::output::device::DeviceHandle;
    use crate::engine::output::mock::{Call, MockBackend};
    use crate::engine::output::AudioBackend;
    use std::io::{self, Cursor};

    fn play(
        backend: &MockBackend,
        data: Vec<u8>,
        capacity: usize,
    ) -> Result<PlaybackReport, PlayerError> {
        let mut device = DeviceHandle::new(backend.create_device("app", "stream"));
        let mut stream = StreamGuard::open(&mut device, PlayerConfig::default().stream)?;
        let mut buffer = SampleBuffer::new(capacity);
        run(&mut Cursor::new(data), &mut stream, &mut buffer)
    }

    #[test]
    fn two_full_chunks_then_drain() {
        let backend = MockBackend::new();
        let report = play(&backend, vec![0; 176_400], 88_200).unwrap();
        assert_eq!(backend.writes(), vec![88_200, 88_200]);
        assert_eq!(backend.count(&Call::Drain), 1);
        assert_eq!(
            report,
            PlaybackReport {
                chunks: 2,
                bytes: 176_400
            }
        );
    }

    #[test]
    fn write_count_follows_file_size() {
        let capacity = 10;
        let cases: [(usize, Vec<usize>); 5] = [
            (0, vec![]),
            (1, vec![1]),
            (10, vec![10]),
            (25, vec![10, 10, 5]),
            (30, vec![10, 10, 10]),
        ];
        for (size, expected) in cases {
            let backend = MockBackend::new();
            play(&backend, vec![0; size], capacity).unwrap();
            assert_eq!(backend.writes(), expected, "file of {size} bytes");
            assert_eq!(backend.count(&Call::Drain), 1);
        }
    }

    #[test]
    fn drain_comes_after_last_write() {
        let backend = MockBackend::new();
        play(&backend, vec![0; 15], 10).unwrap();
        let calls = backend.calls();
        let drain = calls.iter().position(|c| *c == Call::Drain).unwrap();
        let close = calls.iter().position(|c| *c == Call::Close).unwrap();
        assert_eq!(calls[drain - 1], Call::Write(5));
        assert_eq!(close, drain + 1);
    }

    #[test]
    fn failed_write_skips_drain() {
        let backend = MockBackend::new().failing_write(2, 6);
        let err = play(&backend, vec![0; 176_400], 88_200).unwrap_err();
        assert_eq!(err.to_string(), "mock error 6");
        assert_eq!(backend.writes(), vec![88_200, 88_200]);
        assert_eq!(backend.count(&Call::Drain), 0);
        assert_eq!(backend.count(&Call::Close), 1);
        assert_eq!(backend.count(&Call::Destroy), 1);
    }

    #[test]
    fn failed_drain_is_reported() {
        let backend = MockBackend::new().failing_drain(7);
        let err = play(&backend, vec![0; 4], 10).unwrap_err();
        assert!(matches!(err, PlayerError::Backend { .. }));
        assert_eq!(backend.count(&Call::Close), 1);
    }

    #[test]
    fn read_error_stops_before_drain() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let backend = MockBackend::new();
        {
            let mut device = DeviceHandle::new(backend.create_device("app", "stream"));
            let mut stream =
                StreamGuard::open(&mut device, PlayerConfig::default().stream).unwrap();
            let err = run(&mut Broken, &mut stream, &mut SampleBuffer::new(8)).unwrap_err();
            assert!(matches!(err, PlayerError::Read(_)));
        }
        assert!(backend.writes().is_empty());
        assert_eq!(backend.count(&Call::Drain), 0);
        assert_eq!(backend.count(&Call::Close), 1);
    }
}
