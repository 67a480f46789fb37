use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, Stream, StreamConfig};
use tracing::debug;

use crate::engine::buffer::{create_sample_queue, SampleConsumer, SampleProducer};
use crate::engine::clock::Clock;
use crate::engine::config::SampleFormat;
use crate::engine::dsp::resampler::Resampler;
use crate::engine::output::{AudioBackend, AudioDevice, ErrorCode, Status};

/// Codes returned by [`CpalDevice`].
pub mod code {
    pub const NOT_OPEN: i32 = 1;
    pub const ALREADY_OPEN: i32 = 2;
    pub const UNSUPPORTED_CONFIG: i32 = 3;
    pub const BUILD_STREAM: i32 = 4;
    pub const PLAY_STREAM: i32 = 5;
    pub const STREAM_FAILED: i32 = 6;
    pub const DRAIN_TIMEOUT: i32 = 7;
    pub const WRITE_TIMEOUT: i32 = 8;
    pub const RESAMPLE: i32 = 9;
}

const WRITE_BACKOFF: Duration = Duration::from_millis(5);
/// How long a full queue may go without the callback taking anything.
const WRITE_STALL_LIMIT: Duration = Duration::from_secs(3);
const DRAIN_POLL: Duration = Duration::from_millis(10);
/// Extra time allowed for the queue to empty beyond its own length.
const DRAIN_SLACK: Duration = Duration::from_secs(2);
/// Roughly one device period, for the last callback's samples to leave.
const DRAIN_TAIL: Duration = Duration::from_millis(50);
const RESAMPLE_CHUNK: usize = 1024;

/// Plays through the default output device of the default cpal host.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    type Device = CpalDevice;

    fn create_device(&self, app_name: &str, stream_name: &str) -> Option<CpalDevice> {
        let host = cpal::default_host();
        let Some(device) = host.default_output_device() else {
            debug!("no default output device");
            return None;
        };
        #[allow(deprecated)]
        let label = device.name().unwrap_or_else(|_| "unknown".to_string());
        debug!(device = %label, app = app_name, stream = stream_name, "created audio device");
        Some(CpalDevice {
            device,
            label,
            stream: None,
            clock: Arc::new(Clock::new(0, 0)),
            last_error: LastError::default(),
        })
    }
}

struct OpenStream {
    stream: Stream,
    producer: SampleProducer,
    /// Present when the device runs at a different rate than the file.
    resampler: Option<Resampler>,
    /// Low byte of a sample split across two writes.
    carry: Option<u8>,
    decoded: Vec<i16>,
    staging: Vec<f32>,
    resampled: Vec<f32>,
}

struct Failure {
    code: i32,
    detail: String,
}

impl Failure {
    fn new(code: i32, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Detail text of the most recent failed call, keyed by its code.
#[derive(Debug, Default)]
struct LastError {
    entry: Option<(i32, String)>,
}

impl LastError {
    fn record(&mut self, result: Result<(), Failure>) -> Status {
        match result {
            Ok(()) => {
                self.entry = None;
                Ok(())
            }
            Err(failure) => {
                let status = ErrorCode::check(failure.code);
                self.entry = Some((failure.code, failure.detail));
                status
            }
        }
    }

    fn describe(&self, code: ErrorCode) -> String {
        match &self.entry {
            Some((raw, detail)) if *raw == code.raw() => detail.clone(),
            _ => code_text(code.raw()),
        }
    }
}

pub struct CpalDevice {
    device: cpal::Device,
    label: String,
    stream: Option<OpenStream>,
    clock: Arc<Clock>,
    last_error: LastError,
}

impl CpalDevice {
    fn try_open(&mut self, sample_rate: u32, channels: u16) -> Result<(), Failure> {
        if self.stream.is_some() {
            return Err(Failure::new(code::ALREADY_OPEN, "stream is already open"));
        }

        let supported = select_config(&self.device, sample_rate, channels)?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let output_rate = config.sample_rate;
        let output_channels = config.channels;

        if channels != 1 && channels != output_channels {
            return Err(Failure::new(
                code::UNSUPPORTED_CONFIG,
                format!("cannot map {channels}ch audio onto a {output_channels}ch device"),
            ));
        }

        let resampler = if output_rate != sample_rate {
            debug!(from = sample_rate, to = output_rate, "resampling output");
            let resampler =
                Resampler::new(sample_rate, output_rate, channels as usize, RESAMPLE_CHUNK)
                    .map_err(|e| {
                        Failure::new(
                            code::UNSUPPORTED_CONFIG,
                            format!("cannot resample {sample_rate}Hz to {output_rate}Hz: {e}"),
                        )
                    })?;
            Some(resampler)
        } else {
            None
        };

        // The queue holds file-layout samples at the device rate.
        self.clock.reset(output_rate, channels as u32);
        let (producer, consumer) = create_sample_queue(output_rate as usize * channels as usize);
        let clock = Arc::clone(&self.clock);
        let layout = Layout {
            source_channels: channels as usize,
            output_channels: output_channels as usize,
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&self.device, &config, consumer, clock, layout)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&self.device, &config, consumer, clock, layout)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&self.device, &config, consumer, clock, layout)
            }
            other => {
                return Err(Failure::new(
                    code::UNSUPPORTED_CONFIG,
                    format!("unsupported output sample format: {other:?}"),
                ))
            }
        }
        .map_err(|e| {
            Failure::new(
                code::BUILD_STREAM,
                format!("failed to build output stream: {e}"),
            )
        })?;

        stream.play().map_err(|e| {
            Failure::new(
                code::PLAY_STREAM,
                format!("failed to play output stream: {e}"),
            )
        })?;

        debug!(
            device = %self.label,
            ?sample_format,
            rate = output_rate,
            channels = output_channels,
            "output stream running"
        );
        self.stream = Some(OpenStream {
            stream,
            producer,
            resampler,
            carry: None,
            decoded: Vec::new(),
            staging: Vec::new(),
            resampled: Vec::new(),
        });
        Ok(())
    }

    fn try_write(&mut self, data: &[u8]) -> Result<(), Failure> {
        let open = self
            .stream
            .as_mut()
            .ok_or_else(|| Failure::new(code::NOT_OPEN, "stream is not open"))?;

        open.decoded.clear();
        decode_s16le(&mut open.carry, data, &mut open.decoded);
        open.staging.clear();
        open.staging
            .extend(open.decoded.iter().map(|&s| f32::from_sample(s)));

        let samples = match open.resampler.as_mut() {
            Some(resampler) => {
                open.resampled.clear();
                resampler
                    .process(&open.staging, &mut open.resampled)
                    .map_err(|e| Failure::new(code::RESAMPLE, format!("resampling failed: {e}")))?;
                &open.resampled
            }
            None => &open.staging,
        };
        push_samples(&mut open.producer, samples, &self.clock, WRITE_STALL_LIMIT)
    }

    fn try_drain(&mut self) -> Result<(), Failure> {
        let open = self
            .stream
            .as_mut()
            .ok_or_else(|| Failure::new(code::NOT_OPEN, "stream is not open"))?;

        if let Some(resampler) = open.resampler.as_mut() {
            open.resampled.clear();
            resampler
                .flush(&mut open.resampled)
                .map_err(|e| Failure::new(code::RESAMPLE, format!("resampling failed: {e}")))?;
            push_samples(
                &mut open.producer,
                &open.resampled,
                &self.clock,
                WRITE_STALL_LIMIT,
            )?;
        }

        let deadline = Instant::now() + self.clock.pending_duration() + DRAIN_SLACK;
        while self.clock.pending() > 0 {
            if !self.clock.is_healthy() {
                return Err(Failure::new(code::STREAM_FAILED, "output stream failed"));
            }
            if Instant::now() >= deadline {
                return Err(Failure::new(
                    code::DRAIN_TIMEOUT,
                    format!("timed out with {} samples unplayed", self.clock.pending()),
                ));
            }
            thread::sleep(DRAIN_POLL);
        }
        thread::sleep(DRAIN_TAIL);
        debug!(played_secs = self.clock.played_secs(), "drained output stream");
        Ok(())
    }
}

impl AudioDevice for CpalDevice {
    fn open(&mut self, format: SampleFormat, sample_rate: u32, channels: u8) -> Status {
        let result = match format {
            SampleFormat::S16Le => self.try_open(sample_rate, channels as u16),
        };
        self.last_error.record(result)
    }

    fn close(&mut self) {
        if let Some(open) = self.stream.take() {
            let _ = open.stream.pause();
            if open.carry.is_some() {
                debug!("dropping a trailing half sample");
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Status {
        let result = self.try_write(data);
        self.last_error.record(result)
    }

    fn drain(&mut self) -> Status {
        let result = self.try_drain();
        self.last_error.record(result)
    }

    fn describe_error(&self, code: ErrorCode) -> String {
        self.last_error.describe(code)
    }

    fn destroy(mut self) {
        self.close();
        debug!(device = %self.label, "released audio device");
    }
}

fn code_text(raw: i32) -> String {
    match raw {
        code::NOT_OPEN => "stream is not open".to_string(),
        code::ALREADY_OPEN => "stream is already open".to_string(),
        code::UNSUPPORTED_CONFIG => "unsupported stream configuration".to_string(),
        code::BUILD_STREAM => "failed to build output stream".to_string(),
        code::PLAY_STREAM => "failed to play output stream".to_string(),
        code::STREAM_FAILED => "output stream failed".to_string(),
        code::DRAIN_TIMEOUT => "timed out draining output stream".to_string(),
        code::WRITE_TIMEOUT => "output stream stopped accepting audio".to_string(),
        code::RESAMPLE => "resampling failed".to_string(),
        other => format!("unknown audio error {other}"),
    }
}

/// Picks a config with exactly `channels` that runs at `sample_rate`,
/// preferring native i16. Without one, the device default is used and the
/// stream adapts rate and channel count to it.
fn select_config(
    device: &cpal::Device,
    sample_rate: u32,
    channels: u16,
) -> Result<cpal::SupportedStreamConfig, Failure> {
    let exact = match device.supported_output_configs() {
        Ok(configs) => {
            let mut matching: Vec<_> = configs
                .filter(|c| {
                    c.channels() == channels
                        && c.min_sample_rate() <= sample_rate
                        && sample_rate <= c.max_sample_rate()
                })
                .collect();
            matching.sort_by_key(|c| c.sample_format() != cpal::SampleFormat::I16);
            matching
                .into_iter()
                .next()
                .map(|c| c.with_sample_rate(sample_rate))
        }
        Err(e) => {
            debug!(%e, "failed to query output configs");
            None
        }
    };

    match exact {
        Some(config) => Ok(config),
        None => device.default_output_config().map_err(|e| {
            Failure::new(
                code::UNSUPPORTED_CONFIG,
                format!("failed to query default output config: {e}"),
            )
        }),
    }
}

/// Channel counts on both sides of the callback.
#[derive(Debug, Clone, Copy)]
struct Layout {
    source_channels: usize,
    output_channels: usize,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: SampleConsumer,
    clock: Arc<Clock>,
    layout: Layout,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let err_clock = Arc::clone(&clock);
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            process_audio(data, &mut consumer, &clock, layout)
        },
        move |err| {
            debug!(%err, "output stream error");
            err_clock.mark_unhealthy();
        },
        None,
    )
}

/// Fills `data` from the queue and pads any shortfall with silence.
/// Mono input is copied to every output channel.
fn process_audio<T: Sample + FromSample<f32>>(
    data: &mut [T],
    consumer: &mut SampleConsumer,
    clock: &Clock,
    layout: Layout,
) {
    let mut played = 0u64;
    if layout.source_channels == layout.output_channels {
        for out in data.iter_mut() {
            match consumer.pop() {
                Some(sample) => {
                    *out = T::from_sample(sample);
                    played += 1;
                }
                None => *out = T::EQUILIBRIUM,
            }
        }
    } else {
        for frame in data.chunks_mut(layout.output_channels) {
            match consumer.pop() {
                Some(sample) => {
                    frame.fill(T::from_sample(sample));
                    played += 1;
                }
                None => frame.fill(T::EQUILIBRIUM),
            }
        }
    }
    clock.add_played(played);
}

/// Pushes every sample into the queue, waiting while it is full.
///
/// Fails when the stream reports an error or when the queue makes no
/// progress for `stall_limit`.
fn push_samples(
    producer: &mut SampleProducer,
    samples: &[f32],
    clock: &Clock,
    stall_limit: Duration,
) -> Result<(), Failure> {
    let mut pushed = 0;
    let mut last_progress = Instant::now();
    while pushed < samples.len() {
        if !clock.is_healthy() {
            return Err(Failure::new(code::STREAM_FAILED, "output stream failed"));
        }
        if producer.vacant_len() == 0 {
            if last_progress.elapsed() >= stall_limit {
                return Err(Failure::new(
                    code::WRITE_TIMEOUT,
                    format!("output queue stalled for {stall_limit:?}"),
                ));
            }
            thread::sleep(WRITE_BACKOFF);
            continue;
        }
        let n = producer.push_slice(&samples[pushed..]);
        clock.add_queued(n as u64);
        pushed += n;
        last_progress = Instant::now();
    }
    Ok(())
}

/// Appends the samples in `data` to `out`. A dangling byte is kept in
/// `carry` and joined with the first byte of the next call.
fn decode_s16le(carry: &mut Option<u8>, data: &[u8], out: &mut Vec<i16>) {
    let mut bytes = data;
    if let Some(low) = carry.take() {
        match bytes.split_first() {
            Some((&high, rest)) => {
                out.push(i16::from_le_bytes([low, high]));
                bytes = rest;
            }
            None => *carry = Some(low),
        }
    }

    let mut pairs = bytes.chunks_exact(2);
    out.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
    if let [last] = pairs.remainder() {
        *carry = Some(*last);
    }
}
