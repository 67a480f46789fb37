use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Progress shared between the writer thread and the output callback.
///
/// The writer counts samples it queued, the callback counts samples it
/// handed to the hardware. Everything is atomic so the callback never locks.
pub struct Clock {
    /// Samples pushed into the queue since the stream was opened.
    queued: AtomicU64,
    /// Samples consumed by the output callback.
    played: AtomicU64,
    sample_rate: AtomicU64,
    channels: AtomicU64,
    /// Cleared when the stream reports an error.
    healthy: AtomicBool,
}

impl Clock {
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        Self {
            queued: AtomicU64::new(0),
            played: AtomicU64::new(0),
            sample_rate: AtomicU64::new(sample_rate as u64),
            channels: AtomicU64::new(channels as u64),
            healthy: AtomicBool::new(true),
        }
    }

    /// Starts a new stream with a fresh position.
    pub fn reset(&self, sample_rate: u32, channels: u32) {
        self.sample_rate.store(sample_rate as u64, Ordering::SeqCst);
        self.channels.store(channels as u64, Ordering::SeqCst);
        self.queued.store(0, Ordering::SeqCst);
        self.played.store(0, Ordering::SeqCst);
        self.healthy.store(true, Ordering::SeqCst);
    }

    pub fn add_queued(&self, amount: u64) {
        self.queued.fetch_add(amount, Ordering::Release);
    }

    pub fn add_played(&self, amount: u64) {
        self.played.fetch_add(amount, Ordering::Release);
    }

    /// Samples queued but not yet played.
    pub fn pending(&self) -> u64 {
        let queued = self.queued.load(Ordering::Acquire);
        let played = self.played.load(Ordering::Acquire);
        queued.saturating_sub(played)
    }

    /// How long the pending samples take to play.
    pub fn pending_duration(&self) -> Duration {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        let channels = self.channels.load(Ordering::Relaxed);
        if rate == 0 || channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.pending() / channels;
        Duration::from_secs_f64(frames as f64 / rate as f64)
    }

    /// Seconds of audio played so far.
    pub fn played_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Relaxed) as f64;
        let channels = self.channels.load(Ordering::Relaxed) as f64;
        if rate > 0.0 && channels > 0.0 {
            self.played.load(Ordering::Relaxed) as f64 / (rate * channels)
        } else {
            0.0
        }
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
