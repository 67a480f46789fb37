pub mod buffer;
pub mod clock;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod output;
pub mod playback;
pub mod source;
