use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::output::{AudioDevice, ErrorCode, Status};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Unable to load: {}\n{source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read audio data: {0}")]
    Read(#[from] io::Error),

    #[error("no audio output device available")]
    NoDevice,

    #[error("{message}")]
    Backend { code: ErrorCode, message: String },
}

/// Turns a backend status into a [`PlayerError`], asking `device` for the text.
///
/// Success passes through untouched. This is the only place backend codes are
/// escalated; callers propagate the error up to `main`.
pub fn check<D: AudioDevice>(device: &D, status: Status) -> Result<(), PlayerError> {
    status.map_err(|code| PlayerError::Backend {
        code,
        message: device.describe_error(code),
    })
}
