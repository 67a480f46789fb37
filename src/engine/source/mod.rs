use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::error::PlayerError;

/// A raw PCM file opened for binary reading. Closed when dropped.
pub struct RawPcmFile {
    path: PathBuf,
    file: File,
}

impl RawPcmFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PlayerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| PlayerError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "opened audio file");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for RawPcmFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Drop for RawPcmFile {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "closing audio file");
    }
}
