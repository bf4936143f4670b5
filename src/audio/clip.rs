use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PlaybackError;

/// Decoded speech written to disk for the duration of one playback.
///
/// The file is removed when the clip is dropped, whether playback finished
/// or failed.
#[derive(Debug)]
pub struct TransientClip {
    file: NamedTempFile,
}

impl TransientClip {
    pub fn decode(dir: &Path, encoded: &str) -> Result<Self, PlaybackError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_bytes(dir, &bytes)
    }

    pub fn from_bytes(dir: &Path, bytes: &[u8]) -> Result<Self, PlaybackError> {
        std::fs::create_dir_all(dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("clip-")
            .suffix(".mp3")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), len = bytes.len(), "clip written");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TransientClip {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "clip released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_exists_only_while_clip_lives() {
        let dir = tempfile::tempdir().unwrap();
        let clip = TransientClip::decode(dir.path(), "SUQzBA==").unwrap();
        let path = clip.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3\x04");

        drop(clip);
        assert!(!path.exists());
    }

    #[test]
    fn bad_base64_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = TransientClip::decode(dir.path(), "not base64!").unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
