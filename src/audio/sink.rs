use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Url;
use tracing::info;

use crate::error::PlaybackError;

/// Something the output device can play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource {
    /// Fixed sound effect served by the backend.
    Remote(Url),
    /// Decoded speech on disk, valid only during the `play` call.
    Clip(PathBuf),
}

impl fmt::Display for PlayableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayableSource::Remote(url) => write!(f, "{url}"),
            PlayableSource::Clip(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The single audio output. `play` returns once the source has finished
/// (or failed); implementations must not return early.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, source: PlayableSource) -> Result<(), PlaybackError>;
}

/// Headless output: logs what would be played and finishes immediately.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl AudioSink for LogSink {
    async fn play(&self, source: PlayableSource) -> Result<(), PlaybackError> {
        info!(%source, "[AUDIO] play");
        Ok(())
    }
}

#[cfg(feature = "speaker")]
pub use speaker::SpeakerSink;

#[cfg(feature = "speaker")]
mod speaker {
    use std::io::Cursor;
    use std::sync::mpsc as std_mpsc;

    use async_trait::async_trait;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tokio::sync::oneshot;
    use tracing::{info, warn};

    use super::{AudioSink, PlayableSource};
    use crate::error::PlaybackError;

    struct SpeakerCommand {
        bytes: Vec<u8>,
        done: oneshot::Sender<Result<(), PlaybackError>>,
    }

    /// Default output device through rodio.
    ///
    /// `OutputStream` is not `Send`, so it lives on a dedicated thread that
    /// plays one command at a time until its sink runs dry.
    pub struct SpeakerSink {
        commands: std_mpsc::Sender<SpeakerCommand>,
        http: reqwest::Client,
    }

    impl SpeakerSink {
        pub fn open() -> Result<Self, PlaybackError> {
            let (commands, queue) = std_mpsc::channel::<SpeakerCommand>();
            let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), PlaybackError>>();

            std::thread::Builder::new()
                .name("jeanne-speaker".to_string())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = ready_tx.send(Err(PlaybackError::Sink(e.to_string())));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    info!("speaker thread ready");

                    for command in queue {
                        let result = play_blocking(&handle, command.bytes);
                        let _ = command.done.send(result);
                    }
                })?;

            ready_rx
                .recv()
                .map_err(|_| PlaybackError::Sink("speaker thread exited during startup".to_string()))??;

            Ok(Self {
                commands,
                http: reqwest::Client::new(),
            })
        }

        async fn load(&self, source: &PlayableSource) -> Result<Vec<u8>, PlaybackError> {
            match source {
                PlayableSource::Clip(path) => Ok(tokio::fs::read(path).await?),
                PlayableSource::Remote(url) => {
                    let response = self
                        .http
                        .get(url.clone())
                        .send()
                        .await
                        .and_then(|r| r.error_for_status())
                        .map_err(|e| PlaybackError::Source(format!("{url}: {e}")))?;
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| PlaybackError::Source(format!("{url}: {e}")))?;
                    Ok(bytes.to_vec())
                }
            }
        }
    }

    fn play_blocking(handle: &OutputStreamHandle, bytes: Vec<u8>) -> Result<(), PlaybackError> {
        let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Sink(e.to_string()))?;
        let source = Decoder::new(Cursor::new(bytes)).map_err(|e| PlaybackError::Sink(format!("decode failed: {e}")))?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }

    #[async_trait]
    impl AudioSink for SpeakerSink {
        async fn play(&self, source: PlayableSource) -> Result<(), PlaybackError> {
            let bytes = self.load(&source).await?;
            let (done, finished) = oneshot::channel();
            self.commands
                .send(SpeakerCommand { bytes, done })
                .map_err(|_| PlaybackError::Sink("speaker thread is gone".to_string()))?;
            finished.await.unwrap_or_else(|_| {
                warn!(%source, "speaker dropped a command");
                Err(PlaybackError::Sink("speaker dropped the command".to_string()))
            })
        }
    }
}
