use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::clip::TransientClip;
use super::sink::{AudioSink, PlayableSource};
use crate::config::{base_url, ClientConfig};
use crate::error::PlaybackError;
use crate::kernel::segment::{Segment, SegmentKind};

/// Observable queue state. Cosmetic: ordering does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackProgress {
    pub is_playing: bool,
    /// Segment being attempted. None when idle (the UI's "-1").
    pub current_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFailure {
    pub index: usize,
    pub kind: SegmentKind,
}

/// What happened during one `play` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub played: usize,
    pub skipped: usize,
    pub failures: Vec<SegmentFailure>,
}

impl PlaybackReport {
    pub fn attempted(&self) -> usize {
        self.played + self.skipped + self.failures.len()
    }
}

enum SegmentOutcome {
    Played,
    Skipped,
}

/// Plays segment lists one after the other on a single audio output.
///
/// A `play` call holds the output for its whole duration, so two callers
/// never overlap on the sink. Individual segment failures are logged and
/// treated as finished; `play` itself cannot fail.
pub struct PlaybackQueue {
    sink: Arc<dyn AudioSink>,
    origin: Url,
    clip_dir: PathBuf,
    default_pause: Duration,
    output: Mutex<()>,
    progress: watch::Sender<PlaybackProgress>,
}

impl PlaybackQueue {
    pub fn new(sink: Arc<dyn AudioSink>, origin: Url, clip_dir: impl Into<PathBuf>) -> Self {
        let (progress, _) = watch::channel(PlaybackProgress::default());
        Self {
            sink,
            origin: base_url(origin),
            clip_dir: clip_dir.into(),
            default_pause: ClientConfig::default().default_pause,
            output: Mutex::new(()),
            progress,
        }
    }

    pub fn from_config(sink: Arc<dyn AudioSink>, origin: Url, config: &ClientConfig) -> Self {
        Self::new(sink, origin, config.clip_dir.clone()).with_default_pause(config.default_pause)
    }

    pub fn with_default_pause(mut self, pause: Duration) -> Self {
        self.default_pause = pause;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.progress.borrow().is_playing
    }

    pub fn current_index(&self) -> Option<usize> {
        self.progress.borrow().current_index
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackProgress> {
        self.progress.subscribe()
    }

    /// Plays `segments` in order and returns once every one has been attempted.
    pub async fn play(&self, segments: &[Segment]) -> PlaybackReport {
        let _output = self.output.lock().await;
        self.progress.send_replace(PlaybackProgress {
            is_playing: true,
            current_index: None,
        });

        let mut report = PlaybackReport::default();
        for (index, segment) in segments.iter().enumerate() {
            self.progress.send_modify(|progress| progress.current_index = Some(index));

            match self.play_segment(segment).await {
                Ok(SegmentOutcome::Played) => report.played += 1,
                Ok(SegmentOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(index, kind = ?segment.kind(), error = %e, "segment playback failed, moving on");
                    report.failures.push(SegmentFailure {
                        index,
                        kind: segment.kind(),
                    });
                }
            }
        }

        self.progress.send_replace(PlaybackProgress::default());
        debug!(?report, "playback finished");
        report
    }

    async fn play_segment(&self, segment: &Segment) -> Result<SegmentOutcome, PlaybackError> {
        match segment {
            Segment::Pause { duration } => {
                tokio::time::sleep(pause_length(*duration, self.default_pause)).await;
                Ok(SegmentOutcome::Played)
            }
            Segment::Sound { file: Some(file), tag } => {
                let url = resolve_sound_source(&self.origin, file)?;
                debug!(%tag, %url, "sound effect");
                self.sink.play(PlayableSource::Remote(url)).await?;
                Ok(SegmentOutcome::Played)
            }
            Segment::Sound { file: None, tag } => {
                debug!(%tag, "sound effect without a file, skipped");
                Ok(SegmentOutcome::Skipped)
            }
            Segment::Text { tts_audio: Some(encoded), .. } => {
                let clip = TransientClip::decode(&self.clip_dir, encoded)?;
                let result = self.sink.play(PlayableSource::Clip(clip.path().to_path_buf())).await;
                drop(clip);
                result?;
                Ok(SegmentOutcome::Played)
            }
            Segment::Text { tts_audio: None, .. } => Ok(SegmentOutcome::Skipped),
        }
    }
}

/// Explicit durations win; missing or unusable ones fall back to `default`.
pub fn pause_length(duration: Option<f64>, default: Duration) -> Duration {
    duration
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

/// Appends a backend sound path to the origin, keeping any path prefix the
/// origin has. Absolute URLs pass through.
pub fn resolve_sound_source(origin: &Url, file: &str) -> Result<Url, PlaybackError> {
    let file = file.trim();
    if let Ok(absolute) = Url::parse(file) {
        return Ok(absolute);
    }
    base_url(origin.clone())
        .join(file.trim_start_matches('/'))
        .map_err(|e| PlaybackError::Source(format!("{file}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_length_defaults_and_rejects_garbage() {
        let default = Duration::from_millis(1500);
        assert_eq!(pause_length(None, default), default);
        assert_eq!(pause_length(Some(0.25), default), Duration::from_millis(250));
        assert_eq!(pause_length(Some(-1.0), default), default);
        assert_eq!(pause_length(Some(f64::NAN), default), default);
    }

    #[test]
    fn sound_paths_resolve_against_origin() {
        let origin = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            resolve_sound_source(&origin, "/static/sounds/dog_barking.mp3").unwrap().as_str(),
            "http://localhost:8000/static/sounds/dog_barking.mp3"
        );
        assert_eq!(
            resolve_sound_source(&origin, "https://cdn.example.com/bell.mp3").unwrap().as_str(),
            "https://cdn.example.com/bell.mp3"
        );

        let prefixed = Url::parse("http://host/proxy").unwrap();
        assert_eq!(
            resolve_sound_source(&prefixed, "/static/sounds/dog.mp3").unwrap().as_str(),
            "http://host/proxy/static/sounds/dog.mp3"
        );
        assert_eq!(
            resolve_sound_source(&prefixed, "static/sounds/dog.mp3").unwrap().as_str(),
            "http://host/proxy/static/sounds/dog.mp3"
        );
    }
}
