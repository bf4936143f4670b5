pub mod clip;
pub mod playback;
pub mod sink;

pub use playback::{PlaybackProgress, PlaybackQueue, PlaybackReport, SegmentFailure};
#[cfg(feature = "speaker")]
pub use sink::SpeakerSink;
pub use sink::{AudioSink, LogSink, PlayableSource};
