use serde::{Deserialize, Deserializer, Serialize};

/// One playable unit of conversational output, as sent by the backend.
///
/// Wire form is a flat object tagged by `type`; the backend also sends the
/// fields of the other kinds as `null`, which are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
        /// Base64 MP3 speech for `content`, when the backend synthesized it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tts_audio: Option<String>,
    },
    Sound {
        #[serde(rename = "sound_tag", default, deserialize_with = "null_as_default")]
        tag: String,
        /// Path relative to the backend origin, or an absolute URL.
        #[serde(rename = "sound_file", default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Pause {
        /// Seconds. Absent means the configured default (1.5s).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    Text,
    Sound,
    Pause,
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text { content: content.into(), tts_audio: None }
    }

    pub fn spoken(content: impl Into<String>, tts_audio: impl Into<String>) -> Self {
        Segment::Text { content: content.into(), tts_audio: Some(tts_audio.into()) }
    }

    pub fn sound(tag: impl Into<String>, file: impl Into<String>) -> Self {
        Segment::Sound { tag: tag.into(), file: Some(file.into()) }
    }

    pub fn pause(duration: Option<f64>) -> Self {
        Segment::Pause { duration }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text { .. } => SegmentKind::Text,
            Segment::Sound { .. } => SegmentKind::Sound,
            Segment::Pause { .. } => SegmentKind::Pause,
        }
    }
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
