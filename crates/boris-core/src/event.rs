//! Coded events and observation types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modifier::Modifiers;
use crate::time::{EventTime, Timestamp};

/// Label used for events coded without a focal subject.
pub const NO_FOCAL_SUBJECT: &str = "No focal subject";

/// Display name of a subject; the empty name is the "no focal subject" one.
#[must_use]
pub const fn subject_label(subject: &str) -> &str {
    if subject.is_empty() {
        NO_FOCAL_SUBJECT
    } else {
        subject
    }
}

/// The kind of material an observation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationType {
    Media,
    Live,
    Images,
    ViewerMedia,
    ViewerLive,
    ViewerImages,
}

impl ObservationType {
    /// Image observations are ordered by picture index, not by time.
    #[must_use]
    pub const fn orders_by_image_index(self) -> bool {
        matches!(self, Self::Images | Self::ViewerImages)
    }

    /// Media, live and viewer observations reject times beyond
    /// [`Timestamp::MAX_ABS`].
    #[must_use]
    pub const fn checks_time_range(self) -> bool {
        !matches!(self, Self::Images)
    }
}

/// Role of an event in the start/stop pairing of its behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Start,
    Stop,
    Point,
}

impl EventKind {
    /// Status column value used by tabular exports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Point => "POINT",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where in the coded material an event sits, beyond its time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaPosition {
    #[default]
    Unspecified,
    /// Frame index in the media file.
    Frame { index: u64 },
    /// Picture of an image-set observation.
    Image { index: u64, path: String },
}

impl MediaPosition {
    #[must_use]
    pub const fn image_index(&self) -> Option<u64> {
        match self {
            Self::Image { index, .. } => Some(*index),
            Self::Unspecified | Self::Frame { .. } => None,
        }
    }
}

/// Ordering key of an event inside its observation.
///
/// Media and live observations order by time, image observations by
/// picture index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortKey {
    Time(Timestamp),
    Image(u64),
    Missing,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(t) => write!(f, "{t} s"),
            Self::Image(index) => write!(f, "image #{index}"),
            Self::Missing => write!(f, "NA"),
        }
    }
}

impl From<Timestamp> for SortKey {
    fn from(value: Timestamp) -> Self {
        Self::Time(value)
    }
}

/// A coded event as stored in an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: EventTime,
    /// Empty when no focal subject was selected.
    pub subject: String,
    pub code: String,
    pub modifiers: Modifiers,
    #[serde(default)]
    pub comment: String,
    pub kind: EventKind,
    #[serde(default)]
    pub position: MediaPosition,
}

impl Event {
    #[must_use]
    pub fn sort_key(&self, observation_type: ObservationType) -> SortKey {
        sort_key(self.time, &self.position, observation_type)
    }

    /// Subject label, substituting [`NO_FOCAL_SUBJECT`] for the empty name.
    #[must_use]
    pub fn subject_label(&self) -> &str {
        subject_label(&self.subject)
    }

    pub(crate) fn matches(&self, subject: &str, code: &str) -> bool {
        self.subject == subject && self.code == code
    }
}

/// A candidate event supplied by the caller; its kind is decided by the
/// timeline engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDraft {
    pub time: Option<Timestamp>,
    pub subject: String,
    pub code: String,
    pub modifiers: Modifiers,
    pub comment: String,
    pub position: MediaPosition,
}

impl EventDraft {
    /// A draft at `time` with no subject, modifiers or comment.
    #[must_use]
    pub fn at(time: Timestamp, code: impl Into<String>) -> Self {
        Self {
            time: Some(time),
            code: code.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    #[must_use]
    pub fn position(mut self, position: MediaPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn sort_key(&self, observation_type: ObservationType) -> SortKey {
        sort_key(self.time.into(), &self.position, observation_type)
    }

    pub(crate) fn into_event(self, kind: EventKind) -> Event {
        Event {
            time: self.time.into(),
            subject: self.subject,
            code: self.code,
            modifiers: self.modifiers,
            comment: self.comment,
            kind,
            position: self.position,
        }
    }
}

fn sort_key(time: EventTime, position: &MediaPosition, observation_type: ObservationType) -> SortKey {
    if observation_type.orders_by_image_index() {
        return position.image_index().map_or(SortKey::Missing, SortKey::Image);
    }
    time.seconds().map_or(SortKey::Missing, SortKey::Time)
}
