//! Project files.
//!
//! A project is a JSON document holding the ethogram and the observations.
//! Events are stored as positional rows:
//!
//! ```text
//! [time, subject, code, modifiers, comment]                 live / viewer
//! [time, subject, code, modifiers, comment, frame]          media
//! [time, subject, code, modifiers, comment, index, path]    images
//! ```
//!
//! A `null` time stands for a missing value. Event kinds are not stored;
//! they are recomputed from the order of the rows when the file is loaded.
//! Keys this tool does not know about are kept and written back unchanged.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use boris_core::{
    Ethogram, Event, EventKind, EventTime, MediaPosition, Modifiers, ObservationType, Timestamp,
    classify_kinds,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Column indexes of an event row.
mod column {
    pub const TIME: usize = 0;
    pub const SUBJECT: usize = 1;
    pub const CODE: usize = 2;
    pub const MODIFIERS: usize = 3;
    pub const COMMENT: usize = 4;
    pub const FRAME: usize = 5;
    pub const IMAGE_INDEX: usize = 5;
    pub const IMAGE_PATH: usize = 6;
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    ethogram: Ethogram,
    #[serde(default)]
    observations: BTreeMap<String, ObservationFile>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObservationFile {
    #[serde(rename = "type")]
    kind: ObservationType,
    #[serde(default)]
    events: Vec<Vec<Value>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// One observation with its decoded events.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub kind: ObservationType,
    pub events: Vec<Event>,
    extra: Map<String, Value>,
}

impl Observation {
    #[must_use]
    pub fn new(kind: ObservationType, events: Vec<Event>) -> Self {
        Self {
            kind,
            events,
            extra: Map::new(),
        }
    }

    /// Distinct subjects of the events, in first-seen order.
    pub fn subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = Vec::new();
        for event in &self.events {
            if !subjects.contains(&event.subject.as_str()) {
                subjects.push(event.subject.as_str());
            }
        }
        subjects
    }
}

/// A loaded project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub ethogram: Ethogram,
    pub observations: BTreeMap<String, Observation>,
    extra: Map<String, Value>,
}

impl Project {
    #[must_use]
    pub fn new(ethogram: Ethogram) -> Self {
        Self {
            ethogram,
            observations: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("failed to load project {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: ProjectFile = serde_json::from_str(text).context("invalid project JSON")?;
        let mut observations = BTreeMap::new();
        for (id, observation) in file.observations {
            let events = observation
                .events
                .iter()
                .enumerate()
                .map(|(row, values)| {
                    decode_event(values, observation.kind, &file.ethogram)
                        .with_context(|| format!("observation {id:?}, row {row}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let events = classify_kinds(&events, &file.ethogram);
            tracing::debug!(observation = %id, events = events.len(), "loaded observation");
            observations.insert(
                id,
                Observation {
                    kind: observation.kind,
                    events,
                    extra: observation.extra,
                },
            );
        }
        Ok(Self {
            ethogram: file.ethogram,
            observations,
            extra: file.extra,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let file = ProjectFile {
            ethogram: self.ethogram.clone(),
            observations: self
                .observations
                .iter()
                .map(|(id, observation)| {
                    let events = observation
                        .events
                        .iter()
                        .map(|event| encode_event(event, observation.kind))
                        .collect();
                    let file = ObservationFile {
                        kind: observation.kind,
                        events,
                        extra: observation.extra.clone(),
                    };
                    (id.clone(), file)
                })
                .collect(),
            extra: self.extra.clone(),
        };
        serde_json::to_string_pretty(&file).context("failed to serialize project")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn observation(&self, id: &str) -> Result<&Observation> {
        match self.observations.get(id) {
            Some(observation) => Ok(observation),
            None => bail!("observation {id:?} not found in project"),
        }
    }

    pub fn observation_mut(&mut self, id: &str) -> Result<&mut Observation> {
        match self.observations.get_mut(id) {
            Some(observation) => Ok(observation),
            None => bail!("observation {id:?} not found in project"),
        }
    }
}

fn text_at<'a>(values: &'a [Value], index: usize) -> Result<&'a str> {
    match values.get(index) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => bail!("column {index}: expected text, found {other}"),
    }
}

fn index_at(values: &[Value], index: usize) -> Result<Option<u64>> {
    match values.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(i) => Ok(Some(i)),
            None => bail!("column {index}: expected a non-negative integer, found {n}"),
        },
        Some(Value::String(s)) if s == "NA" => Ok(None),
        Some(other) => bail!("column {index}: expected an index, found {other}"),
    }
}

fn decode_time(value: Option<&Value>) -> Result<EventTime> {
    let text = match value {
        None | Some(Value::Null) => return Ok(EventTime::NotAvailable),
        Some(Value::String(s)) if s == "NA" || s == "NaN" => return Ok(EventTime::NotAvailable),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => bail!("expected a time, found {other}"),
    };
    let value = text
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .with_context(|| format!("invalid time {text:?}"))?;
    Ok(EventTime::Seconds(Timestamp::new(value)))
}

/// Writes the decimal digits of a time as a JSON number.
fn encode_time(time: EventTime) -> Value {
    time.seconds()
        .and_then(|t| t.to_string().parse::<Number>().ok())
        .map_or(Value::Null, Value::Number)
}

/// Decodes an event row; the kind is assigned afterwards.
fn decode_event(values: &[Value], kind: ObservationType, ethogram: &Ethogram) -> Result<Event> {
    let code = text_at(values, column::CODE)?;
    if code.is_empty() {
        bail!("missing behavior code");
    }
    let Some(behavior) = ethogram.get(code) else {
        bail!("behavior {code:?} is not defined in the ethogram");
    };
    let modifiers = Modifiers::parse_legacy(text_at(values, column::MODIFIERS)?, &behavior.modifiers)
        .context("invalid modifiers")?;

    let position = if kind.orders_by_image_index() {
        match index_at(values, column::IMAGE_INDEX)? {
            Some(index) => MediaPosition::Image {
                index,
                path: text_at(values, column::IMAGE_PATH)?.to_string(),
            },
            None => MediaPosition::Unspecified,
        }
    } else if kind == ObservationType::Media {
        index_at(values, column::FRAME)?
            .map_or(MediaPosition::Unspecified, |index| MediaPosition::Frame { index })
    } else {
        MediaPosition::Unspecified
    };

    Ok(Event {
        time: decode_time(values.get(column::TIME))?,
        subject: text_at(values, column::SUBJECT)?.to_string(),
        code: code.to_string(),
        modifiers,
        comment: text_at(values, column::COMMENT)?.to_string(),
        kind: EventKind::Point,
        position,
    })
}

fn encode_event(event: &Event, kind: ObservationType) -> Vec<Value> {
    let mut values = vec![
        encode_time(event.time),
        Value::String(event.subject.clone()),
        Value::String(event.code.clone()),
        Value::String(event.modifiers.to_legacy()),
        Value::String(event.comment.clone()),
    ];
    match (&event.position, kind) {
        (MediaPosition::Image { index, path }, _) => {
            values.push(Value::from(*index));
            values.push(Value::String(path.clone()));
        }
        (MediaPosition::Frame { index }, ObservationType::Media) => values.push(Value::from(*index)),
        (_, ObservationType::Media) => values.push(Value::Null),
        _ => {}
    }
    values
}
