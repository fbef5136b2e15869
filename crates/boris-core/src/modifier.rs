//! Structured modifier selections.
//!
//! A behavior may carry several modifier sets. A coded event stores one
//! [`ModifierValue`] per set. The legacy text form (`"sel1,sel2|sel3"`) is
//! only produced and parsed at the I/O boundary.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between modifier sets in the legacy text form.
pub const SET_SEPARATOR: char = '|';

/// Separator between values of a multiple-selection set.
pub const VALUE_SEPARATOR: char = ',';

/// Legacy marker for "nothing selected".
const NONE_MARKER: &str = "None";

/// Errors raised when a modifier selection does not fit its sets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedModifierError {
    /// The number of `|`-separated segments differs from the number of sets.
    #[error("expected {expected} modifier set(s), found {found}")]
    SetCount { expected: usize, found: usize },

    /// A selected value is not offered by its set.
    #[error("value {value:?} is not part of modifier set {set:?}")]
    UnknownValue { set: String, value: String },

    /// A numeric set received a non-numeric value.
    #[error("modifier set {set:?} expects a number, got {value:?}")]
    NotNumeric { set: String, value: String },

    /// A single-selection set received several values.
    #[error("modifier set {set:?} accepts a single value, got {value:?}")]
    MultipleValues { set: String, value: String },

    /// A selection variant does not match the type of its set.
    #[error("modifier set {set:?} is {expected}, selection is {found}")]
    TypeMismatch {
        set: String,
        expected: ModifierType,
        found: ModifierType,
    },
}

/// How values of a modifier set are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierType {
    SingleSelection,
    MultiSelection,
    Numeric,
    ExternalData,
}

impl ModifierType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleSelection => "single_selection",
            Self::MultiSelection => "multi_selection",
            Self::Numeric => "numeric",
            Self::ExternalData => "external_data",
        }
    }
}

impl fmt::Display for ModifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One modifier set attached to a behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierSet {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ModifierType,

    /// Allowed values. Ignored for numeric and external-data sets.
    #[serde(default)]
    pub values: Vec<String>,

    /// Ask for the selection when the state stops rather than when it starts.
    #[serde(default)]
    pub ask_at_stop: bool,
}

impl ModifierSet {
    fn offers(&self, value: &str) -> bool {
        self.values.is_empty() || self.values.iter().any(|v| v == value)
    }
}

/// The selection made for one modifier set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModifierValue {
    Single(Option<String>),
    Multi(Vec<String>),
    Numeric(Option<Decimal>),
    External(Option<String>),
}

impl ModifierValue {
    /// The empty selection for a set of the given type.
    #[must_use]
    pub const fn empty(kind: ModifierType) -> Self {
        match kind {
            ModifierType::SingleSelection => Self::Single(None),
            ModifierType::MultiSelection => Self::Multi(Vec::new()),
            ModifierType::Numeric => Self::Numeric(None),
            ModifierType::ExternalData => Self::External(None),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ModifierType {
        match self {
            Self::Single(_) => ModifierType::SingleSelection,
            Self::Multi(_) => ModifierType::MultiSelection,
            Self::Numeric(_) => ModifierType::Numeric,
            Self::External(_) => ModifierType::ExternalData,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(v) | Self::External(v) => v.is_none(),
            Self::Multi(v) => v.is_empty(),
            Self::Numeric(v) => v.is_none(),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Single(v) | Self::External(v) => v.clone().unwrap_or_default(),
            Self::Multi(v) => v.join(&VALUE_SEPARATOR.to_string()),
            Self::Numeric(v) => v.map(|n| n.normalize().to_string()).unwrap_or_default(),
        }
    }

    fn check(&self, set: &ModifierSet) -> Result<(), MalformedModifierError> {
        if self.kind() != set.kind {
            return Err(MalformedModifierError::TypeMismatch {
                set: set.name.clone(),
                expected: set.kind,
                found: self.kind(),
            });
        }
        let unknown = |value: &String| MalformedModifierError::UnknownValue {
            set: set.name.clone(),
            value: value.clone(),
        };
        match self {
            Self::Single(Some(value)) if !set.offers(value) => Err(unknown(value)),
            Self::Multi(values) => values
                .iter()
                .find(|v| !set.offers(v))
                .map_or(Ok(()), |v| Err(unknown(v))),
            _ => Ok(()),
        }
    }

    fn parse(segment: &str, set: &ModifierSet) -> Result<Self, MalformedModifierError> {
        let segment = segment.trim();
        if segment.is_empty() || segment == NONE_MARKER {
            return Ok(Self::empty(set.kind));
        }
        let value = match set.kind {
            ModifierType::SingleSelection => {
                if segment.contains(VALUE_SEPARATOR) {
                    return Err(MalformedModifierError::MultipleValues {
                        set: set.name.clone(),
                        value: segment.to_string(),
                    });
                }
                Self::Single(Some(segment.to_string()))
            }
            ModifierType::MultiSelection => Self::Multi(
                segment
                    .split(VALUE_SEPARATOR)
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != NONE_MARKER)
                    .map(String::from)
                    .collect(),
            ),
            ModifierType::Numeric => {
                let number =
                    Decimal::from_str(segment).map_err(|_| MalformedModifierError::NotNumeric {
                        set: set.name.clone(),
                        value: segment.to_string(),
                    })?;
                Self::Numeric(Some(number))
            }
            ModifierType::ExternalData => Self::External(Some(segment.to_string())),
        };
        value.check(set)?;
        Ok(value)
    }
}

/// The full modifier selection of one event, one entry per set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(Vec<ModifierValue>);

impl Modifiers {
    /// No modifier sets at all.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub const fn new(values: Vec<ModifierValue>) -> Self {
        Self(values)
    }

    /// An empty selection for every set.
    #[must_use]
    pub fn empty_for(sets: &[ModifierSet]) -> Self {
        Self(sets.iter().map(|s| ModifierValue::empty(s.kind)).collect())
    }

    #[must_use]
    pub fn values(&self) -> &[ModifierValue] {
        &self.0
    }

    /// True when nothing is selected in any set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(ModifierValue::is_empty)
    }

    /// Checks the selection against the sets of its behavior.
    ///
    /// An entirely missing selection is accepted and expanded to one empty
    /// value per set.
    pub fn conform(self, sets: &[ModifierSet]) -> Result<Self, MalformedModifierError> {
        if self.0.is_empty() {
            return Ok(Self::empty_for(sets));
        }
        if self.0.len() != sets.len() {
            return Err(MalformedModifierError::SetCount {
                expected: sets.len(),
                found: self.0.len(),
            });
        }
        for (value, set) in self.0.iter().zip(sets) {
            value.check(set)?;
        }
        Ok(self)
    }

    /// Renders the legacy text form: `|` between sets, `,` inside a
    /// multiple selection.
    #[must_use]
    pub fn to_legacy(&self) -> String {
        self.0
            .iter()
            .map(ModifierValue::render)
            .collect::<Vec<_>>()
            .join(&SET_SEPARATOR.to_string())
    }

    /// Parses the legacy text form against the sets of a behavior.
    pub fn parse_legacy(text: &str, sets: &[ModifierSet]) -> Result<Self, MalformedModifierError> {
        if text.trim().is_empty() {
            return Ok(Self::empty_for(sets));
        }
        let segments: Vec<&str> = text.split(SET_SEPARATOR).collect();
        if segments.len() != sets.len() {
            return Err(MalformedModifierError::SetCount {
                expected: sets.len(),
                found: segments.len(),
            });
        }
        segments
            .iter()
            .zip(sets)
            .map(|(segment, set)| ModifierValue::parse(segment, set))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_legacy())
    }
}
