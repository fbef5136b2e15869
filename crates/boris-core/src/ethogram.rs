//! The ethogram: catalog of behaviors that may be coded.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modifier::ModifierSet;

/// Whether a behavior is instantaneous or has a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorType {
    #[serde(alias = "Point event")]
    Point,
    #[serde(alias = "State event")]
    State,
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::State => write!(f, "state"),
        }
    }
}

/// A behavior definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    #[serde(rename = "type")]
    pub kind: BehaviorType,

    /// Codes stopped automatically when this behavior starts.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ModifierSet>,
}

impl Behavior {
    #[must_use]
    pub const fn point() -> Self {
        Self {
            kind: BehaviorType::Point,
            excluded: BTreeSet::new(),
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state() -> Self {
        Self {
            kind: BehaviorType::State,
            excluded: BTreeSet::new(),
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn excluding<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(codes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, sets: Vec<ModifierSet>) -> Self {
        self.modifiers = sets;
        self
    }

    #[must_use]
    pub fn is_state(&self) -> bool {
        self.kind == BehaviorType::State
    }

    /// True if any modifier set is asked when the state stops.
    #[must_use]
    pub fn asks_at_stop(&self) -> bool {
        self.modifiers.iter().any(|s| s.ask_at_stop)
    }
}

/// Behaviors keyed by code, iterated in code order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ethogram {
    behaviors: BTreeMap<String, Behavior>,
}

impl Ethogram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, behavior: Behavior) {
        self.behaviors.insert(code.into(), behavior);
    }

    #[must_use]
    pub fn with(mut self, code: impl Into<String>, behavior: Behavior) -> Self {
        self.insert(code, behavior);
        self
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Behavior> {
        self.behaviors.get(code)
    }

    #[must_use]
    pub fn is_state(&self, code: &str) -> bool {
        self.get(code).is_some_and(Behavior::is_state)
    }

    /// Codes of every state behavior, sorted.
    pub fn state_codes(&self) -> impl Iterator<Item = &str> {
        self.behaviors
            .iter()
            .filter(|(_, b)| b.is_state())
            .map(|(code, _)| code.as_str())
    }

    /// Codes that `code` stops when it starts.
    pub fn excluded_by(&self, code: &str) -> impl Iterator<Item = &str> {
        self.get(code)
            .into_iter()
            .flat_map(|b| b.excluded.iter().map(String::as_str))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Behavior)> {
        self.behaviors.iter().map(|(code, b)| (code.as_str(), b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// A copy in which every exclusion is declared in both directions.
    ///
    /// Exclusion matrices are edited as symmetric tables; project files
    /// sometimes record only one side.
    #[must_use]
    pub fn symmetric_exclusions(&self) -> Self {
        let mut mirrored = self.clone();
        for (code, behavior) in &self.behaviors {
            for other in &behavior.excluded {
                if let Some(target) = mirrored.behaviors.get_mut(other) {
                    target.excluded.insert(code.clone());
                }
            }
        }
        mirrored
    }
}
