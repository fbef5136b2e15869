//! Event timeline engine.
//!
//! Maintains the ordered event list of one observation. Every mutation is a
//! pure function from the current list to a new list, so a rejected call
//! leaves the caller's list untouched.
//!
//! # Invariants
//!
//! 1. Events are ordered by [`SortKey`]: binary insertion for media and live
//!    observations, stable re-sort by picture index for image observations.
//! 2. For every (subject, state behavior) pair the events alternate
//!    `Start`, `Stop`, `Start`, ... The kind is decided once, when the event
//!    is recorded, and [`validate_pairing`] re-checks the whole list after
//!    every mutation.
//! 3. A state is active at a position when an odd number of matching events
//!    sit at or before it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::ethogram::Ethogram;
use crate::event::{Event, EventDraft, EventKind, MediaPosition, ObservationType, SortKey};
use crate::modifier::{MalformedModifierError, Modifiers};
use crate::time::{EventTime, Timestamp};

/// Errors returned by timeline mutations. No mutation is applied when one
/// is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// An event with the same position, subject and behavior already exists.
    #[error("{code:?} is already coded for subject {subject:?} at {at}")]
    DuplicateEvent {
        at: SortKey,
        subject: String,
        code: String,
    },

    /// The time does not fit a signed 32-bit second count.
    #[error("time {time} s is outside the accepted range of ±{max} s", max = Timestamp::MAX_ABS)]
    OutOfRangeTime { time: Timestamp },

    /// Media and live events need a time.
    #[error("event has no time")]
    MissingTime,

    /// Image events need a picture index.
    #[error("event has no image index")]
    MissingImageIndex,

    #[error("behavior {0:?} is not defined in the ethogram")]
    UnknownBehavior(String),

    #[error("malformed modifiers: {0}")]
    MalformedModifier(#[from] MalformedModifierError),

    #[error("start/stop pairing would break: {0}")]
    PairingViolation(#[from] PairingError),

    #[error("row {row} does not exist (observation has {len} events)")]
    RowOutOfBounds { row: usize, len: usize },
}

/// What is wrong with a row of the event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingProblem {
    /// A `Start` while the same state is already active.
    StartWhileActive,
    /// A `Stop` with no active `Start`.
    StopWithoutStart,
    /// A point behavior recorded as start/stop, or the reverse.
    KindMismatch,
    /// The row sits before its predecessor.
    OutOfOrder,
}

impl fmt::Display for PairingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StartWhileActive => "start while already active",
            Self::StopWithoutStart => "stop without a matching start",
            Self::KindMismatch => "event kind does not match behavior type",
            Self::OutOfOrder => "event out of order",
        };
        write!(f, "{s}")
    }
}

/// A broken row found by [`validate_pairing`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("row {row} ({code:?}, subject {subject:?}): {problem}")]
pub struct PairingError {
    pub row: usize,
    pub subject: String,
    pub code: String,
    pub problem: PairingProblem,
}

/// Policy knobs for recording events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPolicy {
    /// Re-coding an active state with a different modifier selection stops
    /// the running state and starts a new one instead of stopping it.
    /// Default: false.
    pub close_same_event: bool,

    /// How far before the triggering event a synthesized stop is placed.
    /// Default: 0.001 s.
    pub stop_offset: Timestamp,
}

impl Default for EventPolicy {
    fn default() -> Self {
        Self {
            close_same_event: false,
            stop_offset: Timestamp::MILLISECOND,
        }
    }
}

/// Everything the engine needs to know about the observation being coded.
#[derive(Debug, Clone, Copy)]
pub struct TimelineContext<'a> {
    pub ethogram: &'a Ethogram,
    pub observation_type: ObservationType,
    pub policy: EventPolicy,
}

impl<'a> TimelineContext<'a> {
    #[must_use]
    pub fn new(ethogram: &'a Ethogram, observation_type: ObservationType) -> Self {
        Self {
            ethogram,
            observation_type,
            policy: EventPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: EventPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn key(&self, event: &Event) -> SortKey {
        event.sort_key(self.observation_type)
    }

    /// Validates the position of a draft and returns its ordering key.
    fn check_position(&self, draft: &EventDraft) -> Result<SortKey, TimelineError> {
        if let Some(time) = draft.time {
            if self.observation_type.checks_time_range() && !time.is_within_range() {
                return Err(TimelineError::OutOfRangeTime { time });
            }
        }
        match draft.sort_key(self.observation_type) {
            SortKey::Missing if self.observation_type.orders_by_image_index() => {
                Err(TimelineError::MissingImageIndex)
            }
            SortKey::Missing => Err(TimelineError::MissingTime),
            key => Ok(key),
        }
    }

    fn check_duplicate(
        &self,
        events: &[Event],
        at: SortKey,
        subject: &str,
        code: &str,
    ) -> Result<(), TimelineError> {
        if events
            .iter()
            .any(|e| e.matches(subject, code) && self.key(e) == at)
        {
            return Err(TimelineError::DuplicateEvent {
                at,
                subject: subject.to_string(),
                code: code.to_string(),
            });
        }
        Ok(())
    }

    /// Inserts an event after the last positioned row at or before it.
    ///
    /// Rows without a position stay where they are and do not take part in
    /// the ordering.
    fn place(&self, events: &mut Vec<Event>, event: Event) {
        let key = self.key(&event);
        let index = events
            .iter()
            .rposition(|e| {
                let at = self.key(e);
                at != SortKey::Missing && at <= key
            })
            .map_or(0, |row| row + 1);
        events.insert(index, event);
    }

    /// Row of the active start of `code` for `subject` at `at`, if any.
    fn open_start(&self, events: &[Event], subject: &str, code: &str, at: SortKey) -> Option<usize> {
        let matching: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.matches(subject, code) && self.key(e) <= at)
            .map(|(row, _)| row)
            .collect();
        if matching.len() % 2 == 1 {
            matching.last().copied()
        } else {
            None
        }
    }

    /// A stop for `start`, placed just before the draft that triggers it.
    fn synthetic_stop(&self, start: &Event, trigger: &EventDraft) -> Event {
        let time = if self.observation_type.orders_by_image_index() {
            trigger.time
        } else {
            trigger.time.map(|t| t - self.policy.stop_offset)
        };
        debug!(
            subject = %start.subject,
            code = %start.code,
            trigger = %trigger.code,
            "synthesizing stop"
        );
        Event {
            time: time.into(),
            subject: start.subject.clone(),
            code: start.code.clone(),
            modifiers: start.modifiers.clone(),
            comment: String::new(),
            kind: EventKind::Stop,
            position: trigger.position.clone(),
        }
    }
}

/// Records a new event, or replaces row `edit_row` with `draft`.
///
/// The kind of the recorded event follows from the state of its behavior at
/// the draft position: a state behavior that is not active starts, an active
/// one stops. Recording a new start also stops, one `stop_offset` earlier,
/// every active state the behavior excludes for the same subject. With
/// [`EventPolicy::close_same_event`], re-coding an active state with a
/// different modifier selection stops the running state the same way and
/// starts a new one, while re-coding it with the same or no selection
/// leaves the list unchanged.
///
/// A stop reuses the modifiers of its start, unless the behavior asks for
/// modifiers at stop: then a non-empty stop selection is also written back
/// to the start.
///
/// Edits never synthesize stops.
pub fn insert_or_update_event(
    events: &[Event],
    draft: EventDraft,
    edit_row: Option<usize>,
    ctx: &TimelineContext<'_>,
) -> Result<Vec<Event>, TimelineError> {
    let behavior = ctx
        .ethogram
        .get(&draft.code)
        .ok_or_else(|| TimelineError::UnknownBehavior(draft.code.clone()))?;
    let key = ctx.check_position(&draft)?;
    let mut draft = draft;
    draft.modifiers = std::mem::take(&mut draft.modifiers).conform(&behavior.modifiers)?;

    let mut list = events.to_vec();
    if let Some(row) = edit_row {
        if row >= list.len() {
            return Err(TimelineError::RowOutOfBounds {
                row,
                len: list.len(),
            });
        }
        list.remove(row);
    }
    ctx.check_duplicate(&list, key, &draft.subject, &draft.code)?;

    let is_new = edit_row.is_none();
    let mut synthetic = Vec::new();

    let kind = if !behavior.is_state() {
        EventKind::Point
    } else if let Some(start_row) = ctx.open_start(&list, &draft.subject, &draft.code, key) {
        let start_modifiers = list[start_row].modifiers.clone();
        let restarts = is_new
            && ctx.policy.close_same_event
            && !behavior.asks_at_stop()
            && !draft.modifiers.is_empty()
            && draft.modifiers != start_modifiers;
        if restarts {
            synthetic.push(ctx.synthetic_stop(&list[start_row], &draft));
            EventKind::Start
        } else if is_new && ctx.policy.close_same_event && !behavior.asks_at_stop() {
            debug!(
                subject = %draft.subject,
                code = %draft.code,
                "state already active with the same modifiers, nothing recorded"
            );
            return Ok(list);
        } else {
            if behavior.asks_at_stop() && !draft.modifiers.is_empty() {
                debug!(
                    code = %draft.code,
                    modifiers = %draft.modifiers,
                    "assigning stop modifiers to start"
                );
                list[start_row].modifiers = draft.modifiers.clone();
            } else {
                draft.modifiers = start_modifiers;
            }
            EventKind::Stop
        }
    } else {
        EventKind::Start
    };

    if kind == EventKind::Start && is_new {
        for excluded in ctx.ethogram.excluded_by(&draft.code) {
            if excluded == draft.code || !ctx.ethogram.is_state(excluded) {
                continue;
            }
            if let Some(start_row) = ctx.open_start(&list, &draft.subject, excluded, key) {
                synthetic.push(ctx.synthetic_stop(&list[start_row], &draft));
            }
        }
    }

    for stop in synthetic {
        ctx.check_duplicate(&list, ctx.key(&stop), &stop.subject, &stop.code)?;
        ctx.place(&mut list, stop);
    }
    ctx.place(&mut list, draft.into_event(kind));

    validate_pairing(&list, ctx)?;
    Ok(list)
}

/// Removes the given rows.
///
/// Fails if a row does not exist or if the removal would leave a stop
/// without its start.
pub fn delete_events(
    events: &[Event],
    rows: &[usize],
    ctx: &TimelineContext<'_>,
) -> Result<Vec<Event>, TimelineError> {
    let rows: BTreeSet<usize> = rows.iter().copied().collect();
    if let Some(&row) = rows.iter().find(|&&row| row >= events.len()) {
        return Err(TimelineError::RowOutOfBounds {
            row,
            len: events.len(),
        });
    }
    let list: Vec<Event> = events
        .iter()
        .enumerate()
        .filter(|(row, _)| !rows.contains(row))
        .map(|(_, e)| e.clone())
        .collect();
    validate_pairing(&list, ctx)?;
    Ok(list)
}

/// Checks ordering and start/stop alternation of a whole event list.
///
/// Events of behaviors missing from the ethogram are only checked for
/// ordering. States left active at the end are allowed.
pub fn validate_pairing(events: &[Event], ctx: &TimelineContext<'_>) -> Result<(), PairingError> {
    let mut active: HashMap<(&str, &str), bool> = HashMap::new();
    let mut previous: Option<SortKey> = None;

    for (row, event) in events.iter().enumerate() {
        let fail = |problem| PairingError {
            row,
            subject: event.subject.clone(),
            code: event.code.clone(),
            problem,
        };

        let key = ctx.key(event);
        if key != SortKey::Missing {
            if previous.is_some_and(|p| key < p) {
                return Err(fail(PairingProblem::OutOfOrder));
            }
            previous = Some(key);
        }

        let Some(behavior) = ctx.ethogram.get(&event.code) else {
            continue;
        };
        let slot = (event.subject.as_str(), event.code.as_str());
        match (behavior.is_state(), event.kind) {
            (false, EventKind::Point) => {}
            (false, _) | (true, EventKind::Point) => {
                return Err(fail(PairingProblem::KindMismatch));
            }
            (true, EventKind::Start) => {
                if active.insert(slot, true) == Some(true) {
                    return Err(fail(PairingProblem::StartWhileActive));
                }
            }
            (true, EventKind::Stop) => {
                if active.insert(slot, false) != Some(true) {
                    return Err(fail(PairingProblem::StopWithoutStart));
                }
            }
        }
    }
    Ok(())
}

/// Assigns kinds by counting matching events, for lists recorded without
/// them.
///
/// Codes missing from the ethogram are treated as point events.
#[must_use]
pub fn classify_kinds(events: &[Event], ethogram: &Ethogram) -> Vec<Event> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    events
        .iter()
        .map(|event| {
            let mut event = event.clone();
            event.kind = if ethogram.is_state(&event.code) {
                let count = counts
                    .entry((event.subject.clone(), event.code.clone()))
                    .or_insert(0);
                *count += 1;
                if *count % 2 == 1 {
                    EventKind::Start
                } else {
                    EventKind::Stop
                }
            } else {
                EventKind::Point
            };
            event
        })
        .collect()
}

fn state_label(code: &str, modifiers: &Modifiers, include_modifiers: bool) -> String {
    if include_modifiers && !modifiers.is_empty() {
        format!("{code} ({modifiers})")
    } else {
        code.to_string()
    }
}

/// States active at `at` for each subject.
///
/// A state is active when an odd number of its events for the subject sit
/// at or before `at`. With `include_modifiers`, each entry reads
/// `"code (modifiers)"` using the selection of the most recent matching
/// event. Every requested subject appears in the result.
pub fn current_active_states(
    events: &[Event],
    subjects: &[&str],
    at: SortKey,
    include_modifiers: bool,
    ctx: &TimelineContext<'_>,
) -> BTreeMap<String, Vec<String>> {
    subjects
        .iter()
        .map(|&subject| {
            let active = ctx
                .ethogram
                .state_codes()
                .filter_map(|code| {
                    let matching: Vec<&Event> = events
                        .iter()
                        .filter(|e| e.matches(subject, code) && ctx.key(e) <= at)
                        .collect();
                    if matching.len() % 2 == 1 {
                        matching
                            .last()
                            .map(|e| state_label(code, &e.modifiers, include_modifiers))
                    } else {
                        None
                    }
                })
                .collect();
            (subject.to_string(), active)
        })
        .collect()
}

/// Incremental counterpart of [`current_active_states`].
///
/// Feed events in list order with [`push`](Self::push); [`states`](Self::states)
/// then answers for the position of the last pushed event.
#[derive(Debug)]
pub struct ActiveStateTracker<'a> {
    ethogram: &'a Ethogram,
    counts: HashMap<(String, String), (usize, Modifiers)>,
}

impl<'a> ActiveStateTracker<'a> {
    #[must_use]
    pub fn new(ethogram: &'a Ethogram) -> Self {
        Self {
            ethogram,
            counts: HashMap::new(),
        }
    }

    pub fn push(&mut self, event: &Event) {
        if !self.ethogram.is_state(&event.code) {
            return;
        }
        let entry = self
            .counts
            .entry((event.subject.clone(), event.code.clone()))
            .or_insert_with(|| (0, Modifiers::none()));
        entry.0 += 1;
        entry.1 = event.modifiers.clone();
    }

    #[must_use]
    pub fn states(&self, subjects: &[&str], include_modifiers: bool) -> BTreeMap<String, Vec<String>> {
        subjects
            .iter()
            .map(|&subject| {
                let active = self
                    .ethogram
                    .state_codes()
                    .filter_map(|code| {
                        let (count, modifiers) =
                            self.counts.get(&(subject.to_string(), code.to_string()))?;
                        (count % 2 == 1).then(|| state_label(code, modifiers, include_modifiers))
                    })
                    .collect();
                (subject.to_string(), active)
            })
            .collect()
    }
}

/// A start with no matching stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpairedState {
    pub row: usize,
    pub subject: String,
    pub code: String,
    pub time: EventTime,
}

/// Starts left without a stop at the end of the list.
#[must_use]
pub fn unpaired_states(events: &[Event], ethogram: &Ethogram) -> Vec<UnpairedState> {
    let mut open: HashMap<(&str, &str), usize> = HashMap::new();
    for (row, event) in events.iter().enumerate() {
        if !ethogram.is_state(&event.code) {
            continue;
        }
        let slot = (event.subject.as_str(), event.code.as_str());
        match event.kind {
            EventKind::Start => {
                open.insert(slot, row);
            }
            EventKind::Stop => {
                open.remove(&slot);
            }
            EventKind::Point => {}
        }
    }
    let mut unpaired: Vec<UnpairedState> = open
        .into_values()
        .map(|row| {
            let event = &events[row];
            UnpairedState {
                row,
                subject: event.subject.clone(),
                code: event.code.clone(),
                time: event.time,
            }
        })
        .collect();
    unpaired.sort_by_key(|u| u.row);
    unpaired
}

/// Stops every unpaired state at the given position.
///
/// Each stop reuses the modifiers of its start.
pub fn close_unpaired(
    events: &[Event],
    time: Option<Timestamp>,
    position: MediaPosition,
    ctx: &TimelineContext<'_>,
) -> Result<Vec<Event>, TimelineError> {
    let at = EventDraft {
        time,
        position,
        ..EventDraft::default()
    };
    let key = ctx.check_position(&at)?;

    let mut list = events.to_vec();
    for unpaired in unpaired_states(events, ctx.ethogram) {
        let start = &events[unpaired.row];
        ctx.check_duplicate(&list, key, &start.subject, &start.code)?;
        debug!(subject = %start.subject, code = %start.code, %key, "closing unpaired state");
        let stop = Event {
            time: at.time.into(),
            subject: start.subject.clone(),
            code: start.code.clone(),
            modifiers: start.modifiers.clone(),
            comment: String::new(),
            kind: EventKind::Stop,
            position: at.position.clone(),
        };
        ctx.place(&mut list, stop);
    }
    validate_pairing(&list, ctx)?;
    Ok(list)
}
