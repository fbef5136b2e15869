//! Core domain logic for behavioral coding.
//!
//! This crate contains the fundamental types and logic for:
//! - Timeline: recording coded events with start/stop pairing, exclusions
//!   and active-state queries
//! - Agreement: Cohen's Kappa between two observers, unweighted and
//!   time-weighted
//! - Undo: bounded history of event-list snapshots

mod agreement;
pub mod ethogram;
pub mod event;
pub mod modifier;
pub mod time;
pub mod timeline;
pub mod undo;

pub use agreement::{
    AgreementMethod, AgreementReport, CodedInterval, Contingency, FlattenedEvents, KappaOutcome,
    KappaStats, PairResult, WeightedKappa, active_code_at, elementary_intervals,
    intervals_from_events, pairwise_agreement, round_intervals, segments_and_points,
    time_weighted_kappa, unweighted_kappa,
};
pub use ethogram::{Behavior, BehaviorType, Ethogram};
pub use event::{
    Event, EventDraft, EventKind, MediaPosition, ObservationType, SortKey, subject_label,
};
pub use modifier::{MalformedModifierError, ModifierSet, ModifierType, ModifierValue, Modifiers};
pub use time::{EventTime, Interval, Timestamp};
pub use timeline::{
    ActiveStateTracker, EventPolicy, PairingError, PairingProblem, TimelineContext, TimelineError,
    UnpairedState, classify_kinds, close_unpaired, current_active_states, delete_events,
    insert_or_update_event, unpaired_states, validate_pairing,
};
pub use undo::{EmptyUndoError, MAX_UNDO_QUEUE, UndoEntry, UndoStack};
