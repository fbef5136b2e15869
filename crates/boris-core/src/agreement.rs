//! Inter-rater agreement.
//!
//! Compares the codings of two observers with Cohen's Kappa.
//!
//! # Algorithm Summary
//!
//! 1. Split each observer's coding into duration segments and point events.
//! 2. Cut the timeline at every segment boundary of either observer. Within
//!    each resulting elementary interval neither observer's active codes
//!    change.
//! 3. Label every elementary interval, and every instant carrying a point
//!    event, with the sorted `+`-joined codes active for each observer.
//! 4. Accumulate the label pairs in a contingency table, with weight 1
//!    (unweighted) or duration / point weight (time-weighted), and compute
//!    `kappa = (po - pe) / (1 - pe)`.
//!
//! # Degenerate cases
//!
//! With no data at all (total weight 0) Kappa is `NaN` and flagged as
//! degenerate. When both observers use one and the same label everywhere,
//! `pe == 1` and the agreement is perfect, so Kappa is 1.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::{Event, EventKind};
use crate::time::{Interval, Timestamp};

/// Joins codes active at the same time.
pub const CONCURRENT_SEPARATOR: &str = "+";

/// Joins subject, behavior and modifiers into one code.
pub const FIELD_SEPARATOR: &str = "|";

/// A coded interval of one observer; `start == stop` is a point event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodedInterval {
    pub start: Timestamp,
    pub stop: Timestamp,
    pub code: String,
}

impl CodedInterval {
    #[must_use]
    pub fn new(start: Timestamp, stop: Timestamp, code: impl Into<String>) -> Self {
        Self {
            start,
            stop,
            code: code.into(),
        }
    }

    #[must_use]
    pub fn point(at: Timestamp, code: impl Into<String>) -> Self {
        Self::new(at, at, code)
    }

    #[must_use]
    pub fn is_point(&self) -> bool {
        self.start == self.stop
    }

    #[must_use]
    pub const fn interval(&self) -> Interval {
        Interval::new(self.start, self.stop)
    }
}

/// Splits a coding into duration segments and point events.
///
/// Intervals whose stop precedes their start are dropped.
#[must_use]
pub fn segments_and_points(events: &[CodedInterval]) -> (Vec<CodedInterval>, Vec<CodedInterval>) {
    let mut segments = Vec::new();
    let mut points = Vec::new();
    for event in events {
        if event.start < event.stop {
            segments.push(event.clone());
        } else if event.is_point() {
            points.push(event.clone());
        } else {
            warn!(
                code = %event.code,
                start = %event.start,
                stop = %event.stop,
                "dropping interval that stops before it starts"
            );
        }
    }
    (segments, points)
}

/// Cuts the span covered by both observers' segments at every boundary.
///
/// Returns an empty list when fewer than two distinct boundaries exist.
#[must_use]
pub fn elementary_intervals(segments_a: &[CodedInterval], segments_b: &[CodedInterval]) -> Vec<Interval> {
    let boundaries: BTreeSet<Timestamp> = segments_a
        .iter()
        .chain(segments_b)
        .flat_map(|s| [s.start, s.stop])
        .collect();
    let boundaries: Vec<Timestamp> = boundaries.into_iter().collect();
    boundaries
        .windows(2)
        .map(|pair| Interval::new(pair[0], pair[1]))
        .collect()
}

fn join_sorted(mut codes: Vec<&str>) -> String {
    codes.sort_unstable();
    codes.join(CONCURRENT_SEPARATOR)
}

/// Codes of all segments covering `t`, sorted and `+`-joined.
#[must_use]
pub fn active_code_at(t: Timestamp, segments: &[CodedInterval]) -> Option<String> {
    let codes: Vec<&str> = segments
        .iter()
        .filter(|s| s.interval().contains(t))
        .map(|s| s.code.as_str())
        .collect();
    if codes.is_empty() {
        None
    } else {
        Some(join_sorted(codes))
    }
}

/// Label of an instant: segments covering it plus points at exactly it.
fn instant_label(t: Timestamp, segments: &[CodedInterval], points: &[CodedInterval]) -> String {
    let codes: Vec<&str> = segments
        .iter()
        .filter(|s| s.interval().contains(t))
        .chain(points.iter().filter(|p| p.start == t))
        .map(|s| s.code.as_str())
        .collect();
    join_sorted(codes)
}

#[derive(Debug, Clone, Copy)]
enum Weight {
    Duration(Timestamp),
    Instant,
}

/// The label of each observer at one compared position.
#[derive(Debug)]
struct Comparison {
    a: String,
    b: String,
    weight: Weight,
}

fn comparisons(obs1: &[CodedInterval], obs2: &[CodedInterval]) -> Vec<Comparison> {
    let (segments_a, points_a) = segments_and_points(obs1);
    let (segments_b, points_b) = segments_and_points(obs2);

    let mut out: Vec<Comparison> = elementary_intervals(&segments_a, &segments_b)
        .into_iter()
        .map(|interval| Comparison {
            a: active_code_at(interval.start, &segments_a).unwrap_or_default(),
            b: active_code_at(interval.start, &segments_b).unwrap_or_default(),
            weight: Weight::Duration(interval.duration()),
        })
        .collect();

    let instants: BTreeSet<Timestamp> = points_a.iter().chain(&points_b).map(|p| p.start).collect();
    out.extend(instants.into_iter().map(|t| Comparison {
        a: instant_label(t, &segments_a, &points_a),
        b: instant_label(t, &segments_b, &points_b),
        weight: Weight::Instant,
    }));
    out
}

/// Contingency table keyed by (observer 1 label, observer 2 label).
pub type Contingency = BTreeMap<(String, String), f64>;

fn contingency(comparisons: Vec<Comparison>, weigh: impl Fn(Weight) -> f64) -> Contingency {
    let mut table = Contingency::new();
    for comparison in comparisons {
        *table.entry((comparison.a, comparison.b)).or_insert(0.0) += weigh(comparison.weight);
    }
    table
}

/// Agreement statistics derived from a contingency table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KappaStats {
    pub kappa: f64,
    /// Observed agreement.
    pub po: f64,
    /// Agreement expected by chance.
    pub pe: f64,
    pub total_weight: f64,
    /// True when there was nothing to compare; `kappa` is `NaN`.
    pub degenerate: bool,
}

impl KappaStats {
    fn from_table(table: &Contingency) -> Self {
        let total: f64 = table.values().sum();
        if total <= 0.0 {
            return Self {
                kappa: f64::NAN,
                po: f64::NAN,
                pe: f64::NAN,
                total_weight: total,
                degenerate: true,
            };
        }

        let mut diagonal = 0.0;
        let mut marginal_a: BTreeMap<&str, f64> = BTreeMap::new();
        let mut marginal_b: BTreeMap<&str, f64> = BTreeMap::new();
        for ((a, b), weight) in table {
            if a == b {
                diagonal += weight;
            }
            *marginal_a.entry(a.as_str()).or_insert(0.0) += weight;
            *marginal_b.entry(b.as_str()).or_insert(0.0) += weight;
        }

        let po = diagonal / total;
        let pe: f64 = marginal_a
            .iter()
            .map(|(label, wa)| (wa / total) * (marginal_b.get(label).copied().unwrap_or(0.0) / total))
            .sum();

        // A single shared label on both sides: pe == 1 and po == 1.
        let single_shared_label = marginal_a.len() == 1
            && marginal_b.len() == 1
            && marginal_a.keys().next() == marginal_b.keys().next();
        let kappa = if single_shared_label {
            1.0
        } else {
            (po - pe) / (1.0 - pe)
        };

        Self {
            kappa,
            po,
            pe,
            total_weight: total,
            degenerate: false,
        }
    }
}

/// Result of the unweighted comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KappaOutcome {
    pub kappa: f64,
    /// Set when Kappa is `NaN` for lack of data.
    pub degenerate: bool,
}

/// Result of the time-weighted comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedKappa {
    pub stats: KappaStats,
    pub contingency: Contingency,
}

fn unweighted_stats(obs1: &[CodedInterval], obs2: &[CodedInterval]) -> KappaStats {
    let table = contingency(comparisons(obs1, obs2), |_| 1.0);
    KappaStats::from_table(&table)
}

/// Cohen's Kappa counting every elementary interval and every point instant
/// once.
#[must_use]
pub fn unweighted_kappa(obs1: &[CodedInterval], obs2: &[CodedInterval]) -> KappaOutcome {
    let stats = unweighted_stats(obs1, obs2);
    KappaOutcome {
        kappa: stats.kappa,
        degenerate: stats.degenerate,
    }
}

/// Cohen's Kappa weighting each elementary interval by its duration in
/// seconds and each point instant by `event_weight`.
#[must_use]
pub fn time_weighted_kappa(
    obs1: &[CodedInterval],
    obs2: &[CodedInterval],
    event_weight: f64,
) -> WeightedKappa {
    let table = contingency(comparisons(obs1, obs2), |weight| match weight {
        Weight::Duration(d) => d.to_f64(),
        Weight::Instant => event_weight,
    });
    WeightedKappa {
        stats: KappaStats::from_table(&table),
        contingency: table,
    }
}

/// Rounds start and stop times before segmentation.
///
/// Coarse rounding merges boundaries that are almost simultaneous and may
/// turn very short segments into points.
#[must_use]
pub fn round_intervals(intervals: &[CodedInterval], decimal_places: i32) -> Vec<CodedInterval> {
    intervals
        .iter()
        .map(|i| CodedInterval {
            start: i.start.round_to(decimal_places),
            stop: i.stop.round_to(decimal_places),
            code: i.code.clone(),
        })
        .collect()
}

/// Agreement input flattened from a coded event list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedEvents {
    pub intervals: Vec<CodedInterval>,
    /// Events left out: no time, or a start without its stop.
    pub skipped: usize,
}

/// Turns paired events into agreement input.
///
/// Each code reads `subject|behavior`, or `subject|behavior|modifiers` with
/// `include_modifiers`. The modifiers of a state are those of its start.
#[must_use]
pub fn intervals_from_events(events: &[Event], include_modifiers: bool) -> FlattenedEvents {
    let label = |event: &Event| {
        let mut fields = vec![event.subject_label().to_string(), event.code.clone()];
        if include_modifiers {
            fields.push(event.modifiers.to_legacy());
        }
        fields.join(FIELD_SEPARATOR)
    };

    let mut flattened = FlattenedEvents::default();
    let mut open: BTreeMap<(&str, &str), (Timestamp, String)> = BTreeMap::new();
    for event in events {
        let Some(time) = event.time.seconds() else {
            flattened.skipped += 1;
            continue;
        };
        let slot = (event.subject.as_str(), event.code.as_str());
        match event.kind {
            EventKind::Point => flattened.intervals.push(CodedInterval::point(time, label(event))),
            EventKind::Start => {
                if open.insert(slot, (time, label(event))).is_some() {
                    flattened.skipped += 1;
                }
            }
            EventKind::Stop => match open.remove(&slot) {
                Some((start, code)) => flattened.intervals.push(CodedInterval::new(start, time, code)),
                None => flattened.skipped += 1,
            },
        }
    }
    if !open.is_empty() {
        warn!(count = open.len(), "skipping states without a stop");
        flattened.skipped += open.len();
    }
    flattened
        .intervals
        .sort_by(|a, b| (a.start, a.stop).cmp(&(b.start, b.stop)));
    flattened
}

/// Which Kappa variant to compute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgreementMethod {
    Unweighted,
    TimeWeighted { event_weight: f64 },
}

/// Kappa for one pair of observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResult {
    pub stats: KappaStats,
}

impl PairResult {
    /// `"NaN"` or the value with three decimals.
    #[must_use]
    pub fn formatted(&self) -> String {
        if self.stats.kappa.is_nan() {
            "NaN".to_string()
        } else {
            format!("{:.3}", self.stats.kappa)
        }
    }
}

/// Kappa for every pair of a set of observations.
#[derive(Debug, Clone, Default)]
pub struct AgreementReport {
    /// Observation ids in input order.
    pub observations: Vec<String>,
    /// Symmetric: `(a, b)` and `(b, a)` are both present.
    pub results: BTreeMap<(String, String), PairResult>,
    /// One line per compared pair.
    pub log: Vec<String>,
    /// Problems reported once for the whole run.
    pub warnings: Vec<String>,
}

impl AgreementReport {
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<&PairResult> {
        self.results.get(&(a.to_string(), b.to_string()))
    }
}

/// Compares every unordered pair of observations, self-pairs included.
///
/// Pairs without data do not interrupt the run: they are collected and
/// reported in a single warning once every pair has been computed.
#[must_use]
pub fn pairwise_agreement(
    observations: &[(String, Vec<CodedInterval>)],
    method: AgreementMethod,
    decimal_places: Option<i32>,
) -> AgreementReport {
    let prepared: Vec<(&str, Vec<CodedInterval>)> = observations
        .iter()
        .map(|(id, intervals)| {
            let intervals = decimal_places.map_or_else(
                || intervals.clone(),
                |places| round_intervals(intervals, places),
            );
            (id.as_str(), intervals)
        })
        .collect();

    let mut report = AgreementReport {
        observations: observations.iter().map(|(id, _)| id.clone()).collect(),
        ..AgreementReport::default()
    };
    let mut undefined: Vec<String> = Vec::new();

    for (i, (id_a, obs_a)) in prepared.iter().enumerate() {
        for (id_b, obs_b) in &prepared[i..] {
            let stats = match method {
                AgreementMethod::Unweighted => unweighted_stats(obs_a, obs_b),
                AgreementMethod::TimeWeighted { event_weight } => {
                    time_weighted_kappa(obs_a, obs_b, event_weight).stats
                }
            };
            let result = PairResult { stats };
            debug!(a = %id_a, b = %id_b, kappa = result.formatted(), "pair compared");
            report.log.push(format!(
                "{id_a} - {id_b}: Kappa {} (po {:.3}, pe {:.3}, total weight {})",
                result.formatted(),
                stats.po,
                stats.pe,
                stats.total_weight
            ));
            if stats.degenerate {
                undefined.push(format!("{id_a} - {id_b}"));
            }
            report
                .results
                .insert((id_a.to_string(), id_b.to_string()), result);
            report
                .results
                .insert((id_b.to_string(), id_a.to_string()), result);
        }
    }

    if !undefined.is_empty() {
        let message = format!(
            "Cohen's Kappa is undefined (no coded data) for: {}",
            undefined.join(", ")
        );
        warn!("{message}");
        report.warnings.push(message);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethogram::{Behavior, Ethogram};
    use crate::event::{EventDraft, ObservationType};
    use crate::timeline::{TimelineContext, insert_or_update_event};

    fn t(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn seg(start: &str, stop: &str, code: &str) -> CodedInterval {
        CodedInterval::new(t(start), t(stop), code)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn scenario() -> (Vec<CodedInterval>, Vec<CodedInterval>) {
        (
            vec![seg("0", "5", "walk"), seg("5", "5", "bark")],
            vec![seg("0", "5", "walk"), seg("6", "6", "bark")],
        )
    }

    #[test]
    fn test_splits_segments_from_points() {
        let (segments, points) =
            segments_and_points(&[seg("0", "5", "walk"), seg("5", "5", "bark"), seg("7", "6", "bad")]);
        assert_eq!(segments, [seg("0", "5", "walk")]);
        assert_eq!(points, [seg("5", "5", "bark")]);
    }

    #[test]
    fn test_elementary_intervals_cover_the_span_without_overlap() {
        let a = [seg("0", "4", "walk"), seg("2", "9", "rest")];
        let b = [seg("1", "4", "walk"), seg("9", "12", "run")];
        let intervals = elementary_intervals(&a, &b);
        let bounds: Vec<_> = intervals.iter().map(|i| (i.start.to_string(), i.stop.to_string())).collect();
        assert_eq!(
            bounds,
            [
                ("0".to_string(), "1".to_string()),
                ("1".to_string(), "2".to_string()),
                ("2".to_string(), "4".to_string()),
                ("4".to_string(), "9".to_string()),
                ("9".to_string(), "12".to_string()),
            ]
        );
        for pair in intervals.windows(2) {
            assert_eq!(pair[0].stop, pair[1].start);
            assert!(pair[0].intersection(&pair[1]).is_none());
        }
        let total = intervals.iter().fold(Timestamp::ZERO, |acc, i| acc + i.duration());
        assert_eq!(total, t("12"));
    }

    #[test]
    fn test_elementary_intervals_need_two_boundaries() {
        assert!(elementary_intervals(&[], &[]).is_empty());
        assert!(elementary_intervals(&[seg("3", "3", "bark")], &[]).is_empty());
    }

    #[test]
    fn test_active_code_is_sorted_and_half_open() {
        let segments = [seg("0", "5", "walk"), seg("2", "6", "bark")];
        assert_eq!(active_code_at(t("3"), &segments).as_deref(), Some("bark+walk"));
        assert_eq!(active_code_at(t("5"), &segments).as_deref(), Some("bark"));
        assert_eq!(active_code_at(t("6"), &segments), None);
        let reversed = [seg("2", "6", "bark"), seg("0", "5", "walk")];
        assert_eq!(active_code_at(t("3"), &reversed).as_deref(), Some("bark+walk"));
    }

    #[test]
    fn test_point_at_another_instant_gives_finite_kappa() {
        let (a, b) = scenario();
        let outcome = unweighted_kappa(&a, &b);
        assert!(!outcome.degenerate);
        assert!(outcome.kappa.is_finite());
        assert!(outcome.kappa > -1.0 && outcome.kappa < 1.0);
        // One agreeing segment, two disagreeing instants: po = pe = 1/3.
        assert_close(outcome.kappa, 0.0);
    }

    #[test]
    fn test_time_weighted_scenario_table() {
        let (a, b) = scenario();
        let weighted = time_weighted_kappa(&a, &b, 1.0);
        let expected: Contingency = [
            (("walk".to_string(), "walk".to_string()), 5.0),
            (("bark".to_string(), String::new()), 1.0),
            ((String::new(), "bark".to_string()), 1.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(weighted.contingency, expected);
        assert_close(weighted.stats.total_weight, 7.0);
        assert_close(weighted.stats.po, 5.0 / 7.0);
        assert_close(weighted.stats.pe, 27.0 / 49.0);
        assert_close(weighted.stats.kappa, 4.0 / 11.0);
    }

    #[test]
    fn test_event_weight_scales_point_contribution() {
        let (a, b) = scenario();
        let light = time_weighted_kappa(&a, &b, 0.1).stats.kappa;
        let heavy = time_weighted_kappa(&a, &b, 10.0).stats.kappa;
        assert!(light > heavy, "{light} <= {heavy}");
    }

    #[test]
    fn test_self_agreement_is_one() {
        let codings = [
            vec![seg("0", "5", "walk")],
            vec![seg("0", "5", "walk"), seg("2", "8", "bark"), seg("9", "9", "call")],
            vec![seg("1", "1", "call")],
        ];
        for obs in &codings {
            assert_close(unweighted_kappa(obs, obs).kappa, 1.0);
            assert_close(time_weighted_kappa(obs, obs, 1.0).stats.kappa, 1.0);
        }
    }

    #[test]
    fn test_kappa_is_symmetric() {
        let a = vec![seg("0", "4", "walk"), seg("4", "10", "rest"), seg("6", "6", "call")];
        let b = vec![seg("0", "5", "walk"), seg("5", "9", "rest"), seg("7", "7", "call")];
        assert_close(unweighted_kappa(&a, &b).kappa, unweighted_kappa(&b, &a).kappa);
        assert_close(
            time_weighted_kappa(&a, &b, 2.0).stats.kappa,
            time_weighted_kappa(&b, &a, 2.0).stats.kappa,
        );
    }

    #[test]
    fn test_total_disagreement_on_two_labels_is_minus_one() {
        let a = vec![seg("0", "5", "walk"), seg("5", "10", "rest")];
        let b = vec![seg("0", "5", "rest"), seg("5", "10", "walk")];
        assert_close(unweighted_kappa(&a, &b).kappa, -1.0);
    }

    #[test]
    fn test_zero_total_weight_is_nan() {
        let outcome = unweighted_kappa(&[], &[]);
        assert!(outcome.kappa.is_nan());
        assert!(outcome.degenerate);

        let points = [seg("2", "2", "call")];
        let weighted = time_weighted_kappa(&points, &[], 0.0);
        assert!(weighted.stats.kappa.is_nan());
        assert!(weighted.stats.degenerate);
        assert_close(weighted.stats.total_weight, 0.0);
    }

    #[test]
    fn test_rounding_merges_close_boundaries() {
        let a = vec![seg("0", "10.2", "walk")];
        let b = vec![seg("0", "9.8", "walk")];
        assert!(unweighted_kappa(&a, &b).kappa < 1.0);
        let a = round_intervals(&a, 0);
        let b = round_intervals(&b, 0);
        assert_close(unweighted_kappa(&a, &b).kappa, 1.0);

        let short = round_intervals(&[seg("12", "14", "call")], -1);
        assert!(short[0].is_point());
    }

    #[test]
    fn test_pairwise_table_is_symmetric_and_batches_warnings() {
        let observations = vec![
            ("obs1".to_string(), vec![seg("0", "5", "walk"), seg("5", "5", "bark")]),
            ("obs2".to_string(), vec![seg("0", "5", "walk"), seg("6", "6", "bark")]),
            ("empty".to_string(), Vec::new()),
        ];
        let report = pairwise_agreement(&observations, AgreementMethod::Unweighted, None);

        assert_eq!(report.results.len(), 9);
        assert_eq!(report.get("obs1", "obs1").unwrap().formatted(), "1.000");
        assert_eq!(report.get("obs1", "obs2"), report.get("obs2", "obs1"));
        assert_eq!(report.get("obs1", "empty").unwrap().formatted(), "0.000");
        assert_eq!(report.get("empty", "empty").unwrap().formatted(), "NaN");
        assert_eq!(report.log.len(), 6);
        assert_eq!(
            report.warnings,
            ["Cohen's Kappa is undefined (no coded data) for: empty - empty"]
        );
    }

    #[test]
    fn test_pairwise_log_lists_each_pair_once() {
        let (a, b) = scenario();
        let observations = vec![("obs1".to_string(), a), ("obs2".to_string(), b)];
        let report = pairwise_agreement(
            &observations,
            AgreementMethod::TimeWeighted { event_weight: 1.0 },
            None,
        );
        insta::assert_snapshot!(report.log.join("\n"), @r"
        obs1 - obs1: Kappa 1.000 (po 1.000, pe 0.722, total weight 6)
        obs1 - obs2: Kappa 0.364 (po 0.714, pe 0.551, total weight 7)
        obs2 - obs2: Kappa 1.000 (po 1.000, pe 0.722, total weight 6)
        ");
    }

    #[test]
    fn test_pairwise_applies_rounding() {
        let observations = vec![
            ("a".to_string(), vec![seg("0", "10.2", "walk")]),
            ("b".to_string(), vec![seg("0", "9.8", "walk")]),
        ];
        let method = AgreementMethod::TimeWeighted { event_weight: 1.0 };
        let raw = pairwise_agreement(&observations, method, None);
        let rounded = pairwise_agreement(&observations, method, Some(0));
        assert_ne!(raw.get("a", "b").unwrap().formatted(), "1.000");
        assert_eq!(rounded.get("a", "b").unwrap().formatted(), "1.000");
        assert!(rounded.warnings.is_empty());
    }

    #[test]
    fn test_flattens_paired_events() {
        let ethogram = Ethogram::new()
            .with("walk", Behavior::state())
            .with("bark", Behavior::point());
        let ctx = TimelineContext::new(&ethogram, ObservationType::Media);
        let mut events = Vec::new();
        for (time, subject, code) in [
            ("1", "A", "walk"),
            ("2", "", "bark"),
            ("4", "A", "walk"),
            ("6", "A", "walk"),
        ] {
            let draft = EventDraft::at(t(time), code).subject(subject);
            events = insert_or_update_event(&events, draft, None, &ctx).unwrap();
        }

        let flattened = intervals_from_events(&events, false);
        assert_eq!(
            flattened.intervals,
            [
                CodedInterval::new(t("1"), t("4"), "A|walk"),
                CodedInterval::point(t("2"), "No focal subject|bark"),
            ]
        );
        assert_eq!(flattened.skipped, 1);

        let with_modifiers = intervals_from_events(&events, true);
        assert_eq!(with_modifiers.intervals[0].code, "A|walk|");
    }
}
