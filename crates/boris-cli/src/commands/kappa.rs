//! Kappa command: Cohen's Kappa between every pair of observations.

use std::io::Write;

use anyhow::{Result, bail};
use boris_core::{
    AgreementMethod, AgreementReport, CodedInterval, intervals_from_events, pairwise_agreement,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::project::Project;

const CORNER: &str = "observation";

/// Options of `boris kappa`, after merging flags with configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct KappaOptions {
    pub method: AgreementMethod,
    pub decimal_places: Option<i32>,
    pub include_modifiers: bool,
    /// Observation ids; empty means all.
    pub observations: Vec<String>,
    pub json: bool,
}

/// JSON output of `boris kappa --json`.
#[derive(Debug, Serialize)]
pub struct KappaJson<'a> {
    pub generated_at: DateTime<Utc>,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_weight: Option<f64>,
    pub decimal_places: Option<i32>,
    pub observations: &'a [String],
    /// Row-major, `null` where Kappa is undefined.
    pub kappa: Vec<Vec<Option<f64>>>,
    pub pairs: &'a [String],
    pub warnings: &'a [String],
}

pub fn run<W: Write>(writer: &mut W, project: &Project, options: &KappaOptions) -> Result<()> {
    let inputs = collect_inputs(project, options)?;
    let report = pairwise_agreement(&inputs, options.method, options.decimal_places);

    if options.json {
        let json = to_json(&report, options, Utc::now());
        writeln!(writer, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        write_table(writer, &report, options.method)?;
    }
    Ok(())
}

fn collect_inputs(
    project: &Project,
    options: &KappaOptions,
) -> Result<Vec<(String, Vec<CodedInterval>)>> {
    let ids: Vec<String> = if options.observations.is_empty() {
        project.observations.keys().cloned().collect()
    } else {
        options.observations.clone()
    };
    if ids.is_empty() {
        bail!("project has no observations to compare");
    }

    ids.into_iter()
        .map(|id| {
            let observation = project.observation(&id)?;
            let flattened = intervals_from_events(&observation.events, options.include_modifiers);
            if flattened.skipped > 0 {
                tracing::warn!(
                    observation = %id,
                    skipped = flattened.skipped,
                    "events without a time or a stop left out of the comparison"
                );
            }
            Ok((id, flattened.intervals))
        })
        .collect()
}

pub fn to_json<'a>(
    report: &'a AgreementReport,
    options: &KappaOptions,
    generated_at: DateTime<Utc>,
) -> KappaJson<'a> {
    let (method, event_weight) = match options.method {
        AgreementMethod::Unweighted => ("unweighted", None),
        AgreementMethod::TimeWeighted { event_weight } => ("time_weighted", Some(event_weight)),
    };
    let kappa = report
        .observations
        .iter()
        .map(|a| {
            report
                .observations
                .iter()
                .map(|b| {
                    report
                        .get(a, b)
                        .map(|r| r.stats.kappa)
                        .filter(|k| k.is_finite())
                })
                .collect()
        })
        .collect();

    KappaJson {
        generated_at,
        method,
        event_weight,
        decimal_places: options.decimal_places,
        observations: &report.observations,
        kappa,
        pairs: &report.log,
        warnings: &report.warnings,
    }
}

/// Writes the symmetric Kappa table followed by any warnings.
pub fn write_table<W: Write>(
    writer: &mut W,
    report: &AgreementReport,
    method: AgreementMethod,
) -> Result<()> {
    match method {
        AgreementMethod::Unweighted => writeln!(writer, "Cohen's Kappa (unweighted)")?,
        AgreementMethod::TimeWeighted { event_weight } => writeln!(
            writer,
            "Cohen's Kappa, time-weighted (point events weigh {event_weight})"
        )?,
    }
    writeln!(writer)?;

    let ids = &report.observations;
    let first = ids.iter().map(String::len).chain([CORNER.len()]).max().unwrap_or(0);
    let width = |id: &str| id.len().max(5);

    write!(writer, "{CORNER:<first$}")?;
    for id in ids {
        write!(writer, "  {id:>w$}", w = width(id))?;
    }
    writeln!(writer)?;

    for a in ids {
        write!(writer, "{a:<first$}")?;
        for b in ids {
            let cell = report.get(a, b).map_or_else(|| "NaN".to_string(), |r| r.formatted());
            write!(writer, "  {cell:>w$}", w = width(b))?;
        }
        writeln!(writer)?;
    }

    if !report.warnings.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Warnings:")?;
        for warning in &report.warnings {
            writeln!(writer, "- {warning}")?;
        }
    }
    Ok(())
}
