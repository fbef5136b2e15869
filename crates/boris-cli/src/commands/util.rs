//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use boris_core::{EventDraft, EventTime, MediaPosition, ObservationType, SortKey, Timestamp};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::cli::PositionArgs;

/// Pre-compiled regex for clock notation: `[-][HH:]MM:SS[.fff]`.
static CLOCK_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?(?:(\d+):)?(\d+):(\d+(?:\.\d+)?)$").unwrap()
});

/// Errors from [`parse_time`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("invalid time {0:?}: use seconds (12.5) or clock notation (01:02:03.500)")]
    Invalid(String),

    #[error("invalid time {0:?}: minutes and seconds must be below 60")]
    ComponentOutOfRange(String),
}

/// Parses a command-line time.
///
/// Supports:
/// - Seconds: "12.5", "-3"
/// - Clock notation: "01:02:03.500", "02:03"
pub fn parse_time(s: &str) -> Result<Timestamp, TimeParseError> {
    let s = s.trim();
    if let Ok(t) = s.parse::<Timestamp>() {
        return Ok(t);
    }

    let caps = CLOCK_TIME_RE
        .captures(s)
        .ok_or_else(|| TimeParseError::Invalid(s.to_string()))?;
    let component = |i: usize| -> Result<Decimal, TimeParseError> {
        caps.get(i).map_or(Ok(Decimal::ZERO), |m| {
            m.as_str()
                .parse()
                .map_err(|_| TimeParseError::Invalid(s.to_string()))
        })
    };
    let hours = component(2)?;
    let minutes = component(3)?;
    let seconds = component(4)?;

    let sixty = Decimal::from(60);
    if seconds >= sixty || (caps.get(2).is_some() && minutes >= sixty) {
        return Err(TimeParseError::ComponentOutOfRange(s.to_string()));
    }

    let total = hours * Decimal::from(3600) + minutes * sixty + seconds;
    Ok(Timestamp::new(if caps.get(1).is_some() { -total } else { total }))
}

/// Formats a time as `HH:MM:SS.mmm`.
pub fn format_time(t: Timestamp) -> String {
    let rounded = t.round_to(3).value();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let millis = (rounded.abs() * Decimal::ONE_THOUSAND).to_u64().unwrap_or(0);
    let secs = millis / 1000;
    format!(
        "{sign}{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60,
        millis % 1000
    )
}

/// Formats an event time, `NA` when it is missing.
pub fn format_event_time(time: EventTime) -> String {
    time.seconds().map_or_else(|| "NA".to_string(), format_time)
}

/// Formats an ordering key the way tables show it.
pub fn format_key(key: SortKey) -> String {
    match key {
        SortKey::Time(t) => format_time(t),
        other => other.to_string(),
    }
}

/// Builds an empty draft located where `args` point.
pub fn draft_at(args: &PositionArgs) -> Result<EventDraft> {
    let time = args
        .time
        .as_deref()
        .map(parse_time)
        .transpose()
        .context("failed to parse --time")?;
    let position = match (args.image, args.frame) {
        (Some(index), _) => MediaPosition::Image {
            index,
            path: args.image_path.clone().unwrap_or_default(),
        },
        (None, Some(index)) => MediaPosition::Frame { index },
        (None, None) => MediaPosition::Unspecified,
    };
    Ok(EventDraft {
        time,
        position,
        ..EventDraft::default()
    })
}

/// The ordering key `args` point to in an observation of `observation_type`.
pub fn key_at(args: &PositionArgs, observation_type: ObservationType) -> Result<SortKey> {
    match draft_at(args)?.sort_key(observation_type) {
        SortKey::Missing if observation_type.orders_by_image_index() => {
            anyhow::bail!("image observations need --image")
        }
        SortKey::Missing => anyhow::bail!("--time is required for this observation"),
        key => Ok(key),
    }
}
