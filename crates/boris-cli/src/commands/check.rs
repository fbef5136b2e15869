//! Check command: start/stop pairing of each observation.

use std::io::Write;

use anyhow::Result;
use boris_core::{TimelineContext, subject_label, unpaired_states, validate_pairing};

use crate::commands::util::format_event_time;
use crate::project::Project;

/// Reports pairing problems and unpaired states.
///
/// Returns the number of observations whose pairing is broken. Unpaired
/// states at the end of an observation are listed but not counted.
pub fn run<W: Write>(writer: &mut W, project: &Project, only: Option<&str>) -> Result<usize> {
    let ids: Vec<&str> = match only {
        Some(id) => {
            project.observation(id)?;
            vec![id]
        }
        None => project.observations.keys().map(String::as_str).collect(),
    };

    let mut broken = 0;
    for id in ids {
        let observation = project.observation(id)?;
        let ctx = TimelineContext::new(&project.ethogram, observation.kind);
        if let Err(err) = validate_pairing(&observation.events, &ctx) {
            writeln!(writer, "{id}: {err}")?;
            broken += 1;
            continue;
        }

        let unpaired = unpaired_states(&observation.events, &project.ethogram);
        if unpaired.is_empty() {
            writeln!(writer, "{id}: ok")?;
            continue;
        }
        writeln!(writer, "{id}: {} unpaired state(s)", unpaired.len())?;
        for state in unpaired {
            writeln!(
                writer,
                "  row {}: {} {} started at {}",
                state.row,
                subject_label(&state.subject),
                state.code,
                format_event_time(state.time)
            )?;
        }
    }
    Ok(broken)
}
