//! States command: which states are running at a position.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use boris_core::{
    ActiveStateTracker, SortKey, TimelineContext, current_active_states, subject_label,
};

use crate::commands::util::{format_event_time, format_key};
use crate::project::{Observation, Project};

fn selected_subjects<'a>(observation: &'a Observation, subjects: &'a [String]) -> Vec<&'a str> {
    if subjects.is_empty() {
        observation.subjects()
    } else {
        subjects.iter().map(String::as_str).collect()
    }
}

fn write_states<W: Write>(
    writer: &mut W,
    subjects: &[&str],
    states: &BTreeMap<String, Vec<String>>,
    indent: &str,
) -> Result<()> {
    for subject in subjects {
        let active = states.get(*subject).map_or(&[][..], Vec::as_slice);
        let listed = if active.is_empty() {
            "-".to_string()
        } else {
            active.join(", ")
        };
        writeln!(writer, "{indent}{}: {listed}", subject_label(subject))?;
    }
    Ok(())
}

/// Prints the states active at `at` for each subject.
pub fn run<W: Write>(
    writer: &mut W,
    project: &Project,
    observation_id: &str,
    at: SortKey,
    subjects: &[String],
    include_modifiers: bool,
) -> Result<()> {
    let observation = project.observation(observation_id)?;
    let ctx = TimelineContext::new(&project.ethogram, observation.kind);
    let subjects = selected_subjects(observation, subjects);
    let states = current_active_states(&observation.events, &subjects, at, include_modifiers, &ctx);

    writeln!(writer, "Active states at {}", format_key(at))?;
    write_states(writer, &subjects, &states, "")
}

/// Prints the active states after each event of the observation.
pub fn run_timeline<W: Write>(
    writer: &mut W,
    project: &Project,
    observation_id: &str,
    subjects: &[String],
    include_modifiers: bool,
) -> Result<()> {
    let observation = project.observation(observation_id)?;
    let subjects = selected_subjects(observation, subjects);
    let mut tracker = ActiveStateTracker::new(&project.ethogram);

    for (row, event) in observation.events.iter().enumerate() {
        tracker.push(event);
        writeln!(
            writer,
            "#{row} {} {} {} {}",
            format_event_time(event.time),
            event.kind,
            subject_label(&event.subject),
            event.code
        )?;
        write_states(writer, &subjects, &tracker.states(&subjects, include_modifiers), "  ")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use boris_core::Timestamp;
    use insta::assert_snapshot;

    const PROJECT: &str = r#"{
        "ethogram": {
            "walk": {"type": "state", "excluded": ["rest"]},
            "rest": {"type": "state"},
            "groom": {
                "type": "state",
                "modifiers": [{"name": "intensity", "type": "single_selection", "values": ["low", "high"]}]
            }
        },
        "observations": {
            "obs1": {"type": "LIVE", "events": [
                [1, "Rex", "walk", "", ""],
                [2, "", "groom", "high", ""],
                [4, "Rex", "walk", "", ""],
                [5, "Rex", "rest", "", ""]
            ]}
        }
    }"#;

    fn render(at: &str, subjects: &[&str], include_modifiers: bool) -> String {
        let project = Project::from_json(PROJECT).unwrap();
        let subjects: Vec<String> = subjects.iter().map(ToString::to_string).collect();
        let at = SortKey::Time(at.parse::<Timestamp>().unwrap());
        let mut output = Vec::new();
        run(&mut output, &project, "obs1", at, &subjects, include_modifiers).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_states_at_time_per_subject() {
        assert_snapshot!(render("3", &[], true), @r"
        Active states at 00:00:03.000
        Rex: walk
        No focal subject: groom (high)
        ");
    }

    #[test]
    fn test_states_boundary_event_counts_as_reached() {
        assert_snapshot!(render("4", &["Rex", "Ada"], false), @r"
        Active states at 00:00:04.000
        Rex: -
        Ada: -
        ");
    }

    #[test]
    fn test_states_timeline_follows_each_event() {
        let project = Project::from_json(PROJECT).unwrap();
        let mut output = Vec::new();
        run_timeline(&mut output, &project, "obs1", &["Rex".to_string()], false).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        #0 00:00:01.000 START Rex walk
          Rex: walk
        #1 00:00:02.000 START No focal subject groom
          Rex: walk
        #2 00:00:04.000 STOP Rex walk
          Rex: -
        #3 00:00:05.000 START Rex rest
          Rex: rest
        ");
    }
}
