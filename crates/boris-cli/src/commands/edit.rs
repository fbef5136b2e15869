//! Editing commands: code, delete and fix.
//!
//! Each command runs the change through the timeline engine and only
//! touches the project when the engine accepts it.

use std::io::Write;

use anyhow::{Context, Result};
use boris_core::{
    EventPolicy, Modifiers, TimelineContext, close_unpaired, delete_events, insert_or_update_event,
};

use crate::cli::{CodeArgs, PositionArgs};
use crate::commands::util::{draft_at, format_key};
use crate::project::Project;

/// Records a new event or replaces the one at `--edit`.
pub fn code<W: Write>(
    writer: &mut W,
    project: &mut Project,
    args: &CodeArgs,
    policy: EventPolicy,
) -> Result<()> {
    let observation = project.observation(&args.observation)?;
    let ctx = TimelineContext::new(&project.ethogram, observation.kind).with_policy(policy);

    let sets = project
        .ethogram
        .get(&args.behavior)
        .map_or(&[][..], |b| b.modifiers.as_slice());
    let modifiers =
        Modifiers::parse_legacy(&args.modifiers, sets).context("failed to parse --modifiers")?;
    let mut draft = draft_at(&args.at)?
        .subject(args.subject.as_str())
        .modifiers(modifiers)
        .comment(args.comment.as_str());
    draft.code.clone_from(&args.behavior);
    let key = draft.sort_key(observation.kind);

    let before = observation.events.len();
    let events = insert_or_update_event(&observation.events, draft, args.edit, &ctx)
        .with_context(|| format!("cannot record {:?} in {:?}", args.behavior, args.observation))?;
    if args.edit.is_none() && events.len() == before {
        writeln!(
            writer,
            "{}: {} already active, nothing recorded",
            args.observation, args.behavior
        )?;
        return Ok(());
    }

    if let Some(event) = events.iter().find(|e| {
        e.sort_key(observation.kind) == key && e.subject == args.subject && e.code == args.behavior
    }) {
        let verb = if args.edit.is_some() { "updated" } else { "recorded" };
        writeln!(
            writer,
            "{}: {verb} {} {} at {}",
            args.observation,
            event.kind,
            event.code,
            format_key(key)
        )?;
    }
    let stopped = events.len().saturating_sub(before + usize::from(args.edit.is_none()));
    if stopped > 0 {
        writeln!(writer, "{}: stopped {stopped} state(s)", args.observation)?;
    }

    project.observation_mut(&args.observation)?.events = events;
    Ok(())
}

/// Deletes rows of an observation.
pub fn delete<W: Write>(
    writer: &mut W,
    project: &mut Project,
    observation_id: &str,
    rows: &[usize],
) -> Result<()> {
    let observation = project.observation(observation_id)?;
    let ctx = TimelineContext::new(&project.ethogram, observation.kind);
    let events = delete_events(&observation.events, rows, &ctx)
        .with_context(|| format!("cannot delete rows from {observation_id:?}"))?;

    let removed = observation.events.len() - events.len();
    writeln!(writer, "{observation_id}: deleted {removed} event(s)")?;
    project.observation_mut(observation_id)?.events = events;
    Ok(())
}

/// Stops every unpaired state at the given position.
pub fn fix<W: Write>(
    writer: &mut W,
    project: &mut Project,
    observation_id: &str,
    at: &PositionArgs,
) -> Result<()> {
    let observation = project.observation(observation_id)?;
    let ctx = TimelineContext::new(&project.ethogram, observation.kind);
    let draft = draft_at(at)?;
    let events = close_unpaired(&observation.events, draft.time, draft.position, &ctx)
        .with_context(|| format!("cannot close unpaired states of {observation_id:?}"))?;

    let closed = events.len() - observation.events.len();
    writeln!(writer, "{observation_id}: closed {closed} unpaired state(s)")?;
    project.observation_mut(observation_id)?.events = events;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use boris_core::{EventKind, Timestamp};

    const PROJECT: &str = r#"{
        "ethogram": {
            "walk": {"type": "state", "excluded": ["rest"]},
            "rest": {"type": "state"},
            "bark": {
                "type": "point",
                "modifiers": [{"name": "volume", "type": "single_selection", "values": ["low", "high"]}]
            }
        },
        "observations": {
            "obs1": {"type": "LIVE", "events": [
                [1, "Rex", "rest", "", ""]
            ]}
        }
    }"#;

    fn at(time: &str) -> PositionArgs {
        PositionArgs {
            time: Some(time.to_string()),
            image: None,
            image_path: None,
            frame: None,
        }
    }

    fn args(time: &str, behavior: &str) -> CodeArgs {
        CodeArgs {
            project: "project.json".into(),
            observation: "obs1".to_string(),
            at: at(time),
            behavior: behavior.to_string(),
            subject: "Rex".to_string(),
            modifiers: String::new(),
            comment: String::new(),
            edit: None,
            close_same_event: false,
        }
    }

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    fn times(project: &Project) -> Vec<String> {
        project.observations["obs1"]
            .events
            .iter()
            .map(|e| format!("{} {} {}", e.time, e.kind, e.code))
            .collect()
    }

    #[test]
    fn test_code_stops_excluded_state() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let mut buffer = Vec::new();
        code(&mut buffer, &mut project, &args("10", "walk"), EventPolicy::default()).unwrap();

        assert_eq!(
            output(buffer),
            "obs1: recorded START walk at 00:00:10.000\nobs1: stopped 1 state(s)\n"
        );
        assert_eq!(
            times(&project),
            ["1 START rest", "9.999 STOP rest", "10 START walk"]
        );
    }

    #[test]
    fn test_code_parses_modifiers_against_behavior() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let mut request = args("2", "bark");
        request.modifiers = "high".to_string();
        code(&mut Vec::new(), &mut project, &request, EventPolicy::default()).unwrap();
        let bark = &project.observations["obs1"].events[1];
        assert_eq!(bark.kind, EventKind::Point);
        assert_eq!(bark.modifiers.to_legacy(), "high");

        request.modifiers = "deafening".to_string();
        request.at = at("3");
        let err = code(&mut Vec::new(), &mut project, &request, EventPolicy::default()).unwrap_err();
        assert!(format!("{err:#}").contains("deafening"));
    }

    #[test]
    fn test_code_recoding_active_state_with_close_same_event_records_nothing() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let before = project.clone();
        let policy = EventPolicy {
            close_same_event: true,
            ..EventPolicy::default()
        };
        let mut buffer = Vec::new();
        code(&mut buffer, &mut project, &args("5", "rest"), policy).unwrap();
        assert_eq!(output(buffer), "obs1: rest already active, nothing recorded\n");
        assert_eq!(project, before);
    }

    #[test]
    fn test_code_edit_moves_event() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let mut request = args("4", "rest");
        request.edit = Some(0);
        let mut buffer = Vec::new();
        code(&mut buffer, &mut project, &request, EventPolicy::default()).unwrap();
        assert_eq!(output(buffer), "obs1: updated START rest at 00:00:04.000\n");
        assert_eq!(times(&project), ["4 START rest"]);
    }

    #[test]
    fn test_code_rejection_leaves_project_untouched() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let before = project.clone();
        let err = code(
            &mut Vec::new(),
            &mut project,
            &args("1", "rest"),
            EventPolicy::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("already coded"));
        assert_eq!(project, before);
    }

    #[test]
    fn test_delete_rejects_orphaned_stop() {
        let mut project = Project::from_json(PROJECT).unwrap();
        code(&mut Vec::new(), &mut project, &args("5", "rest"), EventPolicy::default()).unwrap();

        assert!(delete(&mut Vec::new(), &mut project, "obs1", &[0]).is_err());

        let mut buffer = Vec::new();
        delete(&mut buffer, &mut project, "obs1", &[0, 1]).unwrap();
        assert_eq!(output(buffer), "obs1: deleted 2 event(s)\n");
        assert!(project.observations["obs1"].events.is_empty());
    }

    #[test]
    fn test_fix_closes_open_states() {
        let mut project = Project::from_json(PROJECT).unwrap();
        let mut buffer = Vec::new();
        fix(&mut buffer, &mut project, "obs1", &at("00:01:00")).unwrap();
        assert_eq!(output(buffer), "obs1: closed 1 unpaired state(s)\n");
        let events = &project.observations["obs1"].events;
        assert_eq!(events[1].kind, EventKind::Stop);
        assert_eq!(events[1].time.seconds(), Some(Timestamp::from_secs(60)));
    }
}
