use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use boris_cli::commands::{check, edit, kappa, states, util};
use boris_cli::{Cli, Commands, Config, Project};

fn load_project(path: &Path) -> Result<Project> {
    let project = Project::load(path)?;
    tracing::debug!(
        path = %path.display(),
        observations = project.observations.len(),
        "loaded project"
    );
    Ok(project)
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Kappa {
            project,
            weighted,
            event_weight,
            decimals,
            modifiers,
            observations,
            json,
        }) => {
            let project = load_project(project)?;
            let config = Config {
                event_weight: event_weight.unwrap_or(config.event_weight),
                ..config
            };
            let options = kappa::KappaOptions {
                method: config.agreement_method(*weighted),
                decimal_places: decimals.or(config.decimal_places),
                include_modifiers: *modifiers || config.include_modifiers,
                observations: observations.clone(),
                json: *json,
            };
            kappa::run(&mut out, &project, &options)?;
        }
        Some(Commands::States {
            project,
            observation,
            at,
            timeline,
            modifiers,
            subjects,
        }) => {
            let project = load_project(project)?;
            let include_modifiers = *modifiers || config.include_modifiers;
            if *timeline {
                states::run_timeline(&mut out, &project, observation, subjects, include_modifiers)?;
            } else {
                let kind = project.observation(observation)?.kind;
                let key = util::key_at(at, kind)?;
                states::run(&mut out, &project, observation, key, subjects, include_modifiers)?;
            }
        }
        Some(Commands::Check {
            project,
            observation,
        }) => {
            let project = load_project(project)?;
            let broken = check::run(&mut out, &project, observation.as_deref())?;
            if broken > 0 {
                out.flush()?;
                anyhow::bail!("{broken} observation(s) with broken start/stop pairing");
            }
        }
        Some(Commands::Code(args)) => {
            let mut project = load_project(&args.project)?;
            let mut policy = config.policy();
            policy.close_same_event |= args.close_same_event;
            edit::code(&mut out, &mut project, args, policy)?;
            project.save(&args.project)?;
        }
        Some(Commands::Delete {
            project: path,
            observation,
            rows,
        }) => {
            let mut project = load_project(path)?;
            edit::delete(&mut out, &mut project, observation, rows)?;
            project.save(path)?;
        }
        Some(Commands::Fix {
            project: path,
            observation,
            at,
        }) => {
            let mut project = load_project(path)?;
            edit::fix(&mut out, &mut project, observation, at)?;
            project.save(path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
