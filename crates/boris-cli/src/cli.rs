//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Behavioral observation toolkit.
///
/// Records coded events into BORIS project files and measures agreement
/// between observers.
#[derive(Debug, Parser)]
#[command(name = "boris", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cohen's Kappa between every pair of observations.
    Kappa {
        /// Project file.
        project: PathBuf,

        /// Weight intervals by duration instead of counting them.
        #[arg(long)]
        weighted: bool,

        /// Weight of a point event in the time-weighted variant.
        #[arg(long)]
        event_weight: Option<f64>,

        /// Round times to this many decimal places (negative for tens, hundreds...).
        #[arg(long, allow_hyphen_values = true)]
        decimals: Option<i32>,

        /// Compare modifiers as well as behaviors.
        #[arg(long)]
        modifiers: bool,

        /// Observations to compare (default: all).
        #[arg(short, long = "observation")]
        observations: Vec<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the states active at a position of an observation.
    States {
        /// Project file.
        project: PathBuf,

        #[arg(short, long)]
        observation: String,

        #[command(flatten)]
        at: PositionArgs,

        /// List the active states after every event instead.
        #[arg(long, conflicts_with_all = ["time", "image"])]
        timeline: bool,

        /// Show the modifiers of each state.
        #[arg(long)]
        modifiers: bool,

        /// Subjects to report (default: every subject of the observation).
        #[arg(short, long = "subject")]
        subjects: Vec<String>,
    },

    /// Check start/stop pairing and list unpaired states.
    Check {
        /// Project file.
        project: PathBuf,

        /// Only check this observation.
        #[arg(short, long)]
        observation: Option<String>,
    },

    /// Record or edit a coded event.
    Code(CodeArgs),

    /// Delete events by row.
    Delete {
        /// Project file.
        project: PathBuf,

        #[arg(short, long)]
        observation: String,

        /// Rows to delete, counted from 0.
        #[arg(required = true)]
        rows: Vec<usize>,
    },

    /// Stop every unpaired state at a position.
    Fix {
        /// Project file.
        project: PathBuf,

        #[arg(short, long)]
        observation: String,

        #[command(flatten)]
        at: PositionArgs,
    },
}

/// Where in an observation: a time, or a picture for image observations.
#[derive(Debug, Clone, Args)]
pub struct PositionArgs {
    /// Time in seconds (12.5) or clock notation (00:01:02.500).
    #[arg(short, long, allow_hyphen_values = true)]
    pub time: Option<String>,

    /// Picture index, for image observations.
    #[arg(long)]
    pub image: Option<u64>,

    /// Picture path stored with the event.
    #[arg(long, requires = "image")]
    pub image_path: Option<String>,

    /// Media frame index stored with the event.
    #[arg(long, conflicts_with = "image")]
    pub frame: Option<u64>,
}

/// Arguments of `boris code`.
#[derive(Debug, Clone, Args)]
pub struct CodeArgs {
    /// Project file.
    pub project: PathBuf,

    #[arg(short, long)]
    pub observation: String,

    #[command(flatten)]
    pub at: PositionArgs,

    /// Behavior code.
    #[arg(short, long)]
    pub behavior: String,

    /// Focal subject (default: no focal subject).
    #[arg(short, long, default_value = "")]
    pub subject: String,

    /// Modifiers in project notation: `|` between sets, `,` inside a multiple selection.
    #[arg(short, long, default_value = "")]
    pub modifiers: String,

    #[arg(long, default_value = "")]
    pub comment: String,

    /// Replace the event at this row instead of adding one.
    #[arg(long)]
    pub edit: Option<usize>,

    /// Stop a running state and restart it when its modifiers change.
    #[arg(long)]
    pub close_same_event: bool,
}
