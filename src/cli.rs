use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use ironlog::{
    ai::AiFeature,
    types::{Difficulty, Equipment, ExerciseType, MuscleGroup},
};

#[derive(Parser)]
#[command(name = "ironlog", version, about = "Workout tracker for the terminal")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Tracker(TrackerCmd),

    /// View or edit ironlog config
    #[command(subcommand)]
    Config(ConfigCmd),
}

/// Commands that need the database.
#[derive(Subcommand)]
pub enum TrackerCmd {
    /// Live workout session
    #[command(subcommand, visible_alias = "s")]
    Session(SessionCmd),

    /// Exercise library
    #[command(subcommand, visible_alias = "ex")]
    Exercise(ExerciseCmd),

    /// Workout routines
    #[command(subcommand, visible_alias = "r")]
    Routine(RoutineCmd),

    /// Completed workouts
    #[command(subcommand, visible_alias = "h")]
    History(HistoryCmd),

    /// Body-weight log
    #[command(subcommand, visible_alias = "w")]
    Weight(WeightCmd),

    /// Dashboard: totals, this week, streak, latest weight
    Status,

    /// Set up or edit your profile
    Onboard,

    /// AI training assistant
    #[command(subcommand)]
    Ai(AiCmd),

    /// Serve the AI chat endpoint over HTTP
    Serve {
        /// Address to bind (defaults to config `serve.addr`)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

//
// Commands
//

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Start a session from a routine or from a list of exercises
    #[command(visible_alias = "st")]
    #[command(override_usage = "session start --routine <ROUTINE> | session start <EXERCISE>...")]
    Start {
        /// Routine index (from `routine list`), id or exact name
        #[arg(short, long, conflicts_with = "exercises")]
        routine: Option<String>,

        /// Session name (defaults to the routine name, or "Workout")
        #[arg(short, long)]
        name: Option<String>,

        /// Exercises by library index, id or name
        #[arg(value_name = "EXERCISE", required_unless_present = "routine")]
        exercises: Vec<String>,
    },

    /// Show the current session
    #[command(visible_alias = "i")]
    Show,

    /// Log a set - Usage: session log WEIGHT REPS
    #[command(visible_alias = "l")]
    #[command(override_usage = "session log <WEIGHT> <REPS> [--exercise N] [--rpe R] [--warmup]")]
    Log {
        /// Weight in your preferred units (use "bw" or "" for bodyweight)
        #[arg(value_name = "WEIGHT", allow_hyphen_values = true)]
        weight: String,

        /// Number of reps
        #[arg(value_name = "REPS", allow_hyphen_values = true)]
        reps: String,

        /// 1-based exercise index (defaults to the current exercise)
        #[arg(short, long)]
        exercise: Option<usize>,

        /// Rate of perceived exertion, 1-10
        #[arg(long)]
        rpe: Option<String>,

        /// Mark as a warm-up set
        #[arg(short, long)]
        warmup: bool,

        /// Rest period to start afterwards, in seconds
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        rest: Option<u32>,
    },

    /// Edit a logged set - Usage: session edit EXERCISE SET
    #[command(visible_alias = "e")]
    Edit {
        /// 1-based exercise index
        exercise: usize,

        /// 1-based set position
        set: usize,

        #[arg(long, allow_hyphen_values = true)]
        weight: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        reps: Option<String>,

        /// New RPE; pass "" to clear it
        #[arg(long)]
        rpe: Option<String>,

        #[arg(long)]
        warmup: Option<bool>,
    },

    /// Remove a logged set - Usage: session remove EXERCISE SET
    #[command(visible_alias = "rm")]
    Remove { exercise: usize, set: usize },

    /// Attach a note to an exercise (empty text clears it)
    #[command(visible_alias = "n")]
    #[command(override_usage = "session note <EX_IDX> <NOTE_STRING>")]
    Note {
        /// 1-based index of the exercise (same order shown in `session show`)
        #[arg(value_name = "EX_IDX")]
        exercise: usize,

        /// Free-form text
        #[arg(value_name = "NOTE_STRING")]
        note: String,
    },

    /// Jump to an exercise
    Goto { exercise: usize },

    /// Move to the next exercise
    Next,

    /// Move to the previous exercise
    Prev,

    /// Start, restart or clear the rest timer
    Rest {
        /// Seconds (defaults to config `rest_seconds`)
        seconds: Option<u32>,

        /// Stop the running timer
        #[arg(long, conflicts_with = "seconds")]
        clear: bool,
    },

    /// Watch the rest countdown until it finishes
    #[command(visible_alias = "t")]
    Timer,

    /// Save the session as a completed workout
    #[command(visible_alias = "end")]
    Complete,

    /// Discard the current session
    #[command(visible_alias = "c")]
    Cancel,
}

#[derive(Debug, Subcommand)]
pub enum ExerciseCmd {
    /// Add a new exercise
    #[command(visible_alias = "a")]
    Add {
        name: String,

        #[arg(short, long)]
        muscle: MuscleGroup,

        #[arg(short, long, default_value = "other")]
        equipment: Equipment,

        #[arg(short, long, default_value = "beginner")]
        difficulty: Difficulty,

        #[arg(short = 't', long = "type", default_value = "compound")]
        exercise_type: ExerciseType,

        #[arg(long)]
        desc: Option<String>,

        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        video_url: Option<String>,
    },

    /// Import exercises from a TOML file with `[[exercise]]` entries
    #[command(visible_alias = "i")]
    Import { file: String },

    /// List exercises
    #[command(visible_alias = "l")]
    List {
        #[arg(short, long)]
        muscle: Option<MuscleGroup>,

        #[arg(short, long)]
        equipment: Option<Equipment>,

        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one exercise
    #[command(visible_alias = "s")]
    Show {
        /// Index (from `ex list`), id or name
        exercise: Vec<String>,
    },

    /// Delete an exercise
    #[command(visible_alias = "d")]
    Delete {
        /// Index (from `ex list`), id or name
        exercise: String,
    },
}

#[derive(Subcommand)]
pub enum RoutineCmd {
    /// Import one or more routines from TOML
    #[command(visible_alias = "i")]
    Import { files: Vec<String> },

    /// List routines
    #[command(visible_alias = "l")]
    List,

    /// Show a single routine in detail
    #[command(visible_alias = "s")]
    Show {
        /// Routine index (from `r list`), id or exact name
        routine: String,
    },

    /// Delete a routine
    #[command(visible_alias = "d")]
    Delete {
        /// Routine index (from `r list`), id or exact name
        routine: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryCmd {
    /// List completed workouts, newest first
    #[command(visible_alias = "l")]
    List {
        /// Show at most this many
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one workout with all sets
    #[command(visible_alias = "s")]
    Show {
        /// Index (from `h list`) or id
        workout: String,
    },

    /// Delete a workout and its sets
    #[command(visible_alias = "d")]
    Delete {
        /// Index (from `h list`) or id
        workout: String,
    },
}

#[derive(Subcommand)]
pub enum WeightCmd {
    /// Log body weight
    #[command(visible_alias = "a")]
    Add {
        /// Weight in your preferred units
        weight: f64,

        /// Date in YYYY-MM-DD format (defaults to now)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List entries with the 7-entry moving average
    #[command(visible_alias = "l")]
    List {
        /// Draw a graph instead of a table
        #[arg(short, long)]
        graph: bool,
    },

    /// Delete an entry
    #[command(visible_alias = "d")]
    Delete {
        /// Index (from `w list`) or id
        entry: String,
    },
}

#[derive(Subcommand)]
pub enum AiCmd {
    /// Ask the assistant a question
    Ask {
        #[arg(short, long, value_enum, default_value_t = AiFeature::GeneralQa)]
        feature: AiFeature,

        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Show the local chat history
    History,

    /// Clear the local chat history
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_split_from_database_commands() {
        let cli = Cli::try_parse_from(["ironlog", "config", "list"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Config(ConfigCmd::List)));

        let cli = Cli::try_parse_from(["ironlog", "--json", "status"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.cmd, Commands::Tracker(TrackerCmd::Status)));
    }

    #[test]
    fn log_rejects_zero_rest() {
        assert!(Cli::try_parse_from(["ironlog", "session", "log", "60", "8", "--rest", "0"]).is_err());

        let cli =
            Cli::try_parse_from(["ironlog", "session", "log", "60", "8", "--rest", "45"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Commands::Tracker(TrackerCmd::Session(SessionCmd::Log { rest: Some(45), .. }))
        ));
    }
}
