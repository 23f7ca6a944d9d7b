use once_cell::sync::Lazy;
use std::{collections::HashSet, fmt::Display, str::FromStr};
use strsim::jaro_winkler;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Declares a closed set of snake_case text values that round-trip through
/// clap, serde, `Display` and `FromStr` under the same spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[value(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown {} `{}` (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

text_enum!(
    /// Primary muscle group an exercise trains.
    MuscleGroup {
        Chest => "chest",
        Back => "back",
        Legs => "legs",
        Shoulders => "shoulders",
        Biceps => "biceps",
        Triceps => "triceps",
        Core => "core",
        Cardio => "cardio",
    }
);

text_enum!(Equipment {
    Barbell => "barbell",
    Dumbbells => "dumbbells",
    Machine => "machine",
    Cable => "cable",
    Bodyweight => "bodyweight",
    Other => "other",
});

text_enum!(Difficulty {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

text_enum!(ExerciseType {
    Compound => "compound",
    Isolation => "isolation",
    Cardio => "cardio",
});

text_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
    PreferNotToSay => "prefer_not_to_say",
});

text_enum!(ExperienceLevel {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

text_enum!(PrimaryGoal {
    Strength => "strength",
    Hypertrophy => "hypertrophy",
    Endurance => "endurance",
    WeightLoss => "weight_loss",
    GeneralFitness => "general_fitness",
});

text_enum!(Units {
    Metric => "metric",
    Imperial => "imperial",
});

impl Default for Units {
    fn default() -> Self {
        Self::Metric
    }
}

impl Units {
    pub fn weight_suffix(self) -> &'static str {
        match self {
            Units::Metric => "kg",
            Units::Imperial => "lb",
        }
    }

    pub fn length_suffix(self) -> &'static str {
        match self {
            Units::Metric => "cm",
            Units::Imperial => "in",
        }
    }
}

pub static ALLOWED_MUSCLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| MuscleGroup::ALL.iter().map(|m| m.as_str()).collect());

/// Returns the canonical muscle group or `None` if not allowed.
pub fn canonical_muscle<S: AsRef<str>>(m: S) -> Option<MuscleGroup> {
    let raw = m.as_ref();
    if raw.chars().any(char::is_control) {
        return None;
    }

    let m = raw.trim().to_ascii_lowercase();
    if ALLOWED_MUSCLES.contains(m.as_str()) {
        m.parse().ok()
    } else {
        None
    }
}

/// Return the closest candidate for `input`
/// if similarity ≥ 0.80 *and* clearly better than the runner-up.
/// Otherwise return `None` (no suggestion shown).
pub fn best_suggestion<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let inp = input.trim().to_ascii_lowercase();
    if inp.is_empty() {
        return None;
    }

    // Collect (candidate, score) pairs.
    let mut scores: Vec<(&'a str, f64)> = candidates
        .into_iter()
        .map(|c| (c, jaro_winkler(&inp, &c.to_ascii_lowercase())))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = *scores.first()?;
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}

pub fn best_muscle_suggestion(input: &str) -> Option<&'static str> {
    best_suggestion(input, ALLOWED_MUSCLES.iter().copied())
}

//
// Output
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFmt {
    Text,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Print `data` as pretty JSON, or run `text` to render it for humans.
pub fn emit<T, F>(fmt: OutputFmt, data: &T, text: F) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(),
{
    match fmt {
        OutputFmt::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFmt::Text => text(),
    }
    Ok(())
}

//
// TOML import formats
//

#[derive(Debug, Deserialize)]
pub struct ExerciseDef {
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub primary_muscle_group: String,
    pub equipment: Option<String>,
    pub difficulty: Option<String>,
    pub exercise_type: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseImport {
    pub exercise: Vec<ExerciseDef>,
}

#[derive(Debug, Deserialize)]
pub struct RoutineDef {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub exercises: Vec<RoutineExerciseDef>,
}

#[derive(Debug, Deserialize)]
pub struct RoutineExerciseDef {
    pub name: String,
    pub target_sets: Option<u32>,
    pub target_reps_min: Option<u32>,
    pub target_reps_max: Option<u32>,
    pub rest_period_seconds: Option<u32>,
    pub notes: Option<String>,
}
