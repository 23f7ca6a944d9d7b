//! First-run profile wizard.
//!
//! Four steps, each with its own validated input. Submitting a step merges its
//! fields into the draft profile and moves forward; the last step yields the
//! finished [`Profile`]. `next`/`back` clamp to the first and last step.

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    error::ValidationError,
    models::Profile,
    types::{ExperienceLevel, Gender, PrimaryGoal, Units},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Profile,
    Metrics,
    Goals,
    Preferences,
}

impl Step {
    pub const COUNT: u8 = 4;

    /// 1-based.
    pub fn number(self) -> u8 {
        match self {
            Step::Profile => 1,
            Step::Metrics => 2,
            Step::Goals => 3,
            Step::Preferences => 4,
        }
    }

    fn from_number(n: u8) -> Self {
        match n.clamp(1, Self::COUNT) {
            1 => Step::Profile,
            2 => Step::Metrics,
            3 => Step::Goals,
            _ => Step::Preferences,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Profile => "Tell us about yourself",
            Step::Metrics => "Your current metrics",
            Step::Goals => "Set your goals",
            Step::Preferences => "Final preferences",
        }
    }

    pub fn percent_complete(self) -> u8 {
        (u16::from(self.number()) * 100 / u16::from(Self::COUNT)) as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    Profile {
        full_name: String,
        date_of_birth: Option<String>,
        gender: Option<Gender>,
    },
    Metrics {
        current_weight: Option<f64>,
        height: Option<f64>,
        body_fat_percentage: Option<f64>,
    },
    Goals {
        target_weight: Option<f64>,
        experience_level: Option<ExperienceLevel>,
        primary_goal: Option<PrimaryGoal>,
    },
    Preferences {
        preferred_units: Units,
    },
}

impl StepInput {
    fn step(&self) -> Step {
        match self {
            StepInput::Profile { .. } => Step::Profile,
            StepInput::Metrics { .. } => Step::Metrics,
            StepInput::Goals { .. } => Step::Goals,
            StepInput::Preferences { .. } => Step::Preferences,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    draft: Profile,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: Step::Profile,
            draft: Profile {
                preferred_units: Units::Metric,
                ..Default::default()
            },
        }
    }

    /// Resume from an existing profile, e.g. to edit it.
    pub fn from_profile(profile: Profile) -> Self {
        Self {
            step: Step::Profile,
            draft: profile,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &Profile {
        &self.draft
    }

    pub fn next(&mut self) {
        self.step = Step::from_number(self.step.number() + 1);
    }

    pub fn back(&mut self) {
        self.step = Step::from_number(self.step.number().saturating_sub(1));
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Validate `input` for the current step and merge it into the draft.
    /// Returns the completed profile when the last step is submitted. On
    /// error neither the draft nor the step changes.
    pub fn submit(&mut self, input: StepInput) -> Result<Option<Profile>, ValidationError> {
        if input.step() != self.step {
            return Err(ValidationError::OutOfRange {
                field: "step",
                reason: format!(
                    "expected input for step {}, got step {}",
                    self.step.number(),
                    input.step().number()
                ),
            });
        }

        self.draft = apply(self.draft.clone(), input)?;
        debug!(step = self.step.number(), "onboarding step accepted");

        if self.step == Step::Preferences {
            let mut done = self.draft.clone();
            done.onboarding_completed = true;
            return Ok(Some(done));
        }
        self.next();
        Ok(None)
    }
}

fn apply(mut draft: Profile, input: StepInput) -> Result<Profile, ValidationError> {
    match input {
        StepInput::Profile {
            full_name,
            date_of_birth,
            gender,
        } => {
            let full_name = full_name.trim();
            if full_name.chars().count() < 2 {
                return Err(ValidationError::OutOfRange {
                    field: "full_name",
                    reason: "name must be at least 2 characters".into(),
                });
            }
            draft.full_name = Some(full_name.to_string());
            draft.date_of_birth = date_of_birth
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_date)
                .transpose()?;
            draft.gender = gender;
        }
        StepInput::Metrics {
            current_weight,
            height,
            body_fat_percentage,
        } => {
            draft.current_weight = positive("current_weight", current_weight)?;
            draft.height = positive("height", height)?;
            if let Some(bf) = body_fat_percentage {
                if !(0.0..=100.0).contains(&bf) {
                    return Err(ValidationError::OutOfRange {
                        field: "body_fat_percentage",
                        reason: "must be between 0 and 100".into(),
                    });
                }
            }
            draft.body_fat_percentage = body_fat_percentage;
        }
        StepInput::Goals {
            target_weight,
            experience_level,
            primary_goal,
        } => {
            draft.target_weight = positive("target_weight", target_weight)?;
            draft.experience_level = experience_level;
            draft.primary_goal = primary_goal;
        }
        StepInput::Preferences { preferred_units } => {
            draft.preferred_units = preferred_units;
        }
    }
    Ok(draft)
}

fn positive(field: &'static str, v: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match v {
        Some(x) if !(x.is_finite() && x > 0.0) => Err(ValidationError::OutOfRange {
            field,
            reason: "must be positive".into(),
        }),
        other => Ok(other),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::OutOfRange {
        field: "date_of_birth",
        reason: format!("`{raw}` is not a YYYY-MM-DD date"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn profile_input(name: &str) -> StepInput {
        StepInput::Profile {
            full_name: name.into(),
            date_of_birth: Some("1992-07-04".into()),
            gender: Some(Gender::Female),
        }
    }

    #[test]
    fn navigation_clamps_to_bounds() {
        let mut w = Wizard::new();
        w.back();
        assert_eq!(w.step(), Step::Profile);
        for _ in 0..10 {
            w.next();
        }
        assert_eq!(w.step(), Step::Preferences);
        assert_eq!(w.step().percent_complete(), 100);
    }

    #[test]
    fn every_step_reports_its_progress() {
        let percents: Vec<u8> = (1..=Step::COUNT)
            .map(|n| Step::from_number(n).percent_complete())
            .collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
    }

    #[test]
    fn short_name_is_rejected_without_advancing() {
        let mut w = Wizard::new();
        assert_matches!(
            w.submit(profile_input(" A ")),
            Err(ValidationError::OutOfRange { field: "full_name", .. })
        );
        assert_eq!(w.step(), Step::Profile);
        assert_eq!(w.draft().full_name, None);
    }

    #[test]
    fn input_for_another_step_is_rejected() {
        let mut w = Wizard::new();
        assert_matches!(
            w.submit(StepInput::Preferences {
                preferred_units: Units::Imperial
            }),
            Err(ValidationError::OutOfRange { field: "step", .. })
        );
    }

    #[test]
    fn metrics_bounds() {
        let mut w = Wizard::new();
        w.submit(profile_input("Alex")).unwrap();
        assert_matches!(
            w.submit(StepInput::Metrics {
                current_weight: Some(-1.0),
                height: None,
                body_fat_percentage: None,
            }),
            Err(ValidationError::OutOfRange { field: "current_weight", .. })
        );
        assert_matches!(
            w.submit(StepInput::Metrics {
                current_weight: None,
                height: None,
                body_fat_percentage: Some(101.0),
            }),
            Err(ValidationError::OutOfRange { field: "body_fat_percentage", .. })
        );
        assert_eq!(w.step(), Step::Metrics);
    }

    #[test]
    fn full_walk_produces_completed_profile() {
        let mut w = Wizard::new();
        assert_eq!(w.submit(profile_input("Alex")).unwrap(), None);
        assert_eq!(
            w.submit(StepInput::Metrics {
                current_weight: Some(72.5),
                height: Some(178.0),
                body_fat_percentage: Some(0.0),
            })
            .unwrap(),
            None
        );
        assert_eq!(
            w.submit(StepInput::Goals {
                target_weight: Some(70.0),
                experience_level: Some(ExperienceLevel::Beginner),
                primary_goal: Some(PrimaryGoal::Strength),
            })
            .unwrap(),
            None
        );
        let done = w
            .submit(StepInput::Preferences {
                preferred_units: Units::Metric,
            })
            .unwrap()
            .unwrap();

        assert!(done.onboarding_completed);
        assert_eq!(done.full_name.as_deref(), Some("Alex"));
        assert_eq!(done.date_of_birth, NaiveDate::from_ymd_opt(1992, 7, 4));
        assert_eq!(done.current_weight, Some(72.5));
        assert_eq!(done.primary_goal, Some(PrimaryGoal::Strength));
    }
}
