use std::{
    io::{self, BufRead, Write},
    str::FromStr,
};

use anyhow::{Context, Result};
use colored::Colorize;
use ironlog::{
    models::Profile,
    onboarding::{Step, StepInput, Wizard},
    types::{ExperienceLevel, Gender, PrimaryGoal, Units},
};

use super::App;

pub async fn handle(app: &App) -> Result<()> {
    let wizard = match app.db.profile().await? {
        Some(p) => {
            println!("{} editing your existing profile", "info:".blue().bold());
            Wizard::from_profile(p)
        }
        None => Wizard::new(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let Some(profile) = run_wizard(wizard, stdin.lock(), stdout.lock())? else {
        println!("{} onboarding cancelled, nothing saved", "info:".blue().bold());
        return Ok(());
    };

    app.db.save_profile(&profile).await?;
    println!(
        "{} profile saved{}",
        "ok:".green().bold(),
        profile
            .full_name
            .as_deref()
            .map(|n| format!(" -- welcome, {n}!"))
            .unwrap_or_default()
    );
    Ok(())
}

enum Reply {
    Value(String),
    Back,
    Quit,
}

/// Drive `wizard` from line-based input. `None` when the user quits or input
/// runs out before the last step.
fn run_wizard<R: BufRead, W: Write>(
    mut wizard: Wizard,
    mut input: R,
    mut out: W,
) -> Result<Option<Profile>> {
    writeln!(
        out,
        "{}",
        "Press enter to keep the value in brackets, `-` to clear it, `back` for the previous step, `quit` to stop."
            .dimmed()
    )?;

    loop {
        let step = wizard.step();
        writeln!(
            out,
            "\n{} {}/{} {} {}",
            "Step".cyan().bold(),
            step.number(),
            Step::COUNT,
            step.title().bold(),
            format!("({}%)", step.percent_complete()).dimmed()
        )?;

        let draft = wizard.draft().clone();
        let step_input = match read_step(step, &draft, &mut input, &mut out)? {
            Flow::Input(i) => i,
            Flow::Back => {
                wizard.back();
                continue;
            }
            Flow::Retry => continue,
            Flow::Quit => return Ok(None),
        };

        match wizard.submit(step_input) {
            Ok(Some(profile)) => return Ok(Some(profile)),
            Ok(None) => {}
            Err(e) => writeln!(out, "{} {}", "error:".red().bold(), e)?,
        }
    }
}

enum Flow {
    Input(StepInput),
    Back,
    Retry,
    Quit,
}

/// Ask one question. Enter keeps `current`; `-` clears it.
fn ask<R: BufRead, W: Write>(
    label: &str,
    current: Option<String>,
    input: &mut R,
    out: &mut W,
) -> Result<Reply> {
    match &current {
        Some(c) => write!(out, "  {} [{}]: ", label, c.green())?,
        None => write!(out, "  {}: ", label)?,
    }
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).context("reading answer")? == 0 {
        return Ok(Reply::Quit);
    }
    let line = line.trim();
    Ok(match line {
        "back" => Reply::Back,
        "quit" | "exit" => Reply::Quit,
        "" => Reply::Value(current.unwrap_or_default()),
        "-" => Reply::Value(String::new()),
        other => Reply::Value(other.to_string()),
    })
}

macro_rules! answer {
    ($label:expr, $current:expr, $input:expr, $out:expr) => {
        match ask($label, $current, $input, $out)? {
            Reply::Value(v) => v,
            Reply::Back => return Ok(Flow::Back),
            Reply::Quit => return Ok(Flow::Quit),
        }
    };
}

fn read_step<R: BufRead, W: Write>(
    step: Step,
    draft: &Profile,
    input: &mut R,
    out: &mut W,
) -> Result<Flow> {
    let parsed = match step {
        Step::Profile => {
            let full_name = answer!("Full name", draft.full_name.clone(), input, out);
            let dob = answer!(
                "Date of birth (YYYY-MM-DD, optional)",
                draft.date_of_birth.map(|d| d.to_string()),
                input,
                out
            );
            let gender = answer!(
                &choices("Gender", Gender::ALL),
                draft.gender.map(|g| g.to_string()),
                input,
                out
            );
            optional::<Gender>(&gender).map(|gender| StepInput::Profile {
                full_name,
                date_of_birth: Some(dob).filter(|d| !d.is_empty()),
                gender,
            })
        }
        Step::Metrics => {
            let units = draft.preferred_units;
            let weight = answer!(
                &format!("Current weight ({})", units.weight_suffix()),
                fmt_num(draft.current_weight),
                input,
                out
            );
            let height = answer!(
                &format!("Height ({})", units.length_suffix()),
                fmt_num(draft.height),
                input,
                out
            );
            let body_fat = answer!("Body fat %", fmt_num(draft.body_fat_percentage), input, out);
            (|| -> std::result::Result<StepInput, String> {
                Ok(StepInput::Metrics {
                    current_weight: number(&weight)?,
                    height: number(&height)?,
                    body_fat_percentage: number(&body_fat)?,
                })
            })()
        }
        Step::Goals => {
            let target = answer!(
                &format!("Target weight ({})", draft.preferred_units.weight_suffix()),
                fmt_num(draft.target_weight),
                input,
                out
            );
            let level = answer!(
                &choices("Experience", ExperienceLevel::ALL),
                draft.experience_level.map(|l| l.to_string()),
                input,
                out
            );
            let goal = answer!(
                &choices("Primary goal", PrimaryGoal::ALL),
                draft.primary_goal.map(|g| g.to_string()),
                input,
                out
            );
            (|| -> std::result::Result<StepInput, String> {
                Ok(StepInput::Goals {
                    target_weight: number(&target)?,
                    experience_level: optional(&level)?,
                    primary_goal: optional(&goal)?,
                })
            })()
        }
        Step::Preferences => {
            let units = answer!(
                &choices("Units", Units::ALL),
                Some(draft.preferred_units.to_string()),
                input,
                out
            );
            optional::<Units>(&units).map(|u| StepInput::Preferences {
                preferred_units: u.unwrap_or_default(),
            })
        }
    };

    match parsed {
        Ok(i) => Ok(Flow::Input(i)),
        Err(reason) => {
            writeln!(out, "{} {}", "error:".red().bold(), reason)?;
            Ok(Flow::Retry)
        }
    }
}

fn choices<T: ToString>(label: &str, all: &[T]) -> String {
    let opts: Vec<String> = all.iter().map(ToString::to_string).collect();
    format!("{} ({})", label, opts.join("/"))
}

fn fmt_num(v: Option<f64>) -> Option<String> {
    v.map(|n| n.to_string())
}

fn optional<T: FromStr<Err = String>>(raw: &str) -> std::result::Result<Option<T>, String> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

fn number(raw: &str) -> std::result::Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("`{raw}` is not a number"))
}
