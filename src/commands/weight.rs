use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use colored::Colorize;
use ironlog::{
    error::ValidationError,
    stats::moving_average,
    types::emit,
    utils::{create_ascii_graph, terminal_width},
};
use serde::Serialize;

use super::{App, position};
use crate::cli::WeightCmd;

#[derive(Serialize)]
struct WeightJson<'a> {
    idx: usize,
    id: &'a str,
    weight: f64,
    logged_at: chrono::DateTime<Utc>,
    moving_average: Option<f64>,
    notes: Option<&'a str>,
}

pub async fn handle(cmd: WeightCmd, app: &App) -> Result<()> {
    match cmd {
        WeightCmd::Add {
            weight,
            date,
            notes,
        } => {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "weight",
                    reason: "must be greater than zero".into(),
                }
                .into());
            }

            let logged_at = match date {
                Some(d) => parse_day(&d)?,
                None => app.clock.now(),
            };
            let notes = notes.filter(|n| !n.trim().is_empty());
            let log = app.db.add_weight_log(weight, logged_at, notes).await?;
            let units = app.units().await?;
            println!(
                "{} logged {}{} on {}",
                "ok:".green().bold(),
                log.weight,
                units.weight_suffix(),
                log.logged_at.with_timezone(&Local).format("%Y-%m-%d")
            );
        }

        WeightCmd::List { graph } => {
            let logs = app.db.weight_logs().await?;
            let units = app.units().await?;
            // Oldest first, with the trailing average alongside.
            let points = moving_average(&logs);

            if graph && app.fmt == ironlog::types::OutputFmt::Text {
                let data: Vec<_> = points.iter().map(|p| (p.logged_at, p.weight)).collect();
                let width = terminal_width().saturating_sub(12).clamp(20, 80);
                let title = format!("Body weight ({})", units.weight_suffix());
                for line in create_ascii_graph(&data, width, 12, &title) {
                    println!("{line}");
                }
                return Ok(());
            }

            // Newest first to match the list indices used by `weight delete`.
            let rows: Vec<WeightJson> = logs
                .iter()
                .enumerate()
                .map(|(i, log)| WeightJson {
                    idx: i + 1,
                    id: &log.id,
                    weight: log.weight,
                    logged_at: log.logged_at,
                    moving_average: points
                        .iter()
                        .find(|p| p.logged_at == log.logged_at && p.weight == log.weight)
                        .and_then(|p| p.moving_average),
                    notes: log.notes.as_deref(),
                })
                .collect();

            emit(app.fmt, &rows, || {
                if rows.is_empty() {
                    println!("{}", "  (no weight entries yet)".dimmed());
                    return;
                }
                println!("{}", "Weight:".cyan().bold());
                let idx_w = rows.len().to_string().len();
                for r in &rows {
                    let avg = r
                        .moving_average
                        .map(|a| format!("avg {a:.1}"))
                        .unwrap_or_default();
                    println!(
                        " {} • {}  {:>7}  {:<9} {}",
                        format!("{:>idx_w$}", r.idx).yellow(),
                        r.logged_at.with_timezone(&Local).format("%Y-%m-%d"),
                        format!("{:.1}{}", r.weight, units.weight_suffix()).bold(),
                        avg.dimmed(),
                        r.notes.unwrap_or_default().dimmed()
                    );
                }
            })?;
        }

        WeightCmd::Delete { entry } => {
            let key = entry.trim();
            let id = match key.parse::<usize>() {
                Ok(idx) => {
                    let logs = app.db.weight_logs().await?;
                    let i = position(idx, logs.len(), "weight entry")?;
                    logs[i].id.clone()
                }
                Err(_) => key.to_string(),
            };
            app.db.delete_weight_log(&id).await?;
            println!("{} deleted weight entry `{}`", "ok:".green().bold(), entry);
        }
    }
    Ok(())
}

/// `YYYY-MM-DD` read as local noon, so the entry stays on that calendar day
/// in nearby time zones.
fn parse_day(raw: &str) -> Result<chrono::DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date `{raw}`, expected YYYY-MM-DD"))?;
    let noon = day
        .and_hms_opt(12, 0, 0)
        .context("invalid time of day")?;
    let local = Local
        .from_local_datetime(&noon)
        .earliest()
        .with_context(|| format!("`{raw}` does not exist in the local time zone"))?;
    Ok(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_parses_to_local_calendar_date() {
        let at = parse_day("2026-03-14").unwrap();
        assert_eq!(
            at.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
    }

    #[test]
    fn bad_day_is_rejected() {
        assert!(parse_day("14/03/2026").is_err());
        assert!(parse_day("2026-02-30").is_err());
    }
}
