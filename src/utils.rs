use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::types::Units;

/// Printable width of `s`, ignoring ANSI colour escapes.
pub fn plain_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut count = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1B {
            // Skip \x1b[... m
            while i < bytes.len() && bytes[i] != b'm' {
                i += 1;
            }
            i += 1;
        } else {
            // Count chars, not UTF-8 continuation bytes.
            if bytes[i] & 0xC0 != 0x80 {
                count += 1;
            }
            i += 1;
        }
    }
    count
}

/// Pad `s` on the right to `width` printable columns.
pub fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(plain_len(s));
    format!("{s}{}", " ".repeat(fill))
}

pub fn format_minutes(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// `None` is bodyweight.
pub fn format_weight(weight: Option<f64>, units: Units) -> String {
    match weight {
        Some(w) => format!("{w}{}", units.weight_suffix()),
        None => "bw".to_string(),
    }
}

pub fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Line chart of `data` (in chronological order) drawn with box characters.
pub fn create_ascii_graph(
    data: &[(DateTime<Utc>, f64)],
    width: usize,
    height: usize,
    title: &str,
) -> Vec<String> {
    if data.len() < 2 {
        return vec!["Not enough data to draw a graph".to_string()];
    }
    let width = width.max(2);
    let height = height.max(2);

    let min_value = data.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_value = data.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;

    if range == 0.0 {
        return vec!["No variation in data".to_string()];
    }

    let to_cell = |i: usize, value: f64| -> (usize, usize) {
        let x = (i as f64 / (data.len() - 1) as f64 * (width - 1) as f64) as usize;
        let y = ((value - min_value) / range * (height - 1) as f64) as usize;
        (x.min(width - 1), height - 1 - y.min(height - 1))
    };

    let mut grid = vec![vec![' '; width]; height];

    for (i, (_, value)) in data.iter().enumerate() {
        let (x, y) = to_cell(i, *value);
        grid[y][x] = '●';

        if i > 0 {
            let (prev_x, prev_y) = to_cell(i - 1, data[i - 1].1);
            let dx = x as isize - prev_x as isize;
            let dy = y as isize - prev_y as isize;
            let steps = dx.abs().max(dy.abs());

            for step in 1..steps {
                let px = (prev_x as isize + dx * step / steps) as usize;
                let py = (prev_y as isize + dy * step / steps) as usize;
                if grid[py][px] == ' ' {
                    grid[py][px] = '·';
                }
            }
        }
    }

    let mut result = Vec::new();
    let step = range / (height - 1) as f64;

    result.push(format!("\n{}", title.bold()));
    result.push("─".repeat(width + 8));

    for (i, row) in grid.iter().enumerate() {
        let value = min_value + step * (height - 1 - i) as f64;
        result.push(format!("{:6.1} │{}", value, row.iter().collect::<String>()));
    }

    result.push(format!("       └{}", "─".repeat(width)));

    let first = data[0].0.format("%Y-%m-%d").to_string();
    let last = data[data.len() - 1].0.format("%Y-%m-%d").to_string();
    let gap = (width + 1).saturating_sub(first.len() + last.len());
    result.push(format!("        {first}{}{last}", " ".repeat(gap)));

    result
}
