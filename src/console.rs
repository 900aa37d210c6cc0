//! Colorful console output for solver progress.
//!
//! Everything here is silent unless the solver config enables the console.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

use crate::score::HardSoftScore;

/// ASCII art banner for server startup.
pub fn print_banner() {
    let banner = r#"
  ____       _                 _   _____ _                _        _     _
 / ___|  ___| |__   ___   ___ | | |_   _(_)_ __ ___   ___| |_ __ _| |__ | | ___
 \___ \ / __| '_ \ / _ \ / _ \| |   | | | | '_ ` _ \ / _ \ __/ _` | '_ \| |/ _ \
  ___) | (__| | | | (_) | (_) | |   | | | | | | | | |  __/ || (_| | |_) | |  __/
 |____/ \___|_| |_|\___/ \___/|_|   |_| |_|_| |_| |_|\___|\__\__,_|_.__/|_|\___|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "School Timetabling".bright_cyan()
    );
}

/// Prints the problem size.
pub fn print_config(lessons: usize, timeslots: usize, rooms: usize) {
    println!(
        "{} {} {} Problem: lessons ({}), timeslots ({}), rooms ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        lessons.to_formatted_string(&Locale::en).bright_yellow(),
        timeslots.to_formatted_string(&Locale::en).bright_yellow(),
        rooms.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints "Solving started" with the problem scale.
pub fn print_solving_started(
    time_spent: Duration,
    best_score: &str,
    entity_count: usize,
    variable_count: usize,
    value_count: usize,
) {
    println!(
        "{} {} {} time spent ({}), best score ({}), random ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        format_duration(time_spent).yellow(),
        format_score(best_score),
        "StdRng".white()
    );

    let scale = calculate_problem_scale(entity_count, value_count);
    println!(
        "{} {} {} entity count ({}), variable count ({}), value count ({}), problem scale ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        entity_count.to_formatted_string(&Locale::en).bright_yellow(),
        variable_count.to_formatted_string(&Locale::en).bright_yellow(),
        value_count.to_formatted_string(&Locale::en).bright_yellow(),
        scale.bright_magenta()
    );
}

fn print_phase_start(phase_name: &str, phase_index: usize) {
    println!(
        "{} {} {} {} phase ({}) started",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase_name).bright_cyan(),
        phase_name.white().bold(),
        phase_index.to_string().yellow()
    );
}

fn print_phase_end(
    phase_name: &str,
    phase_index: usize,
    duration: Duration,
    steps_accepted: u64,
    moves_evaluated: u64,
    best_score: &str,
) {
    let moves_per_sec = per_second(moves_evaluated, duration);
    let acceptance_rate = if moves_evaluated > 0 {
        (steps_accepted as f64 / moves_evaluated as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "{} {} {} {} phase ({}) ended: time spent ({}), best score ({}), move evaluation speed ({}/sec), step total ({}, {:.1}% accepted)",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase_name).bright_cyan(),
        phase_name.white().bold(),
        phase_index.to_string().yellow(),
        format_duration(duration).yellow(),
        format_score(best_score),
        moves_per_sec.to_formatted_string(&Locale::en).bright_magenta().bold(),
        steps_accepted.to_formatted_string(&Locale::en).white(),
        acceptance_rate
    );
}

/// Prints the completion summary box.
pub fn print_solving_ended(
    total_duration: Duration,
    total_moves: u64,
    phase_count: usize,
    final_score: &str,
    is_feasible: bool,
) {
    let moves_per_sec = per_second(total_moves, total_duration);

    println!(
        "{} {} {} Solving ended: time spent ({}), best score ({}), move evaluation speed ({}/sec), phase total ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        format_duration(total_duration).yellow(),
        format_score(final_score),
        moves_per_sec.to_formatted_string(&Locale::en).bright_magenta().bold(),
        phase_count.to_string().white()
    );

    // 60 chars wide, 56 char content area
    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let status_text = if is_feasible {
        "✓ FEASIBLE TIMETABLE FOUND"
    } else {
        "✗ INFEASIBLE (hard constraints violated)"
    };
    let status_colored = if is_feasible {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56 - status_text.chars().count();
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());

    let rows = [
        ("Final Score:", final_score.to_string()),
        ("Solving Time:", format!("{:.2}s", total_duration.as_secs_f64())),
        (
            "Move Speed:",
            format!("{}/sec", moves_per_sec.to_formatted_string(&Locale::en)),
        ),
    ];
    for (label, value) in rows {
        println!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        );
    }

    println!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

fn per_second(count: u64, duration: Duration) -> u64 {
    if duration.as_secs_f64() > 0.0 {
        (count as f64 / duration.as_secs_f64()) as u64
    } else {
        0
    }
}

/// Formats a duration nicely.
fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Colors a `"<h>hard/<s>soft"` score by level sign.
fn format_score(score: &str) -> String {
    let Ok(parsed) = score.parse::<HardSoftScore>() else {
        return score.white().to_string();
    };

    let hard = format!("{}hard", parsed.hard());
    let hard = if parsed.hard() < 0 {
        hard.bright_red().to_string()
    } else {
        hard.bright_green().to_string()
    };

    let soft = format!("{}soft", parsed.soft());
    let soft = match parsed.soft() {
        s if s < 0 => soft.yellow().to_string(),
        s if s > 0 => soft.bright_green().to_string(),
        _ => soft.white().to_string(),
    };

    format!("{}/{}", hard, soft)
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

/// Approximates `value_count ^ entity_count` as mantissa and exponent.
fn calculate_problem_scale(entity_count: usize, value_count: usize) -> String {
    if entity_count == 0 || value_count == 0 {
        return "0".to_string();
    }

    let log_scale = (entity_count as f64) * (value_count as f64).log10();
    let exponent = log_scale.floor() as i32;
    let mantissa = 10f64.powf(log_scale - exponent as f64);

    format!("{:.3} × 10^{}", mantissa, exponent)
}

/// Tracks one solver phase and prints its start and end when enabled.
pub struct PhaseTimer {
    start: Instant,
    phase_name: &'static str,
    phase_index: usize,
    steps_accepted: u64,
    moves_evaluated: u64,
    best_score: String,
    enabled: bool,
}

impl PhaseTimer {
    pub fn start(phase_name: &'static str, phase_index: usize, enabled: bool) -> Self {
        if enabled {
            print_phase_start(phase_name, phase_index);
        }
        Self {
            start: Instant::now(),
            phase_name,
            phase_index,
            steps_accepted: 0,
            moves_evaluated: 0,
            best_score: String::new(),
            enabled,
        }
    }

    pub fn record_accepted(&mut self) {
        self.steps_accepted += 1;
    }

    /// Sets the score reported as the phase's best.
    pub fn record_best(&mut self, score: &impl std::fmt::Display) {
        self.best_score = score.to_string();
    }

    pub fn best_score(&self) -> &str {
        &self.best_score
    }

    pub fn record_move(&mut self) {
        self.moves_evaluated += 1;
    }

    pub fn moves_evaluated(&self) -> u64 {
        self.moves_evaluated
    }

    pub fn steps_accepted(&self) -> u64 {
        self.steps_accepted
    }

    pub fn finish(self) {
        if self.enabled {
            print_phase_end(
                self.phase_name,
                self.phase_index,
                self.start.elapsed(),
                self.steps_accepted,
                self.moves_evaluated,
                &self.best_score,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn problem_scale() {
        assert_eq!(calculate_problem_scale(0, 10), "0");
        assert_eq!(calculate_problem_scale(3, 10), "1.000 × 10^3");
    }

    #[test]
    fn timer_counts_moves_and_steps() {
        let mut timer = PhaseTimer::start("LateAcceptance", 1, false);
        timer.record_move();
        timer.record_move();
        timer.record_accepted();
        assert_eq!(timer.moves_evaluated(), 2);
        assert_eq!(timer.steps_accepted(), 1);
        timer.finish();
    }

    #[test]
    fn timer_reports_best_not_last_accepted() {
        let mut timer = PhaseTimer::start("LateAcceptance", 1, false);
        timer.record_accepted();
        timer.record_best(&HardSoftScore::of_soft(-2));
        // A worse step accepted later leaves the best alone.
        timer.record_accepted();
        assert_eq!(timer.best_score(), "0hard/-2soft");
        assert_eq!(timer.steps_accepted(), 2);
    }
}
