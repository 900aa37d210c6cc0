//! Default engine: first-fit construction followed by Late Acceptance local
//! search over change and swap moves.
//!
//! Works on any [`PlanningSolution`] through its variable descriptors, and
//! scores every candidate with the full constraint table.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::console::{self, PhaseTimer};
use crate::constraint::ConstraintSet;
use crate::engine::{Engine, SolutionListener};
use crate::error::Result;
use crate::planning::{PlanningSolution, ValueId};
use crate::score::Score;

/// Default solving time: 30 seconds.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 30;

/// Late acceptance history size.
pub const LATE_ACCEPTANCE_SIZE: usize = 400;

/// Engine configuration with termination criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Stop after this duration.
    pub time_limit: Option<Duration>,
    /// Stop when the best score has not improved for this long.
    pub unimproved_time_limit: Option<Duration>,
    /// Stop after this many local search steps.
    pub step_limit: Option<u64>,
    pub late_acceptance_size: usize,
    /// Fixed seed for reproducible runs; entropy when unset.
    pub random_seed: Option<u64>,
    /// Print phase progress to stdout.
    pub console: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(DEFAULT_TIME_LIMIT_SECS)),
            unimproved_time_limit: None,
            step_limit: None,
            late_acceptance_size: LATE_ACCEPTANCE_SIZE,
            random_seed: None,
            console: false,
        }
    }
}

/// Construction heuristic plus Late Acceptance.
#[derive(Debug, Clone, Default)]
pub struct LocalSearchEngine {
    config: SolverConfig,
}

impl LocalSearchEngine {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn terminated(&self, cancel: &CancellationToken, started: Instant, last_improvement: Instant, step: u64) -> bool {
        cancel.is_cancelled()
            || self.config.time_limit.is_some_and(|limit| started.elapsed() >= limit)
            || self
                .config
                .unimproved_time_limit
                .is_some_and(|limit| last_improvement.elapsed() >= limit)
            || self.config.step_limit.is_some_and(|limit| step >= limit)
    }
}

/// Candidate values per entity, per variable.
fn value_table<S: PlanningSolution>(solution: &S) -> Vec<Vec<Vec<ValueId>>> {
    (0..solution.entity_count())
        .map(|entity| {
            S::variables()
                .iter()
                .map(|v| v.value_range.values(solution, entity))
                .collect()
        })
        .collect()
}

impl<S: PlanningSolution> Engine<S> for LocalSearchEngine {
    fn solve(
        &self,
        problem: S,
        constraints: &ConstraintSet<S>,
        cancel: &CancellationToken,
        listener: &mut dyn SolutionListener<S>,
    ) -> Result<S> {
        let started = Instant::now();
        let show = self.config.console;
        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut working = problem;
        let values = value_table(&working);
        let variable_count = S::variables().len();

        // Phase 0: first-fit construction of unset variables
        let mut ch_timer = PhaseTimer::start("ConstructionHeuristic", 0, show);
        let mut current = construction_heuristic(&mut working, constraints, &values, cancel, &mut ch_timer);
        let construction_moves = ch_timer.moves_evaluated();
        ch_timer.finish();

        if show {
            let value_count = values.iter().flatten().map(Vec::len).max().unwrap_or(0);
            console::print_solving_started(
                started.elapsed(),
                &current.to_string(),
                working.entity_count(),
                working.entity_count() * variable_count,
                value_count,
            );
        }

        working.set_score(Some(current));
        let mut best = working.clone();
        let mut best_score = current;
        let mut total_moves = construction_moves;

        if !listener.best_solution_changed(&best, best_score) {
            return Ok(best);
        }

        if working.entity_count() == 0 || variable_count == 0 {
            info!("Nothing to optimize");
            return Ok(best);
        }

        // Phase 1: Late Acceptance
        let mut ls_timer = PhaseTimer::start("LateAcceptance", 1, show);
        ls_timer.record_best(&best_score);
        let mut history = vec![current; self.config.late_acceptance_size.max(1)];
        let mut last_improvement = Instant::now();
        let mut step: u64 = 0;

        while !self.terminated(cancel, started, last_improvement, step) {
            let Some(undo) = random_move(&mut working, &values, &mut rng) else {
                break;
            };
            ls_timer.record_move();
            let score = constraints.score(&working);
            let late = history[(step as usize) % history.len()];

            if score >= current || score >= late {
                current = score;
                ls_timer.record_accepted();
                if score > best_score {
                    working.set_score(Some(score));
                    best = working.clone();
                    best_score = score;
                    last_improvement = Instant::now();
                    ls_timer.record_best(&score);
                    debug!(step, score = %score, "New best solution");
                    if !listener.best_solution_changed(&best, best_score) {
                        break;
                    }
                }
            } else {
                undo.revert(&mut working);
            }

            let slot = (step as usize) % history.len();
            history[slot] = current;
            step += 1;
        }

        total_moves += ls_timer.moves_evaluated();
        ls_timer.finish();

        let duration = started.elapsed();
        info!(
            duration_secs = duration.as_secs_f64(),
            steps = step,
            score = %best_score,
            feasible = best_score.is_feasible(),
            "Solving complete"
        );
        if show {
            console::print_solving_ended(
                duration,
                total_moves,
                2,
                &best_score.to_string(),
                best_score.is_feasible(),
            );
        }

        Ok(best)
    }
}

/// Places one entity at a time: every combination of values for its unset
/// variables is tried, and the first combination with the best score is kept.
///
/// Stops early when cancelled, leaving the remaining variables unset.
fn construction_heuristic<S: PlanningSolution>(
    solution: &mut S,
    constraints: &ConstraintSet<S>,
    values: &[Vec<Vec<ValueId>>],
    cancel: &CancellationToken,
    timer: &mut PhaseTimer,
) -> S::Score {
    let variables = S::variables();
    for (entity, ranges) in values.iter().enumerate() {
        let unset: Vec<usize> = (0..variables.len())
            .filter(|&v| (variables[v].get)(solution, entity).is_none())
            .collect();
        if unset.is_empty() || unset.iter().any(|&v| ranges[v].is_empty()) {
            continue;
        }
        if cancel.is_cancelled() {
            break;
        }

        let mut cursor = vec![0usize; unset.len()];
        let mut chosen: Option<(Vec<usize>, S::Score)> = None;
        loop {
            for (&v, &c) in unset.iter().zip(&cursor) {
                (variables[v].set)(solution, entity, Some(ranges[v][c]));
            }
            timer.record_move();
            let score = constraints.score(solution);
            if chosen.as_ref().map_or(true, |(_, best)| score > *best) {
                chosen = Some((cursor.clone(), score));
            }
            if !advance(&mut cursor, |k| ranges[unset[k]].len()) {
                break;
            }
        }

        if let Some((picked, _)) = chosen {
            for (&v, &c) in unset.iter().zip(&picked) {
                (variables[v].set)(solution, entity, Some(ranges[v][c]));
            }
            timer.record_accepted();
        }
    }
    let score = constraints.score(solution);
    timer.record_best(&score);
    score
}

/// Steps a mixed-radix counter; false once every combination was visited.
fn advance(cursor: &mut [usize], len: impl Fn(usize) -> usize) -> bool {
    for k in 0..cursor.len() {
        cursor[k] += 1;
        if cursor[k] < len(k) {
            return true;
        }
        cursor[k] = 0;
    }
    false
}

/// Enough state to take back one move.
enum Undo {
    Change {
        entity: usize,
        variable: usize,
        old: Option<ValueId>,
    },
    Swap {
        left: usize,
        right: usize,
    },
}

impl Undo {
    fn revert<S: PlanningSolution>(self, solution: &mut S) {
        match self {
            Undo::Change { entity, variable, old } => {
                (S::variables()[variable].set)(solution, entity, old);
            }
            Undo::Swap { left, right } => swap_entities(solution, left, right),
        }
    }
}

fn swap_entities<S: PlanningSolution>(solution: &mut S, left: usize, right: usize) {
    for variable in S::variables() {
        let l = (variable.get)(solution, left);
        let r = (variable.get)(solution, right);
        (variable.set)(solution, left, r);
        (variable.set)(solution, right, l);
    }
}

/// Applies a random change or swap move and returns how to undo it.
fn random_move<S: PlanningSolution>(
    solution: &mut S,
    values: &[Vec<Vec<ValueId>>],
    rng: &mut StdRng,
) -> Option<Undo> {
    let entity_count = values.len();
    let variables = S::variables();
    if entity_count == 0 || variables.is_empty() {
        return None;
    }

    if entity_count >= 2 && rng.gen_bool(0.5) {
        let left = rng.gen_range(0..entity_count);
        let right = rng.gen_range(0..entity_count);
        let swappable = left != right
            && variables.iter().enumerate().all(|(v, variable)| {
                let fits = |value: Option<ValueId>, entity: usize| {
                    value.map_or(true, |value| values[entity][v].contains(&value))
                };
                fits((variable.get)(solution, left), right) && fits((variable.get)(solution, right), left)
            });
        if swappable {
            swap_entities(solution, left, right);
            return Some(Undo::Swap { left, right });
        }
    }

    let entity = rng.gen_range(0..entity_count);
    let variable = rng.gen_range(0..variables.len());
    let range = &values[entity][variable];
    if range.is_empty() {
        return Some(Undo::Change {
            entity,
            variable,
            old: (variables[variable].get)(solution, entity),
        });
    }
    let old = (variables[variable].get)(solution, entity);
    let value = range[rng.gen_range(0..range.len())];
    (variables[variable].set)(solution, entity, Some(value));
    Some(Undo::Change {
        entity,
        variable,
        old,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::define_constraints;
    use crate::domain::{Lesson, Room, TimeTable, Timeslot};
    use crate::score::HardSoftScore;
    use chrono::{NaiveTime, Weekday};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn problem() -> TimeTable {
        TimeTable::new(
            vec![
                Timeslot::new(1, Weekday::Mon, at(8, 30), at(9, 30)),
                Timeslot::new(2, Weekday::Mon, at(9, 30), at(10, 30)),
            ],
            vec![Room::new(3, "Room A"), Room::new(4, "Room B")],
            vec![
                Lesson::new(5, "Math", "A. Turing", "9th grade"),
                Lesson::new(6, "Physics", "A. Turing", "10th grade"),
                Lesson::new(7, "Chemistry", "M. Curie", "11th grade"),
            ],
        )
    }

    fn engine(step_limit: u64) -> LocalSearchEngine {
        LocalSearchEngine::new(SolverConfig {
            time_limit: None,
            step_limit: Some(step_limit),
            random_seed: Some(7),
            ..SolverConfig::default()
        })
    }

    #[test]
    fn solves_a_small_timetable_to_feasibility() {
        let constraints = define_constraints();
        let mut scores = Vec::new();
        let mut listener = |_: &TimeTable, score: HardSoftScore| {
            scores.push(score);
            true
        };

        let solved = engine(500)
            .solve(problem(), &constraints, &CancellationToken::new(), &mut listener)
            .unwrap();

        assert_eq!(solved.unassigned_count(), 0);
        assert!(solved.score.unwrap().is_feasible());
        assert_eq!(solved.score, Some(constraints.score(&solved)));
        assert!(scores.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(scores.last().copied(), solved.score);
    }

    #[test]
    fn same_seed_same_result() {
        let constraints = define_constraints();
        let run = || {
            engine(300)
                .solve(problem(), &constraints, &CancellationToken::new(), &mut |_: &TimeTable, _: HardSoftScore| true)
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cancelled_before_start_returns_without_searching() {
        let constraints = define_constraints();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let engine = LocalSearchEngine::new(SolverConfig {
            time_limit: None,
            ..SolverConfig::default()
        });

        let solved = engine
            .solve(problem(), &constraints, &cancel, &mut |_: &TimeTable, _: HardSoftScore| true)
            .unwrap();
        assert_eq!(solved.unassigned_count(), 6);
    }

    #[test]
    fn listener_can_stop_the_search() {
        let constraints = define_constraints();
        let mut calls = 0;
        let engine = LocalSearchEngine::new(SolverConfig {
            time_limit: None,
            ..SolverConfig::default()
        });

        engine
            .solve(problem(), &constraints, &CancellationToken::new(), &mut |_: &TimeTable, _: HardSoftScore| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn construction_places_timeslot_and_room_together() {
        let constraints = define_constraints();
        let solved = engine(0)
            .solve(problem(), &constraints, &CancellationToken::new(), &mut |_: &TimeTable, _: HardSoftScore| true)
            .unwrap();

        assert_eq!(solved.unassigned_count(), 0);
        assert_eq!(solved.score.unwrap().hard(), 0);
        // Same teacher, next timeslot, same room.
        assert_eq!(solved.lessons[1].timeslot_id, Some(2));
        assert_eq!(solved.lessons[1].room_id, Some(3));
    }

    #[test]
    fn counter_visits_every_combination() {
        let mut cursor = vec![0, 0];
        let mut seen = vec![cursor.clone()];
        while advance(&mut cursor, |k| [2, 3][k]) {
            seen.push(cursor.clone());
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(cursor, vec![0, 0]);
    }

    #[test]
    fn swap_is_its_own_undo() {
        let mut table = problem();
        table.lessons[0].timeslot_id = Some(1);
        table.lessons[1].room_id = Some(4);
        let before = table.clone();

        swap_entities(&mut table, 0, 1);
        assert_eq!(table.lessons[0].room_id, Some(4));
        assert_eq!(table.lessons[1].timeslot_id, Some(1));

        Undo::Swap { left: 0, right: 1 }.revert(&mut table);
        assert_eq!(table, before);
    }
}
