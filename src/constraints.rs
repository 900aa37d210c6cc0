//! Constraints for School Timetabling.
//!
//! Every constraint is a plain function from a [`TimeTable`] to its matches,
//! registered in a fixed order. A lesson only takes part in any constraint
//! once both its timeslot and its room are assigned.

use crate::constraint::{ordered_pairs, unique_pairs, Constraint, ConstraintSet, Match};
use crate::domain::{Lesson, TimeTable};
use crate::score::HardSoftScore;

/// Largest gap between two lessons, in seconds, that still counts as back to back.
const MAX_GAP_SECONDS: i64 = 30 * 60;

/// Creates the timetabling constraint table.
pub fn define_constraints() -> ConstraintSet<TimeTable> {
    ConstraintSet::new(vec![
        Constraint::penalize("Room conflict", HardSoftScore::ONE_HARD, room_conflict),
        Constraint::penalize("Teacher conflict", HardSoftScore::ONE_HARD, teacher_conflict),
        Constraint::penalize(
            "Student group conflict",
            HardSoftScore::ONE_HARD,
            student_group_conflict,
        ),
        Constraint::penalize(
            "Teacher room stability",
            HardSoftScore::ONE_SOFT,
            teacher_room_stability,
        ),
        Constraint::reward(
            "Teacher time efficiency",
            HardSoftScore::ONE_SOFT,
            teacher_time_efficiency,
        ),
        Constraint::penalize(
            "Student group subject variety",
            HardSoftScore::ONE_SOFT,
            student_group_subject_variety,
        ),
    ])
}

// ============================================================================
// HARD: a room, a teacher or a student group can be in one lesson at a time
// ============================================================================

fn room_conflict(table: &TimeTable) -> Vec<Match> {
    to_matches(unique_pairs(&table.lessons, |l| {
        assigned(l, |l| Some((l.timeslot_id?, l.room_id?)))
    }))
}

fn teacher_conflict(table: &TimeTable) -> Vec<Match> {
    to_matches(unique_pairs(&table.lessons, |l| {
        assigned(l, |l| Some((l.timeslot_id?, l.teacher.as_str())))
    }))
}

fn student_group_conflict(table: &TimeTable) -> Vec<Match> {
    to_matches(unique_pairs(&table.lessons, |l| {
        assigned(l, |l| Some((l.timeslot_id?, l.student_group.as_str())))
    }))
}

// ============================================================================
// SOFT: teacher preferences and student variety
// ============================================================================

fn teacher_room_stability(table: &TimeTable) -> Vec<Match> {
    let pairs = unique_pairs(&table.lessons, |l| {
        assigned(l, |l| Some(l.teacher.as_str()))
    });
    to_matches(
        pairs
            .into_iter()
            .filter(|(a, b)| a.room_id != b.room_id)
            .collect(),
    )
}

fn teacher_time_efficiency(table: &TimeTable) -> Vec<Match> {
    let pairs = ordered_pairs(&table.lessons, |l| {
        assigned(l, |l| Some((l.teacher.as_str(), table.timeslot_of(l)?.day_of_week)))
    });
    to_matches(
        pairs
            .into_iter()
            .filter(|(first, second)| back_to_back(table, first, second))
            .collect(),
    )
}

fn student_group_subject_variety(table: &TimeTable) -> Vec<Match> {
    let pairs = ordered_pairs(&table.lessons, |l| {
        assigned(l, |l| {
            Some((
                l.subject.as_str(),
                l.student_group.as_str(),
                table.timeslot_of(l)?.day_of_week,
            ))
        })
    });
    to_matches(
        pairs
            .into_iter()
            .filter(|(first, second)| back_to_back(table, first, second))
            .collect(),
    )
}

// ============================================================================
// Helper functions
// ============================================================================

/// Join key of a fully assigned lesson; `None` for any other lesson.
fn assigned<'a, K>(lesson: &'a Lesson, key: impl FnOnce(&'a Lesson) -> Option<K>) -> Option<K> {
    if lesson.is_assigned() {
        key(lesson)
    } else {
        None
    }
}

fn to_matches(pairs: Vec<(&Lesson, &Lesson)>) -> Vec<Match> {
    pairs
        .into_iter()
        .map(|(a, b)| Match::pair(a.id, b.id))
        .collect()
}

/// True when `second` starts no earlier than `first` ends, and at most
/// [`MAX_GAP_SECONDS`] later.
#[inline]
fn back_to_back(table: &TimeTable, first: &Lesson, second: &Lesson) -> bool {
    match (table.timeslot_of(first), table.timeslot_of(second)) {
        (Some(a), Some(b)) => {
            let gap = (b.start_time - a.end_time).num_seconds();
            (0..=MAX_GAP_SECONDS).contains(&gap)
        }
        _ => false,
    }
}
