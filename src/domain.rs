//! Domain model for the School Timetabling problem.
//!
//! # Overview
//!
//! - [`Timeslot`] and [`Room`]: problem facts, never changed while solving
//! - [`Lesson`]: planning entity with two decision variables, a timeslot and a room
//! - [`TimeTable`]: the planning solution, one immutable snapshot per solve
//!
//! # Design
//!
//! Lessons reference facts by id. A `TimeTable` builds an id index once at
//! construction, so every reference resolves to a fact of the same snapshot.

use chrono::{NaiveTime, Weekday};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::warn;

use crate::planning::{PlanningSolution, ValueRange, ValueId, VariableDescriptor};
use crate::score::HardSoftScore;

/// A time window in the weekly schedule.
#[derive(Clone, Debug)]
pub struct Timeslot {
    pub id: u64,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl PartialEq for Timeslot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Timeslot {}

impl Hash for Timeslot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Timeslot {
    pub fn new(id: u64, day_of_week: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            id,
            day_of_week,
            start_time,
            end_time,
        }
    }

    /// Load order: day of week, start, end, then id.
    pub fn sort_key(&self) -> (u32, NaiveTime, NaiveTime, u64) {
        (
            self.day_of_week.num_days_from_monday(),
            self.start_time,
            self.end_time,
            self.id,
        )
    }
}

/// A room lessons can be held in.
#[derive(Clone, Debug)]
pub struct Room {
    pub id: u64,
    pub name: String,
}

impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Room {}

impl Hash for Room {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Room {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Load order: name, then id.
    pub fn sort_key(&self) -> (String, u64) {
        (self.name.clone(), self.id)
    }
}

/// A lesson that needs a timeslot and a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub id: u64,
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
    /// Id of the assigned [`Timeslot`], `None` while unassigned.
    pub timeslot_id: Option<u64>,
    /// Id of the assigned [`Room`], `None` while unassigned.
    pub room_id: Option<u64>,
}

impl Lesson {
    /// Creates an unassigned lesson.
    pub fn new(
        id: u64,
        subject: impl Into<String>,
        teacher: impl Into<String>,
        student_group: impl Into<String>,
    ) -> Self {
        Self {
            id,
            subject: subject.into().trim().to_string(),
            teacher: teacher.into().trim().to_string(),
            student_group: student_group.into().trim().to_string(),
            timeslot_id: None,
            room_id: None,
        }
    }

    pub fn with_assignment(mut self, timeslot_id: Option<u64>, room_id: Option<u64>) -> Self {
        self.timeslot_id = timeslot_id;
        self.room_id = room_id;
        self
    }

    pub fn is_assigned(&self) -> bool {
        self.timeslot_id.is_some() && self.room_id.is_some()
    }

    /// Load order: subject, teacher, student group, then id.
    pub fn sort_key(&self) -> (String, String, String, u64) {
        (
            self.subject.clone(),
            self.teacher.clone(),
            self.student_group.clone(),
            self.id,
        )
    }
}

impl std::fmt::Display for Lesson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.subject, self.id)
    }
}

/// The school timetabling solution.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeTable {
    pub timeslots: Vec<Timeslot>,
    pub rooms: Vec<Room>,
    pub lessons: Vec<Lesson>,
    pub score: Option<HardSoftScore>,
    timeslot_index: HashMap<u64, usize>,
    room_index: HashMap<u64, usize>,
}

impl TimeTable {
    /// Builds a snapshot from already-sorted collections.
    ///
    /// A lesson pointing at a timeslot or room that is not part of this
    /// snapshot is loaded with that variable unset.
    pub fn new(timeslots: Vec<Timeslot>, rooms: Vec<Room>, mut lessons: Vec<Lesson>) -> Self {
        let timeslot_index: HashMap<u64, usize> =
            timeslots.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let room_index: HashMap<u64, usize> =
            rooms.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

        for lesson in &mut lessons {
            if let Some(id) = lesson.timeslot_id.filter(|id| !timeslot_index.contains_key(id)) {
                warn!(lesson_id = lesson.id, timeslot_id = id, "Dangling timeslot reference, unassigning");
                lesson.timeslot_id = None;
            }
            if let Some(id) = lesson.room_id.filter(|id| !room_index.contains_key(id)) {
                warn!(lesson_id = lesson.id, room_id = id, "Dangling room reference, unassigning");
                lesson.room_id = None;
            }
        }

        Self {
            timeslots,
            rooms,
            lessons,
            score: None,
            timeslot_index,
            room_index,
        }
    }

    pub fn timeslot(&self, id: u64) -> Option<&Timeslot> {
        self.timeslot_index.get(&id).map(|&i| &self.timeslots[i])
    }

    pub fn room(&self, id: u64) -> Option<&Room> {
        self.room_index.get(&id).map(|&i| &self.rooms[i])
    }

    /// The timeslot assigned to `lesson`, resolved in this snapshot.
    pub fn timeslot_of(&self, lesson: &Lesson) -> Option<&Timeslot> {
        lesson.timeslot_id.and_then(|id| self.timeslot(id))
    }

    /// The room assigned to `lesson`, resolved in this snapshot.
    pub fn room_of(&self, lesson: &Lesson) -> Option<&Room> {
        lesson.room_id.and_then(|id| self.room(id))
    }

    pub fn lesson(&self, id: u64) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }
}

static LESSON_VARIABLES: [VariableDescriptor<TimeTable>; 2] = [
    VariableDescriptor {
        name: "timeslot",
        get: |t, i| t.lessons[i].timeslot_id,
        set: |t, i, v| t.lessons[i].timeslot_id = v,
        value_range: ValueRange::Static(timeslot_range),
    },
    VariableDescriptor {
        name: "room",
        get: |t, i| t.lessons[i].room_id,
        set: |t, i, v| t.lessons[i].room_id = v,
        value_range: ValueRange::Static(room_range),
    },
];

fn timeslot_range(table: &TimeTable) -> Vec<ValueId> {
    table.timeslots.iter().map(|t| t.id).collect()
}

fn room_range(table: &TimeTable) -> Vec<ValueId> {
    table.rooms.iter().map(|r| r.id).collect()
}

impl PlanningSolution for TimeTable {
    type Score = HardSoftScore;

    fn variables() -> &'static [VariableDescriptor<Self>] {
        &LESSON_VARIABLES
    }

    fn entity_count(&self) -> usize {
        self.lessons.len()
    }

    fn entity_id(&self, entity: usize) -> u64 {
        self.lessons[entity].id
    }

    fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    fn set_score(&mut self, score: Option<HardSoftScore>) {
        self.score = score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn table() -> TimeTable {
        TimeTable::new(
            vec![Timeslot::new(1, Weekday::Mon, at(8, 30), at(9, 30))],
            vec![Room::new(2, "Room A")],
            vec![
                Lesson::new(3, " Math ", "A. Turing", "9th grade").with_assignment(Some(1), Some(2)),
                Lesson::new(4, "Physics", "M. Curie", "9th grade").with_assignment(Some(99), Some(2)),
            ],
        )
    }

    #[test]
    fn references_resolve_inside_the_snapshot() {
        let table = table();
        let math = &table.lessons[0];
        assert_eq!(math.subject, "Math");
        assert_eq!(table.timeslot_of(math).map(|t| t.id), Some(1));
        assert_eq!(table.room_of(math).map(|r| r.name.as_str()), Some("Room A"));
    }

    #[test]
    fn dangling_references_are_unassigned() {
        let table = table();
        let physics = table.lesson(4).unwrap();
        assert_eq!(physics.timeslot_id, None);
        assert_eq!(physics.room_id, Some(2));
        assert!(!physics.is_assigned());
    }

    #[test]
    fn facts_compare_by_id() {
        let a = Room::new(1, "Room A");
        let renamed = Room::new(1, "Room Z");
        assert_eq!(a, renamed);
        assert_ne!(a, Room::new(2, "Room A"));
    }

    #[test]
    fn variables_read_and_write_lesson_slots() {
        let mut table = table();
        let [timeslot, room] = TimeTable::variables() else {
            panic!("expected two variables");
        };
        assert_eq!((timeslot.get)(&table, 0), Some(1));
        (room.set)(&mut table, 1, None);
        assert_eq!(table.lessons[1].room_id, None);
        assert_eq!(timeslot.value_range.values(&table, 0), vec![1]);
        assert_eq!(table.unassigned().unassigned_count(), 4);
    }
}
