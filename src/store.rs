//! In-memory timetable store.
//!
//! Holds every problem's timeslots, rooms and lessons keyed by id. A load
//! reads all three lists under one read lock; a merge writes under one
//! write lock, so each is a single transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveTime, Weekday};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{Lesson, Room, TimeTable, Timeslot};
use crate::error::{ProblemId, Result, SolveError};
use crate::merge::{apply_decisions, DecisionWriter, MergeReport};
use crate::planning::ValueId;
use crate::snapshot::SolutionRepository;

#[derive(Debug, Default)]
struct ProblemData {
    timeslots: BTreeMap<u64, Timeslot>,
    rooms: BTreeMap<u64, Room>,
    lessons: BTreeMap<u64, Lesson>,
}

impl ProblemData {
    fn sorted_timeslots(&self) -> Vec<Timeslot> {
        let mut timeslots: Vec<Timeslot> = self.timeslots.values().cloned().collect();
        timeslots.sort_by_key(Timeslot::sort_key);
        timeslots
    }

    fn sorted_rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.values().cloned().collect();
        rooms.sort_by_key(Room::sort_key);
        rooms
    }

    fn sorted_lessons(&self) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self.lessons.values().cloned().collect();
        lessons.sort_by_key(Lesson::sort_key);
        lessons
    }

    fn check_assignment(&self, timeslot_id: Option<u64>, room_id: Option<u64>) -> Result<()> {
        if let Some(id) = timeslot_id.filter(|id| !self.timeslots.contains_key(id)) {
            return Err(SolveError::EntityNotFound { kind: "timeslot", id });
        }
        if let Some(id) = room_id.filter(|id| !self.rooms.contains_key(id)) {
            return Err(SolveError::EntityNotFound { kind: "room", id });
        }
        Ok(())
    }
}

/// Thread-safe store of timetabling problems.
#[derive(Debug)]
pub struct TimeTableStore {
    problems: RwLock<HashMap<ProblemId, ProblemData>>,
    next_id: AtomicU64,
}

impl Default for TimeTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeTableStore {
    pub fn new() -> Self {
        Self {
            problems: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Creates an empty problem unless it already exists.
    pub fn create_problem(&self, problem_id: ProblemId) {
        self.problems.write().entry(problem_id).or_default();
    }

    pub fn contains(&self, problem_id: ProblemId) -> bool {
        self.problems.read().contains_key(&problem_id)
    }

    /// Replaces a problem's contents with `table`, keeping its ids.
    pub fn import(&self, problem_id: ProblemId, table: &TimeTable) {
        let data = ProblemData {
            timeslots: table.timeslots.iter().map(|t| (t.id, t.clone())).collect(),
            rooms: table.rooms.iter().map(|r| (r.id, r.clone())).collect(),
            lessons: table.lessons.iter().map(|l| (l.id, l.clone())).collect(),
        };
        let max_id = data
            .timeslots
            .keys()
            .chain(data.rooms.keys())
            .chain(data.lessons.keys())
            .copied()
            .max()
            .unwrap_or(0);
        self.next_id.fetch_max(max_id + 1, Ordering::Relaxed);

        info!(
            problem_id,
            timeslots = data.timeslots.len(),
            rooms = data.rooms.len(),
            lessons = data.lessons.len(),
            "Problem imported"
        );
        self.problems.write().insert(problem_id, data);
    }

    fn with_problem<T>(&self, problem_id: ProblemId, f: impl FnOnce(&ProblemData) -> T) -> Result<T> {
        let problems = self.problems.read();
        let data = problems.get(&problem_id).ok_or(SolveError::NotFound(problem_id))?;
        Ok(f(data))
    }

    fn with_problem_mut<T>(
        &self,
        problem_id: ProblemId,
        f: impl FnOnce(&mut ProblemData) -> Result<T>,
    ) -> Result<T> {
        let mut problems = self.problems.write();
        let data = problems
            .get_mut(&problem_id)
            .ok_or(SolveError::NotFound(problem_id))?;
        f(data)
    }

    // ------------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------------

    /// Timeslots by day of week, start time, end time, then id.
    pub fn list_timeslots(&self, problem_id: ProblemId) -> Result<Vec<Timeslot>> {
        self.with_problem(problem_id, ProblemData::sorted_timeslots)
    }

    /// Rooms by name, then id.
    pub fn list_rooms(&self, problem_id: ProblemId) -> Result<Vec<Room>> {
        self.with_problem(problem_id, ProblemData::sorted_rooms)
    }

    /// Lessons by subject, teacher, student group, then id.
    pub fn list_lessons(&self, problem_id: ProblemId) -> Result<Vec<Lesson>> {
        self.with_problem(problem_id, ProblemData::sorted_lessons)
    }

    // ------------------------------------------------------------------------
    // Data entry
    // ------------------------------------------------------------------------

    pub fn add_timeslot(
        &self,
        problem_id: ProblemId,
        day_of_week: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Timeslot> {
        self.with_problem_mut(problem_id, |data| {
            let timeslot = Timeslot::new(self.next_id(), day_of_week, start_time, end_time);
            data.timeslots.insert(timeslot.id, timeslot.clone());
            Ok(timeslot)
        })
    }

    pub fn add_room(&self, problem_id: ProblemId, name: &str) -> Result<Room> {
        self.with_problem_mut(problem_id, |data| {
            let room = Room::new(self.next_id(), name.trim());
            data.rooms.insert(room.id, room.clone());
            Ok(room)
        })
    }

    /// Adds an unassigned lesson.
    pub fn add_lesson(
        &self,
        problem_id: ProblemId,
        subject: &str,
        teacher: &str,
        student_group: &str,
    ) -> Result<Lesson> {
        self.with_problem_mut(problem_id, |data| {
            let lesson = Lesson::new(self.next_id(), subject, teacher, student_group);
            data.lessons.insert(lesson.id, lesson.clone());
            Ok(lesson)
        })
    }

    /// Sets a lesson's timeslot and room. Both must exist in the same problem.
    pub fn update_lesson(
        &self,
        problem_id: ProblemId,
        lesson_id: u64,
        timeslot_id: Option<u64>,
        room_id: Option<u64>,
    ) -> Result<Lesson> {
        self.with_problem_mut(problem_id, |data| {
            data.check_assignment(timeslot_id, room_id)?;
            let lesson = data.lessons.get_mut(&lesson_id).ok_or(SolveError::EntityNotFound {
                kind: "lesson",
                id: lesson_id,
            })?;
            lesson.timeslot_id = timeslot_id;
            lesson.room_id = room_id;
            Ok(lesson.clone())
        })
    }

    /// Deletes a timeslot and unassigns every lesson that used it.
    pub fn remove_timeslot(&self, problem_id: ProblemId, id: u64) -> Result<()> {
        self.with_problem_mut(problem_id, |data| {
            data.timeslots
                .remove(&id)
                .ok_or(SolveError::EntityNotFound { kind: "timeslot", id })?;
            for lesson in data.lessons.values_mut().filter(|l| l.timeslot_id == Some(id)) {
                lesson.timeslot_id = None;
            }
            debug!(problem_id, timeslot_id = id, "Timeslot removed");
            Ok(())
        })
    }

    /// Deletes a room and unassigns every lesson that used it.
    pub fn remove_room(&self, problem_id: ProblemId, id: u64) -> Result<()> {
        self.with_problem_mut(problem_id, |data| {
            data.rooms
                .remove(&id)
                .ok_or(SolveError::EntityNotFound { kind: "room", id })?;
            for lesson in data.lessons.values_mut().filter(|l| l.room_id == Some(id)) {
                lesson.room_id = None;
            }
            debug!(problem_id, room_id = id, "Room removed");
            Ok(())
        })
    }

    pub fn remove_lesson(&self, problem_id: ProblemId, id: u64) -> Result<()> {
        self.with_problem_mut(problem_id, |data| {
            data.lessons
                .remove(&id)
                .map(|_| ())
                .ok_or(SolveError::EntityNotFound { kind: "lesson", id })
        })
    }
}

/// Decision writer over one problem, valid while the store's write lock is held.
struct StoreTransaction<'a> {
    data: &'a mut ProblemData,
}

impl DecisionWriter for StoreTransaction<'_> {
    fn update_decision_variables(&mut self, entity_id: u64, values: &[Option<ValueId>]) -> Result<()> {
        let &[timeslot_id, room_id] = values else {
            return Err(SolveError::Configuration(format!(
                "expected 2 lesson variables, got {}",
                values.len()
            )));
        };
        self.data.check_assignment(timeslot_id, room_id)?;
        let lesson = self
            .data
            .lessons
            .get_mut(&entity_id)
            .ok_or(SolveError::EntityNotFound {
                kind: "lesson",
                id: entity_id,
            })?;
        lesson.timeslot_id = timeslot_id;
        lesson.room_id = room_id;
        Ok(())
    }
}

impl SolutionRepository<TimeTable> for TimeTableStore {
    fn load(&self, problem_id: ProblemId) -> Result<TimeTable> {
        self.with_problem(problem_id, |data| {
            TimeTable::new(
                data.sorted_timeslots(),
                data.sorted_rooms(),
                data.sorted_lessons(),
            )
        })
    }

    fn save(&self, problem_id: ProblemId, solution: &TimeTable) -> Result<MergeReport> {
        self.with_problem_mut(problem_id, |data| {
            let mut transaction = StoreTransaction { data };
            Ok(apply_decisions(solution, &mut transaction))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::define_constraints;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn seeded() -> (TimeTableStore, Vec<u64>) {
        let store = TimeTableStore::new();
        store.create_problem(1);
        let tue = store.add_timeslot(1, Weekday::Tue, at(8, 30), at(9, 30)).unwrap();
        let mon = store.add_timeslot(1, Weekday::Mon, at(9, 30), at(10, 30)).unwrap();
        let b = store.add_room(1, "Room B").unwrap();
        let a = store.add_room(1, "Room A").unwrap();
        let physics = store.add_lesson(1, "Physics", "M. Curie", "9th grade").unwrap();
        let math = store.add_lesson(1, "Math", "A. Turing", "9th grade").unwrap();
        (store, vec![tue.id, mon.id, b.id, a.id, physics.id, math.id])
    }

    #[test]
    fn lists_are_sorted_by_business_keys() {
        let (store, ids) = seeded();
        let timeslots = store.list_timeslots(1).unwrap();
        assert_eq!(timeslots[0].day_of_week, Weekday::Mon);
        let rooms: Vec<String> = store.list_rooms(1).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(rooms, vec!["Room A", "Room B"]);
        let lessons = store.list_lessons(1).unwrap();
        assert_eq!(lessons[0].id, ids[5]);
    }

    #[test]
    fn unknown_problem_is_not_found() {
        let store = TimeTableStore::new();
        assert_eq!(store.load(42).unwrap_err(), SolveError::NotFound(42));
        assert_eq!(store.list_rooms(42).unwrap_err(), SolveError::NotFound(42));
    }

    #[test]
    fn loading_an_unchanged_store_twice_is_identical() {
        let (store, ids) = seeded();
        store.update_lesson(1, ids[4], Some(ids[0]), Some(ids[2])).unwrap();
        store.update_lesson(1, ids[5], Some(ids[0]), Some(ids[2])).unwrap();

        let constraints = define_constraints();
        let first = store.load(1).unwrap();
        let second = store.load(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(constraints.analyze(&first), constraints.analyze(&second));
    }

    #[test]
    fn update_lesson_rejects_unknown_facts() {
        let (store, ids) = seeded();
        let err = store.update_lesson(1, ids[4], Some(999), None).unwrap_err();
        assert_eq!(err, SolveError::EntityNotFound { kind: "timeslot", id: 999 });
        let err = store.update_lesson(1, 999, None, None).unwrap_err();
        assert_eq!(err, SolveError::EntityNotFound { kind: "lesson", id: 999 });
    }

    #[test]
    fn removing_a_room_unassigns_its_lessons() {
        let (store, ids) = seeded();
        store.update_lesson(1, ids[4], Some(ids[0]), Some(ids[2])).unwrap();
        store.remove_room(1, ids[2]).unwrap();

        let lesson = store.list_lessons(1).unwrap().into_iter().find(|l| l.id == ids[4]).unwrap();
        assert_eq!(lesson.timeslot_id, Some(ids[0]));
        assert_eq!(lesson.room_id, None);
        assert!(store.remove_room(1, ids[2]).is_err());
    }

    #[test]
    fn save_applies_the_rest_when_a_lesson_was_deleted() {
        let (store, ids) = seeded();
        let mut solution = store.load(1).unwrap();
        for lesson in &mut solution.lessons {
            lesson.timeslot_id = Some(ids[1]);
            lesson.room_id = Some(ids[3]);
        }

        store.remove_lesson(1, ids[4]).unwrap();
        let report = store.save(1, &solution).unwrap();

        assert_eq!(report.applied, 1);
        assert!(matches!(
            report.skipped[..],
            [SolveError::MergeSkip { entity_id, .. }] if entity_id == ids[4]
        ));
        let math = &store.list_lessons(1).unwrap()[0];
        assert_eq!((math.timeslot_id, math.room_id), (Some(ids[1]), Some(ids[3])));
    }

    #[test]
    fn save_skips_lessons_pointing_at_deleted_facts() {
        let (store, ids) = seeded();
        let mut solution = store.load(1).unwrap();
        solution.lessons[0].timeslot_id = Some(ids[0]);
        solution.lessons[1].timeslot_id = Some(ids[1]);

        store.remove_timeslot(1, ids[0]).unwrap();
        let report = store.save(1, &solution).unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn import_keeps_ids_and_advances_the_sequence() {
        let store = TimeTableStore::new();
        let table = TimeTable::new(
            vec![Timeslot::new(10, Weekday::Fri, at(8, 30), at(9, 30))],
            vec![Room::new(11, "Room A")],
            vec![Lesson::new(12, "Math", "A. Turing", "9th grade")],
        );
        store.import(1, &table);
        assert_eq!(store.load(1).unwrap(), table);
        assert_eq!(store.add_room(1, "Room B").unwrap().id, 13);
    }
}
