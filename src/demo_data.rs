//! Demo data generators for School Timetabling.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::{Lesson, Room, TimeTable, Timeslot};
use crate::error::SolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DemoData {
    None,
    #[default]
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(DemoData::None),
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(SolveError::Configuration(format!("unknown demo data set ({s})"))),
        }
    }
}

impl DemoData {
    /// Data sets that actually contain data.
    pub const AVAILABLE: [DemoData; 2] = [DemoData::Small, DemoData::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::None => "NONE",
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn days(&self) -> &'static [Weekday] {
        match self {
            DemoData::None => &[],
            DemoData::Small => &[Weekday::Mon, Weekday::Tue],
            DemoData::Large => &[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    fn room_names(&self) -> &'static [&'static str] {
        match self {
            DemoData::None => &[],
            DemoData::Small => &["Room A", "Room B", "Room C"],
            DemoData::Large => &["Room A", "Room B", "Room C", "Room D", "Room E", "Room F"],
        }
    }
}

/// Daily slots as (start hour, start minute); every slot lasts one hour.
const DAILY_SLOTS: [(u32, u32); 5] = [(8, 30), (9, 30), (10, 30), (13, 30), (14, 30)];

type LessonSpec = (&'static str, &'static str);

const NINTH_GRADE: [LessonSpec; 10] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("Biology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "I. Jones"),
    ("English", "I. Jones"),
    ("Spanish", "P. Cruz"),
    ("Spanish", "P. Cruz"),
];

const NINTH_GRADE_EXTRA: [LessonSpec; 15] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "I. Jones"),
    ("Drama", "I. Jones"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

const TENTH_GRADE: [LessonSpec; 10] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("French", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("Spanish", "P. Cruz"),
];

const TENTH_GRADE_EXTRA: [LessonSpec; 15] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Biology", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("Drama", "I. Jones"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

/// Curriculum shared by the 11th and 12th grade in the large data set.
const UPPER_GRADE: [LessonSpec; 25] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("French", "M. Curie"),
    ("Physics", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("Biology", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("Spanish", "P. Cruz"),
    ("Drama", "P. Cruz"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

fn curriculum(demo: DemoData) -> Vec<(LessonSpec, &'static str)> {
    let mut groups: Vec<(&[LessonSpec], &'static str)> = Vec::new();
    match demo {
        DemoData::None => {}
        DemoData::Small => {
            groups.push((&NINTH_GRADE[..], "9th grade"));
            groups.push((&TENTH_GRADE[..], "10th grade"));
        }
        DemoData::Large => {
            groups.push((&NINTH_GRADE[..], "9th grade"));
            groups.push((&NINTH_GRADE_EXTRA[..], "9th grade"));
            groups.push((&TENTH_GRADE[..], "10th grade"));
            groups.push((&TENTH_GRADE_EXTRA[..], "10th grade"));
            groups.push((&UPPER_GRADE[..], "11th grade"));
            groups.push((&UPPER_GRADE[..], "12th grade"));
        }
    }
    groups
        .into_iter()
        .flat_map(|(specs, group)| specs.iter().map(move |&spec| (spec, group)))
        .collect()
}

/// Generates a demo timetable with ids starting at 1.
///
/// Every lesson is unassigned except the first one, which starts out in the
/// first timeslot and the first room. The solver may still move it.
pub fn generate(demo: DemoData) -> TimeTable {
    let mut last_id = 0u64;
    let mut id = || {
        last_id += 1;
        last_id
    };

    let timeslots: Vec<Timeslot> = demo
        .days()
        .iter()
        .flat_map(|&day| DAILY_SLOTS.iter().map(move |&slot| (day, slot)))
        .filter_map(|(day, (hour, minute))| {
            let start = NaiveTime::from_hms_opt(hour, minute, 0)?;
            let end = NaiveTime::from_hms_opt(hour + 1, minute, 0)?;
            Some((day, start, end))
        })
        .map(|(day, start, end)| Timeslot::new(id(), day, start, end))
        .collect();

    let rooms: Vec<Room> = demo.room_names().iter().map(|&name| Room::new(id(), name)).collect();

    let mut lessons: Vec<Lesson> = curriculum(demo)
        .into_iter()
        .map(|((subject, teacher), group)| Lesson::new(id(), subject, teacher, group))
        .collect();

    if let (Some(lesson), Some(timeslot), Some(room)) =
        (lessons.first_mut(), timeslots.first(), rooms.first())
    {
        lesson.timeslot_id = Some(timeslot.id);
        lesson.room_id = Some(room.id);
    }

    TimeTable::new(timeslots, rooms, lessons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::validate_value_ranges;

    #[test]
    fn test_small_sizes() {
        let table = generate(DemoData::Small);
        assert_eq!(table.timeslots.len(), 10);
        assert_eq!(table.rooms.len(), 3);
        assert_eq!(table.lessons.len(), 20);
        assert!(validate_value_ranges(&table).is_ok());
    }

    #[test]
    fn test_large_sizes() {
        let table = generate(DemoData::Large);
        assert_eq!(table.timeslots.len(), 25);
        assert_eq!(table.rooms.len(), 6);
        assert_eq!(table.lessons.len(), 100);
        for group in ["9th grade", "10th grade", "11th grade", "12th grade"] {
            assert_eq!(
                table.lessons.iter().filter(|l| l.student_group == group).count(),
                25
            );
        }
    }

    #[test]
    fn test_none_is_empty() {
        let table = generate(DemoData::None);
        assert!(table.timeslots.is_empty());
        assert!(table.lessons.is_empty());
    }

    #[test]
    fn test_only_first_lesson_is_pre_assigned() {
        let table = generate(DemoData::Small);
        let first = &table.lessons[0];
        assert_eq!(first.timeslot_id, Some(table.timeslots[0].id));
        assert_eq!(first.room_id, Some(table.rooms[0].id));
        assert!(table.lessons[1..].iter().all(|l| !l.is_assigned()));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("small".parse::<DemoData>().unwrap(), DemoData::Small);
        assert_eq!("LARGE".parse::<DemoData>().unwrap(), DemoData::Large);
        assert_eq!("none".parse::<DemoData>().unwrap(), DemoData::None);
        assert!("huge".parse::<DemoData>().is_err());
        assert_eq!(DemoData::Large.as_str(), "LARGE");
    }
}
