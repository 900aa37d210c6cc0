//! DTOs for REST API requests/responses.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::constraint::ScoreAnalysis;
use crate::domain::{Lesson, Room, TimeTable, Timeslot};
use crate::score::HardSoftScore;
use crate::solver::SolverStatus;

/// Days of the week as `"MONDAY"` .. `"SUNDAY"`.
mod day_of_week {
    use chrono::Weekday;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn name(day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => "MONDAY",
            Weekday::Tue => "TUESDAY",
            Weekday::Wed => "WEDNESDAY",
            Weekday::Thu => "THURSDAY",
            Weekday::Fri => "FRIDAY",
            Weekday::Sat => "SATURDAY",
            Weekday::Sun => "SUNDAY",
        }
    }

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Weekday>()
            .map_err(|_| D::Error::custom(format!("invalid day of week ({s})")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeslotDto {
    pub id: u64,
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl From<&Timeslot> for TimeslotDto {
    fn from(t: &Timeslot) -> Self {
        Self {
            id: t.id,
            day_of_week: t.day_of_week,
            start_time: t.start_time,
            end_time: t.end_time,
        }
    }
}

impl TimeslotDto {
    pub fn to_domain(&self) -> Timeslot {
        Timeslot::new(self.id, self.day_of_week, self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: u64,
    pub name: String,
}

impl From<&Room> for RoomDto {
    fn from(r: &Room) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
        }
    }
}

/// Lesson with its timeslot and room embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDto {
    pub id: u64,
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
    #[serde(default)]
    pub timeslot: Option<TimeslotDto>,
    #[serde(default)]
    pub room: Option<RoomDto>,
}

impl LessonDto {
    pub fn from_lesson(lesson: &Lesson, table: &TimeTable) -> Self {
        Self {
            id: lesson.id,
            subject: lesson.subject.clone(),
            teacher: lesson.teacher.clone(),
            student_group: lesson.student_group.clone(),
            timeslot: table.timeslot_of(lesson).map(TimeslotDto::from),
            room: table.room_of(lesson).map(RoomDto::from),
        }
    }

    pub fn to_domain(&self) -> Lesson {
        Lesson::new(self.id, &self.subject, &self.teacher, &self.student_group).with_assignment(
            self.timeslot.as_ref().map(|t| t.id),
            self.room.as_ref().map(|r| r.id),
        )
    }
}

/// Full timetable for request/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTableDto {
    pub timeslot_list: Vec<TimeslotDto>,
    pub room_list: Vec<RoomDto>,
    pub lesson_list: Vec<LessonDto>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub solver_status: Option<SolverStatus>,
}

impl TimeTableDto {
    pub fn from_table(table: &TimeTable, status: Option<SolverStatus>) -> Self {
        Self {
            timeslot_list: table.timeslots.iter().map(TimeslotDto::from).collect(),
            room_list: table.rooms.iter().map(RoomDto::from).collect(),
            lesson_list: table
                .lessons
                .iter()
                .map(|l| LessonDto::from_lesson(l, table))
                .collect(),
            score: table.score.map(|s| s.to_string()),
            solver_status: status,
        }
    }

    pub fn to_domain(&self) -> TimeTable {
        TimeTable::new(
            self.timeslot_list.iter().map(TimeslotDto::to_domain).collect(),
            self.room_list
                .iter()
                .map(|r| Room::new(r.id, r.name.as_str()))
                .collect(),
            self.lesson_list.iter().map(LessonDto::to_domain).collect(),
        )
    }
}

// ============================================================================
// Data entry
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeslotDto {
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoomDto {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLessonDto {
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
}

/// Assignment of a lesson, by fact id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonAssignmentDto {
    #[serde(default)]
    pub timeslot_id: Option<u64>,
    #[serde(default)]
    pub room_id: Option<u64>,
}

// ============================================================================
// Status and analysis
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub score: Option<String>,
    pub solver_status: SolverStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysisDto {
    pub score: String,
    /// Ids of the lessons involved.
    pub justification: Vec<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintAnalysisDto {
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: &'static str,
    pub weight: String,
    pub score: String,
    pub match_count: usize,
    pub matches: Vec<MatchAnalysisDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub score: String,
    pub constraints: Vec<ConstraintAnalysisDto>,
}

impl From<ScoreAnalysis<HardSoftScore>> for AnalyzeResponse {
    fn from(analysis: ScoreAnalysis<HardSoftScore>) -> Self {
        let constraints = analysis
            .constraints
            .into_iter()
            .map(|c| ConstraintAnalysisDto {
                constraint_type: if c.weight.hard() != 0 { "hard" } else { "soft" },
                name: c.name,
                weight: c.weight.to_string(),
                score: c.score.to_string(),
                match_count: c.match_count,
                matches: c
                    .matches
                    .into_iter()
                    .map(|m| MatchAnalysisDto {
                        score: m.score.to_string(),
                        justification: m.justification,
                    })
                    .collect(),
            })
            .collect();
        Self {
            score: analysis.score.to_string(),
            constraints,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data::{generate, DemoData};

    #[test]
    fn day_of_week_uses_upper_case_names() {
        let dto = TimeslotDto {
            id: 1,
            day_of_week: Weekday::Wed,
            start_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["dayOfWeek"], "WEDNESDAY");
        assert_eq!(json["startTime"], "08:30:00");
        let back: TimeslotDto = serde_json::from_value(json).unwrap();
        assert_eq!(back, dto);
    }

    #[test]
    fn table_conversion_keeps_assignments() {
        let table = generate(DemoData::Small);
        let dto = TimeTableDto::from_table(&table, Some(SolverStatus::NotSolving));

        let first = &dto.lesson_list[0];
        assert_eq!(first.timeslot.as_ref().map(|t| t.id), table.lessons[0].timeslot_id);
        assert_eq!(first.room.as_ref().map(|r| r.name.as_str()), Some("Room A"));
        assert!(dto.lesson_list[1].timeslot.is_none());

        assert_eq!(dto.to_domain(), table);
    }
}
