//! Schedule models matching the upstream schedule response.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a schedule belongs to. A stored schedule is keyed by exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleSubject {
    /// Group number, e.g. "053501"
    ByGroup(String),
    /// Employee url slug, e.g. "i-ivanov"
    ByEmployee(String),
}

impl ScheduleSubject {
    /// Store column holding this subject's key.
    pub fn key_column(&self) -> &'static str {
        match self {
            ScheduleSubject::ByGroup(_) => "group_number",
            ScheduleSubject::ByEmployee(_) => "employee_url_id",
        }
    }

    /// The key as stored: surrounding whitespace is not part of it.
    pub fn key(&self) -> &str {
        match self {
            ScheduleSubject::ByGroup(key) | ScheduleSubject::ByEmployee(key) => key.trim(),
        }
    }
}

impl fmt::Display for ScheduleSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleSubject::ByGroup(_) => write!(f, "group {}", self.key()),
            ScheduleSubject::ByEmployee(_) => write!(f, "employee {}", self.key()),
        }
    }
}

/// Full schedule payload for a group or an employee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub employee_dto: Option<EmployeeDto>,
    #[serde(default)]
    pub student_group_dto: Option<StudentGroupDto>,
    /// Weekly lessons keyed by weekday name
    #[serde(default)]
    pub schedules: Option<BTreeMap<String, Vec<Lesson>>>,
    #[serde(default)]
    pub exams: Option<Vec<Lesson>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub start_exams_date: Option<String>,
    #[serde(default)]
    pub end_exams_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(default)]
    pub week_number: Option<Vec<i32>>,
    #[serde(default)]
    pub student_groups: Option<Vec<LessonGroup>>,
    #[serde(default)]
    pub num_subgroup: Option<i32>,
    #[serde(default)]
    pub auditories: Option<Vec<String>>,
    #[serde(default)]
    pub start_lesson_time: Option<String>,
    #[serde(default)]
    pub end_lesson_time: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub subject_full_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub lesson_type_abbrev: Option<String>,
    #[serde(default)]
    pub date_lesson: Option<String>,
    #[serde(default)]
    pub start_lesson_date: Option<String>,
    #[serde(default)]
    pub end_lesson_date: Option<String>,
    #[serde(default)]
    pub announcement: Option<bool>,
    #[serde(default)]
    pub split: Option<bool>,
    #[serde(default)]
    pub employees: Option<Vec<EmployeeDto>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonGroup {
    #[serde(default)]
    pub speciality_name: Option<String>,
    #[serde(default)]
    pub speciality_code: Option<String>,
    #[serde(default)]
    pub number_of_students: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub education_degree: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub url_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub degree_abbrev: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub job_positions: Option<Vec<String>>,
    #[serde(default)]
    pub fio: Option<String>,
    #[serde(default, rename = "academicDepartment")]
    pub academic_department: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGroupDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub faculty_id: Option<i64>,
    #[serde(default)]
    pub faculty_abbrev: Option<String>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub speciality_department_education_form_id: Option<i64>,
    #[serde(default)]
    pub speciality_name: Option<String>,
    #[serde(default)]
    pub speciality_abbrev: Option<String>,
    #[serde(default)]
    pub course: Option<i32>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub education_degree: Option<i32>,
}

/// Upstream "last update date" lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdate {
    #[serde(default)]
    pub last_update_date: Option<String>,
}

/// A schedule as handed to the store: two nullable keys plus the payload.
///
/// Built from a [`ScheduleSubject`] on the write path; rows read back from the
/// store arrive in this shape too, so the key pair is re-validated before use.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRecord {
    pub group_number: Option<String>,
    pub employee_url_id: Option<String>,
    pub data: Schedule,
}

impl ScheduleRecord {
    pub fn new(subject: &ScheduleSubject, data: Schedule) -> Self {
        let (group_number, employee_url_id) = match subject {
            ScheduleSubject::ByGroup(_) => (Some(subject.key().to_string()), None),
            ScheduleSubject::ByEmployee(_) => (None, Some(subject.key().to_string())),
        };
        Self {
            group_number,
            employee_url_id,
            data,
        }
    }
}
