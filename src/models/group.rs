//! Student group model matching the upstream group list item.

use serde::{Deserialize, Serialize};

/// A student group as listed by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    /// Group number, e.g. "053501"
    pub name: String,
    #[serde(default)]
    pub faculty_id: Option<i64>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub speciality_department_education_form_id: Option<i64>,
    #[serde(default)]
    pub speciality_name: Option<String>,
    #[serde(default)]
    pub course: Option<i32>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}
