//! Employee model matching the upstream employee list item.

use serde::{Deserialize, Serialize};

/// A teaching employee. Addressable by numeric `id` and by `url_id` slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub url_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default, rename = "academicDepartment")]
    pub academic_department: Option<Vec<String>>,
    #[serde(default)]
    pub fio: Option<String>,
}
