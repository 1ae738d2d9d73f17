//! Entity normalizer.
//!
//! Pure functions that recover canonical identities from loosely-typed stored
//! documents and pick the store key for schedule writes. Older writers stored
//! some identity fields as one-element arrays (`["…"]` instead of `"…"`); every
//! read path goes through here so the rest of the crate only sees scalars.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{FavoriteGroup, ScheduleRecord, ScheduleSubject};

/// A canonical identity type recoverable from a scalar JSON value.
pub trait Identity: Sized {
    fn from_scalar(value: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

impl Identity for Uuid {
    fn from_scalar(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Identity for i64 {
    fn from_scalar(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

/// Recover an identity from a raw value.
///
/// Array forms are unwrapped to their first element. An empty array, `null`,
/// or any shape `T` cannot parse yields `None` instead of an error.
pub fn reconcile_identity<T: Identity>(raw: &Value) -> Option<T> {
    match raw {
        Value::Array(items) => {
            let first = items.first()?;
            tracing::debug!("Unwrapped array-encoded identity ({} element(s))", items.len());
            T::from_scalar(first)
        }
        scalar => T::from_scalar(scalar),
    }
}

/// Interpret a stored text column that may hold either a bare value or JSON.
///
/// `["a1b2…"]` and `42` come back as JSON; anything that is not valid JSON is
/// taken as a plain string.
pub fn decode_stored_value(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => Value::String(text.to_string()),
    }
}

/// Rewrite `field` of a JSON object in canonical scalar form.
///
/// When the field cannot be recovered it is replaced by `fallback`, or
/// removed if there is none. Non-object documents are left untouched.
pub fn repair_identity_field<T: Identity>(doc: &mut Value, field: &str, fallback: Option<T>) {
    let Some(object) = doc.as_object_mut() else {
        return;
    };

    let repaired = object
        .get(field)
        .and_then(reconcile_identity::<T>)
        .or(fallback);

    match repaired {
        Some(id) => {
            object.insert(field.to_string(), id.to_value());
        }
        None => {
            object.remove(field);
        }
    }
}

/// Build a favorite from a raw stored document.
///
/// Identity is looked up under `_id` then `id`. Missing or malformed
/// timestamps decode as the Unix epoch. Returns `None` only when the
/// `(user_id, group_number)` pair itself is missing.
pub fn reconcile_favorite(raw: &Map<String, Value>) -> Option<FavoriteGroup> {
    let id = raw
        .get("_id")
        .or_else(|| raw.get("id"))
        .and_then(reconcile_identity::<Uuid>);

    let group_number = raw.get("group_number")?.as_str()?.to_string();
    let user_id = raw.get("user_id")?.as_str()?.to_string();

    Some(FavoriteGroup {
        id,
        group_number,
        user_id,
        created_at: timestamp(raw.get("created_at")),
        updated_at: timestamp(raw.get("updated_at")),
    })
}

fn timestamp(value: Option<&Value>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Select the store key a schedule record is matched on.
///
/// Exactly one of group number and employee url slug must be non-empty.
pub fn select_schedule_filter(record: &ScheduleRecord) -> Result<ScheduleSubject, AppError> {
    let group_number = non_empty(record.group_number.as_deref());
    let employee_url_id = non_empty(record.employee_url_id.as_deref());

    match (group_number, employee_url_id) {
        (Some(number), None) => Ok(ScheduleSubject::ByGroup(number.to_string())),
        (None, Some(url_id)) => Ok(ScheduleSubject::ByEmployee(url_id.to_string())),
        (Some(number), Some(url_id)) => Err(AppError::InvalidRecord(format!(
            "Schedule record has both group number {} and employee {}",
            number, url_id
        ))),
        (None, None) => Err(AppError::InvalidRecord(
            "Schedule record has neither a group number nor an employee url id".to_string(),
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
