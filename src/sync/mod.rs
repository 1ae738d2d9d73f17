//! Sync engine: cache-aside reads and forced refreshes for upstream data.
//!
//! There is no TTL. A non-empty cache is served as-is until an explicit
//! refresh, and an empty or unreadable cache triggers a full upstream fetch
//! that is written through item by item.

mod employees;
mod groups;
mod schedules;

pub use employees::*;
pub use groups::*;
pub use schedules::*;

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::errors::AppError;
    use crate::models::{Employee, Group, LastUpdate, Schedule, StudentGroupDto};
    use crate::upstream::ScheduleSource;

    pub fn group(id: i64, name: &str, course: i32) -> Group {
        Group {
            id,
            name: name.to_string(),
            faculty_id: Some(20017),
            faculty_name: Some("FKSiS".to_string()),
            speciality_department_education_form_id: None,
            speciality_name: Some("Computer engineering".to_string()),
            course: Some(course),
            calendar_id: None,
        }
    }

    pub fn employee(id: i64, url_id: &str, degree: &str) -> Employee {
        Employee {
            id,
            url_id: url_id.to_string(),
            first_name: Some("Ivan".to_string()),
            last_name: Some("Ivanov".to_string()),
            middle_name: Some("Ivanovich".to_string()),
            degree: Some(degree.to_string()),
            rank: None,
            photo_link: None,
            calendar_id: None,
            academic_department: Some(vec!["EVM".to_string()]),
            fio: Some("Ivanov I. I.".to_string()),
        }
    }

    /// Upstream stand-in that counts calls and can be switched to failing.
    pub struct StubSource {
        pub groups: Mutex<Vec<Group>>,
        pub employees: Mutex<Vec<Employee>>,
        /// `startDate` stamped on every schedule served
        pub schedule_start: Mutex<String>,
        pub failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl StubSource {
        pub fn new(groups: Vec<Group>, employees: Vec<Employee>) -> Arc<Self> {
            Arc::new(Self {
                groups: Mutex::new(groups),
                employees: Mutex::new(employees),
                schedule_start: Mutex::new("01.09.2024".to_string()),
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn record_call(&self) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::UpstreamUnavailable("stub is failing".to_string()));
            }
            Ok(())
        }

        fn schedule(&self, group_number: Option<&str>) -> Schedule {
            Schedule {
                start_date: Some(self.schedule_start.lock().unwrap().clone()),
                student_group_dto: group_number.map(|name| StudentGroupDto {
                    name: Some(name.to_string()),
                    ..StudentGroupDto::default()
                }),
                ..Schedule::default()
            }
        }
    }

    #[async_trait]
    impl ScheduleSource for StubSource {
        async fn fetch_groups(&self) -> Result<Vec<Group>, AppError> {
            self.record_call()?;
            Ok(self.groups.lock().unwrap().clone())
        }

        async fn fetch_employees(&self) -> Result<Vec<Employee>, AppError> {
            self.record_call()?;
            Ok(self.employees.lock().unwrap().clone())
        }

        async fn fetch_group_schedule(&self, group_number: &str) -> Result<Schedule, AppError> {
            self.record_call()?;
            Ok(self.schedule(Some(group_number)))
        }

        async fn fetch_employee_schedule(&self, _url_id: &str) -> Result<Schedule, AppError> {
            self.record_call()?;
            Ok(self.schedule(None))
        }

        async fn group_last_update(&self, _group_number: &str) -> Result<LastUpdate, AppError> {
            self.record_call()?;
            Ok(LastUpdate {
                last_update_date: Some("30.08.2024".to_string()),
            })
        }

        async fn employee_last_update(&self, _url_id: &str) -> Result<LastUpdate, AppError> {
            self.record_call()?;
            Ok(LastUpdate {
                last_update_date: Some("29.08.2024".to_string()),
            })
        }
    }
}
