//! Upstream schedule API client.
//!
//! The sync engine only sees [`ScheduleSource`]; [`BsuirClient`] is the HTTP
//! implementation used in production.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::{Employee, Group, LastUpdate, Schedule};

/// Read-only source of groups, employees and schedules.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_groups(&self) -> Result<Vec<Group>, AppError>;

    async fn fetch_employees(&self) -> Result<Vec<Employee>, AppError>;

    async fn fetch_group_schedule(&self, group_number: &str) -> Result<Schedule, AppError>;

    async fn fetch_employee_schedule(&self, url_id: &str) -> Result<Schedule, AppError>;

    async fn group_last_update(&self, group_number: &str) -> Result<LastUpdate, AppError>;

    async fn employee_last_update(&self, url_id: &str) -> Result<LastUpdate, AppError>;
}

/// HTTP client for the BSUIR IIS API.
pub struct BsuirClient {
    client: Client,
    base_url: Url,
}

impl BsuirClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url).map_err(|e| {
            AppError::UpstreamUnavailable(format!("Invalid upstream URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::UpstreamUnavailable(format!(
                "Upstream URL {} cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// The base URL extended by `segments`, each percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::UpstreamUnavailable(format!(
                    "Upstream URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {} {:?}", url, query);

        let response = self.client.get(url.clone()).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Upstream returned {} for {}", status, url);
            return Err(AppError::UpstreamUnavailable(format!(
                "Upstream returned {} for {}",
                status,
                url.path()
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ScheduleSource for BsuirClient {
    async fn fetch_groups(&self) -> Result<Vec<Group>, AppError> {
        self.get_json(&["student-groups"], &[]).await
    }

    async fn fetch_employees(&self) -> Result<Vec<Employee>, AppError> {
        self.get_json(&["employees", "all"], &[]).await
    }

    async fn fetch_group_schedule(&self, group_number: &str) -> Result<Schedule, AppError> {
        self.get_json(&["schedule"], &[("studentGroup", group_number)])
            .await
    }

    async fn fetch_employee_schedule(&self, url_id: &str) -> Result<Schedule, AppError> {
        self.get_json(&["employees", "schedule", url_id], &[])
            .await
    }

    async fn group_last_update(&self, group_number: &str) -> Result<LastUpdate, AppError> {
        self.get_json(
            &["last-update-date", "student-group"],
            &[("groupNumber", group_number)],
        )
        .await
    }

    async fn employee_last_update(&self, url_id: &str) -> Result<LastUpdate, AppError> {
        self.get_json(&["last-update-date", "employee"], &[("url-id", url_id)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        // Nothing listens on the discard port
        let client = BsuirClient::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();

        let err = client.fetch_groups().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_path_keys_are_encoded_as_one_segment() {
        let client =
            BsuirClient::new("https://iis.example/api/v1/", Duration::from_secs(2)).unwrap();

        let url = client
            .endpoint(&["employees", "schedule", "a/b?c#d"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://iis.example/api/v1/employees/schedule/a%2Fb%3Fc%23d"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client.endpoint(&["student-groups"]).unwrap();
        assert_eq!(url.as_str(), "https://iis.example/api/v1/student-groups");
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let client =
            BsuirClient::new("https://iis.example/api/v1", Duration::from_secs(2)).unwrap();
        let url = client.endpoint(&["employees", "all"]).unwrap();
        assert_eq!(url.as_str(), "https://iis.example/api/v1/employees/all");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(BsuirClient::new("not a url", Duration::from_secs(2)).is_err());
        assert!(BsuirClient::new("mailto:iis@example", Duration::from_secs(2)).is_err());
    }
}
