use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{de_instant, TransportError};

/// One row of the remote appointment book, mirrored read-only. The service
/// owns these; the client replaces its whole copy on every refresh.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub service: String,
    #[serde(rename = "start_iso", deserialize_with = "de_instant")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_iso", deserialize_with = "de_instant")]
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetch the full appointment list.
    pub async fn appointments(&self) -> Result<Vec<Appointment>, TransportError> {
        let response = self
            .client
            .get(format!("{}/admin/appointments", self.base_url))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status { status, body });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Cancel one appointment. Only the success indicator matters; the
    /// caller refetches the list rather than trusting any response body.
    pub async fn cancel(&self, id: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(format!("{}/admin/cancel", self.base_url))
            .json(&json!({ "id": id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        Ok(())
    }
}
