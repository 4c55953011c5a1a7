use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Who submitted an application. Serialized flat as `"professional": <id>`
/// or `"trainee": <id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Applicant {
    Professional(Uuid),
    Trainee(Uuid),
}

impl Applicant {
    /// Builds an applicant from the two optional request fields.
    /// Exactly one must be present.
    pub fn from_parts(professional: Option<Uuid>, trainee: Option<Uuid>) -> Result<Self, AppError> {
        match (professional, trainee) {
            (Some(id), None) => Ok(Applicant::Professional(id)),
            (None, Some(id)) => Ok(Applicant::Trainee(id)),
            _ => Err(AppError::Validation(
                "Provide exactly one of professionalId or traineeId".to_string(),
            )),
        }
    }

    /// Column pair `(professional_id, trainee_id)` as stored.
    pub fn columns(&self) -> (Option<Uuid>, Option<Uuid>) {
        match *self {
            Applicant::Professional(id) => (Some(id), None),
            Applicant::Trainee(id) => (None, Some(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewed" => Ok(ApplicationStatus::Reviewed),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(anyhow::anyhow!("unknown application status '{other}'")),
        }
    }
}

/// One applicant's submission against a job. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[serde(flatten)]
    pub applicant: Applicant,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Application as submitted, before the store assigns identity and time.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub applicant: Applicant,
    pub notes: String,
}

impl NewApplication {
    pub fn into_application(self) -> Application {
        Application {
            id: Uuid::new_v4(),
            applicant: self.applicant,
            notes: self.notes,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
        }
    }
}
