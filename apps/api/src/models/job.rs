use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::application::Application;

pub const DEFAULT_JOB_STATUS: &str = "active";

/// Payload keys owned by the service. Stripped from free-form fields on creation.
pub const RESERVED_JOB_FIELDS: &[&str] = &[
    "id",
    "_id",
    "company",
    "professionName",
    "views",
    "applicationsCount",
    "applications",
];

/// A stored job with unresolved references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub profession: Uuid,
    pub profession_name: String,
    pub company: Uuid,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub city: Option<Uuid>,
    pub country: Option<Uuid>,
    pub province: Option<Uuid>,
    pub job_type: Option<String>,
    pub status: String,
    pub posted_date: DateTime<Utc>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub applications_count: i64,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A job ready to be inserted; identity and counters are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub profession: Uuid,
    pub profession_name: String,
    pub company: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub city: Option<Uuid>,
    pub country: Option<Uuid>,
    pub province: Option<Uuid>,
    pub job_type: Option<String>,
    pub status: String,
    pub posted_date: DateTime<Utc>,
    pub extra: Map<String, Value>,
}

impl NewJob {
    pub fn into_job(self, id: Uuid) -> Job {
        Job {
            id,
            profession: self.profession,
            profession_name: self.profession_name,
            company: self.company,
            title: self.title,
            description: self.description,
            city: self.city,
            country: self.country,
            province: self.province,
            job_type: self.job_type,
            status: self.status,
            posted_date: self.posted_date,
            views: 0,
            applications_count: 0,
            applications: Vec::new(),
            extra: self.extra,
        }
    }
}

/// How much of each referenced entity a read resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Company name + logo, profession, city, country.
    Listing,
    /// Listing plus company description and province.
    Detail,
}

/// A reference that is either left as an id or resolved into a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Populated<T> {
    Id(Uuid),
    Doc(T),
}

impl<T> Populated<T> {
    #[cfg(test)]
    pub fn doc(&self) -> Option<&T> {
        match self {
            Populated::Doc(doc) => Some(doc),
            Populated::Id(_) => None,
        }
    }

    /// Resolves `id` through `doc`, falling back to the bare id when the target is gone.
    pub fn resolve(id: Uuid, doc: Option<T>) -> Self {
        doc.map_or(Populated::Id(id), Populated::Doc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: Uuid,
    pub company_name: String,
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessionSummary {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

/// A job as returned by listing and detail reads, references resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub profession: Populated<ProfessionSummary>,
    pub profession_name: String,
    pub company: Populated<CompanySummary>,
    pub title: String,
    pub description: Option<String>,
    pub city: Option<Populated<NamedRef>>,
    pub country: Option<Populated<NamedRef>>,
    pub province: Option<Populated<NamedRef>>,
    pub job_type: Option<String>,
    pub status: String,
    pub posted_date: DateTime<Utc>,
    pub views: i64,
    pub applications_count: i64,
    pub applications: Vec<Application>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Conjunctive exact-match filter over jobs. `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub profession: Option<Uuid>,
    pub city: Option<Uuid>,
    pub country: Option<Uuid>,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub company: Option<Uuid>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        fn eq<T: PartialEq>(want: &Option<T>, have: Option<&T>) -> bool {
            want.as_ref().map_or(true, |w| have == Some(w))
        }

        eq(&self.profession, Some(&job.profession))
            && eq(&self.city, job.city.as_ref())
            && eq(&self.country, job.country.as_ref())
            && eq(&self.job_type, job.job_type.as_ref())
            && eq(&self.status, Some(&job.status))
            && eq(&self.company, Some(&job.company))
    }
}
