//! Job service: listing, detail with view counting, creation, applications
//! and CV lookup. Every operation goes through `&dyn JobStore`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::application::{Applicant, NewApplication};
use crate::models::job::{Job, JobFilter, JobView, NewJob, DEFAULT_JOB_STATUS, RESERVED_JOB_FIELDS};
use crate::store::{AppendOutcome, JobStore};

pub const JOB_NOT_FOUND: &str = "Job not found";
pub const PROFESSION_NOT_FOUND: &str = "Profession not found";
pub const COMPANY_NOT_FOUND: &str =
    "Company profile not found. Please create company profile first.";
pub const ALREADY_APPLIED: &str = "Already applied to this job";
pub const CV_NOT_FOUND: &str = "CV not found";

/// Body of POST /jobs. Unknown fields are kept verbatim in `extra`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub profession: Uuid,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub city: Option<Uuid>,
    pub country: Option<Uuid>,
    pub province: Option<Uuid>,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of POST /jobs/apply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub job_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub trainee_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Where a CV lives. Byte delivery is left to static file serving.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvMetadata {
    pub cv_path: String,
    pub file_name: String,
}

pub async fn list_jobs(store: &dyn JobStore, filter: &JobFilter) -> Result<Vec<JobView>, AppError> {
    store.list_jobs(filter).await.map_err(AppError::Internal)
}

/// Read step of a detail fetch. No side effects.
pub async fn find_job(store: &dyn JobStore, id: Uuid) -> Result<JobView, AppError> {
    store
        .find_job(id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

/// Increment step of a detail fetch. Atomic in the store.
pub async fn record_view(store: &dyn JobStore, id: Uuid) -> Result<i64, AppError> {
    store
        .record_view(id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

/// Detail fetch: `find_job` then `record_view`. The returned view carries the
/// post-increment count.
pub async fn get_job(store: &dyn JobStore, id: Uuid) -> Result<JobView, AppError> {
    let mut job = find_job(store, id).await?;
    job.views = record_view(store, id).await?;
    Ok(job)
}

pub async fn create_job(
    store: &dyn JobStore,
    caller: Caller,
    request: CreateJobRequest,
) -> Result<Job, AppError> {
    let profession = store
        .find_profession(request.profession)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(PROFESSION_NOT_FOUND.to_string()))?;

    let company = store
        .find_company_by_owner(caller.user_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;

    let mut extra = request.extra;
    for key in RESERVED_JOB_FIELDS {
        extra.remove(*key);
    }

    let job = store
        .insert_job(NewJob {
            profession: profession.id,
            profession_name: profession.name,
            company: company.id,
            title: request.title,
            description: request.description,
            city: request.city,
            country: request.country,
            province: request.province,
            job_type: request.job_type,
            status: request.status.unwrap_or_else(|| DEFAULT_JOB_STATUS.to_string()),
            posted_date: request.posted_date.unwrap_or_else(Utc::now),
            extra,
        })
        .await
        .map_err(AppError::Internal)?;

    // Not atomic with the insert: a failure here leaves the job in place.
    let total = store
        .increment_jobs_posted(company.id)
        .await
        .map_err(AppError::Internal)?;

    info!(
        "Company {} posted job {} ({}), total {}",
        company.id, job.id, job.profession_name, total
    );
    Ok(job)
}

pub async fn apply_to_job(store: &dyn JobStore, request: ApplyRequest) -> Result<Job, AppError> {
    let applicant = Applicant::from_parts(request.professional_id, request.trainee_id)?;
    let application = NewApplication {
        applicant,
        notes: request.notes.unwrap_or_default(),
    };

    match store
        .append_application(request.job_id, application)
        .await
        .map_err(AppError::Internal)?
    {
        AppendOutcome::Appended(job) => {
            info!("{:?} applied to job {}", applicant, job.id);
            Ok(job)
        }
        AppendOutcome::AlreadyApplied => {
            warn!("{:?} already applied to job {}", applicant, request.job_id);
            Err(AppError::Conflict(ALREADY_APPLIED.to_string()))
        }
        AppendOutcome::JobNotFound => Err(AppError::NotFound(JOB_NOT_FOUND.to_string())),
    }
}

pub async fn cv_metadata(store: &dyn JobStore, applicant: Applicant) -> Result<CvMetadata, AppError> {
    let found = match applicant {
        Applicant::Professional(id) => store
            .find_professional(id)
            .await
            .map_err(AppError::Internal)?
            .and_then(|p| {
                let file_name = p.cv_file_name.unwrap_or_else(|| "cv.pdf".to_string());
                p.cv.map(|cv_path| CvMetadata { cv_path, file_name })
            }),
        Applicant::Trainee(id) => store
            .find_trainee(id)
            .await
            .map_err(AppError::Internal)?
            .and_then(|t| {
                t.cv.map(|cv_path| CvMetadata {
                    cv_path,
                    file_name: "trainee-cv.pdf".to_string(),
                })
            }),
    };

    found
        .filter(|cv| !cv.cv_path.is_empty())
        .ok_or_else(|| AppError::NotFound(CV_NOT_FOUND.to_string()))
}
