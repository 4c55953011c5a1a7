//! Axum route handlers for the Jobs API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::jobs::service::{self, ApplyRequest, CreateJobRequest, CvMetadata};
use crate::models::application::Applicant;
use crate::models::job::{Job, JobFilter, JobView};
use crate::response::ApiResponse;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// Raw listing query. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    pub profession: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub company: Option<String>,
}

impl TryFrom<JobListQuery> for JobFilter {
    type Error = AppError;

    fn try_from(query: JobListQuery) -> Result<Self, Self::Error> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        fn id(name: &str, value: Option<String>) -> Result<Option<Uuid>, AppError> {
            present(value)
                .map(|v| {
                    v.trim()
                        .parse()
                        .map_err(|_| AppError::Validation(format!("Invalid {name} id '{v}'")))
                })
                .transpose()
        }

        Ok(JobFilter {
            profession: id("profession", query.profession)?,
            city: id("city", query.city)?,
            country: id("country", query.country)?,
            job_type: present(query.job_type),
            status: present(query.status),
            company: id("company", query.company)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvQuery {
    pub professional_id: Option<Uuid>,
    pub trainee_id: Option<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<JobView>>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let filter = JobFilter::try_from(query)?;
    let jobs = service::list_jobs(state.store.as_ref(), &filter).await?;
    Ok(Json(ApiResponse::list(jobs)))
}

/// GET /api/jobs/:id
///
/// Returns the job and records one view.
pub async fn handle_get_job(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<JobView>>, AppError> {
    let Path(id) = id.map_err(|_| AppError::Validation("Invalid job id".to_string()))?;
    let job = service::get_job(state.store.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok(job)))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Job>>), AppError> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let job = service::create_job(state.store.as_ref(), caller, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(job))))
}

/// POST /api/jobs/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    Extension(_caller): Extension<Caller>,
    body: Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Job>>, AppError> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let job = service::apply_to_job(state.store.as_ref(), request).await?;
    Ok(Json(
        ApiResponse::ok(job).with_message("Application submitted successfully"),
    ))
}

/// GET /api/jobs/cv/download
///
/// Metadata only; the file itself is served by static hosting.
pub async fn handle_cv_download(
    State(state): State<AppState>,
    Extension(_caller): Extension<Caller>,
    query: Result<Query<CvQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<CvMetadata>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let applicant = Applicant::from_parts(query.professional_id, query.trainee_id)?;
    let cv = service::cv_metadata(state.store.as_ref(), applicant).await?;
    Ok(Json(ApiResponse::ok(cv)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_blank_values_are_absent() {
        let filter = JobFilter::try_from(JobListQuery {
            job_type: Some("".into()),
            status: Some("active".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.job_type, None);
        assert_eq!(filter.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_list_query_rejects_malformed_ids() {
        let err = JobFilter::try_from(JobListQuery {
            city: Some("lisbon".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("city")));
    }
}
