//! Entity store: the persistence seam under the job service.
//!
//! `AppState` holds an `Arc<dyn JobStore>`. `PgStore` backs production,
//! `MemoryStore` backs local development and the test suite.
//!
//! Every read-modify-write on a single job (view counting, application
//! append) is a single store call so each backend can serialize it.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::applicant::{Professional, Trainee};
use crate::models::application::NewApplication;
use crate::models::company::Company;
use crate::models::job::{Job, JobFilter, JobView, NewJob};
use crate::models::profession::Profession;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of an atomic check-then-append on a job's applications.
#[derive(Debug)]
pub enum AppendOutcome {
    Appended(Job),
    AlreadyApplied,
    JobNotFound,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Jobs matching every filter field, listing population, newest first.
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobView>>;

    /// Single job with detail population. Does not touch counters.
    async fn find_job(&self, id: Uuid) -> Result<Option<JobView>>;

    /// Atomically adds one view. Returns the new count, `None` if the job is gone.
    async fn record_view(&self, id: Uuid) -> Result<Option<i64>>;

    async fn find_profession(&self, id: Uuid) -> Result<Option<Profession>>;

    async fn find_company_by_owner(&self, user_id: Uuid) -> Result<Option<Company>>;

    async fn insert_job(&self, job: NewJob) -> Result<Job>;

    /// Adds one to `totalJobsPosted`, returning the new value.
    async fn increment_jobs_posted(&self, company_id: Uuid) -> Result<i64>;

    /// Appends `application` unless the same applicant already applied.
    /// The duplicate check, the append and the `applicationsCount` bump
    /// are one atomic step.
    async fn append_application(
        &self,
        job_id: Uuid,
        application: NewApplication,
    ) -> Result<AppendOutcome>;

    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>>;

    async fn find_trainee(&self, id: Uuid) -> Result<Option<Trainee>>;
}
