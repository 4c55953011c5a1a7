use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::models::applicant::{Professional, Trainee};
use crate::models::application::{Applicant, Application, NewApplication};
use crate::models::company::Company;
use crate::models::job::{
    CompanySummary, Job, JobFilter, JobView, NamedRef, NewJob, Populated, Population,
    ProfessionSummary,
};
use crate::models::profession::Profession;
use crate::store::{AppendOutcome, JobStore};

const JOB_COLUMNS: &str = "j.id, j.profession_id, j.profession_name, j.company_id, j.title, \
     j.description, j.city_id, j.country_id, j.province_id, j.job_type, j.status, \
     j.posted_date, j.views, j.applications_count, j.extra";

const JOB_JOINS: &str = r#"
    FROM jobs j
    LEFT JOIN companies c    ON c.id  = j.company_id
    LEFT JOIN professions p  ON p.id  = j.profession_id
    LEFT JOIN cities ci      ON ci.id = j.city_id
    LEFT JOIN countries co   ON co.id = j.country_id
    LEFT JOIN provinces pr   ON pr.id = j.province_id
"#;

const JOINED_COLUMNS: &str = "c.company_name, c.logo AS company_logo, \
     c.description AS company_description, p.name AS profession_ref_name, \
     p.category AS profession_category, ci.name AS city_name, co.name AS country_name, \
     pr.name AS province_name";

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    profession_id: Uuid,
    profession_name: String,
    company_id: Uuid,
    title: String,
    description: Option<String>,
    city_id: Option<Uuid>,
    country_id: Option<Uuid>,
    province_id: Option<Uuid>,
    job_type: Option<String>,
    status: String,
    posted_date: DateTime<Utc>,
    views: i64,
    applications_count: i64,
    extra: Json<Map<String, Value>>,
}

impl JobRow {
    fn into_job(self, applications: Vec<Application>) -> Job {
        Job {
            id: self.id,
            profession: self.profession_id,
            profession_name: self.profession_name,
            company: self.company_id,
            title: self.title,
            description: self.description,
            city: self.city_id,
            country: self.country_id,
            province: self.province_id,
            job_type: self.job_type,
            status: self.status,
            posted_date: self.posted_date,
            views: self.views,
            applications_count: self.applications_count,
            applications,
            extra: self.extra.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct JoinedJobRow {
    #[sqlx(flatten)]
    job: JobRow,
    company_name: Option<String>,
    company_logo: Option<String>,
    company_description: Option<String>,
    profession_ref_name: Option<String>,
    profession_category: Option<String>,
    city_name: Option<String>,
    country_name: Option<String>,
    province_name: Option<String>,
}

impl JoinedJobRow {
    fn into_view(self, applications: Vec<Application>, population: Population) -> JobView {
        let row = self.job;

        let company = self.company_name.map(|company_name| CompanySummary {
            id: row.company_id,
            company_name,
            logo: self.company_logo,
            description: match population {
                Population::Detail => self.company_description,
                Population::Listing => None,
            },
        });
        let profession = self.profession_ref_name.map(|name| ProfessionSummary {
            id: row.profession_id,
            name,
            category: self.profession_category,
        });
        let named = |id: Option<Uuid>, name: Option<String>| {
            id.map(|id| Populated::resolve(id, name.map(|name| NamedRef { id, name })))
        };
        let province = match population {
            Population::Detail => named(row.province_id, self.province_name),
            Population::Listing => row.province_id.map(Populated::Id),
        };

        JobView {
            id: row.id,
            profession: Populated::resolve(row.profession_id, profession),
            profession_name: row.profession_name,
            company: Populated::resolve(row.company_id, company),
            title: row.title,
            description: row.description,
            city: named(row.city_id, self.city_name),
            country: named(row.country_id, self.country_name),
            province,
            job_type: row.job_type,
            status: row.status,
            posted_date: row.posted_date,
            views: row.views,
            applications_count: row.applications_count,
            applications,
            extra: row.extra.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    job_id: Uuid,
    professional_id: Option<Uuid>,
    trainee_id: Option<Uuid>,
    notes: String,
    status: String,
    applied_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let applicant = Applicant::from_parts(row.professional_id, row.trainee_id)
            .map_err(|_| anyhow!("Application {} has no single applicant", row.id))?;
        Ok(Application {
            id: row.id,
            applicant,
            notes: row.notes,
            status: row.status.parse()?,
            applied_at: row.applied_at,
        })
    }
}

/// PostgreSQL-backed entity store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applications for each job id, in submission order.
    async fn load_applications(&self, job_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Application>>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, job_id, professional_id, trainee_id, notes, status, applied_at
            FROM job_applications
            WHERE job_id = ANY($1)
            ORDER BY seq ASC
            "#,
        )
        .bind(job_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_job: HashMap<Uuid, Vec<Application>> = HashMap::new();
        for row in rows {
            let job_id = row.job_id;
            by_job.entry(job_id).or_default().push(row.try_into()?);
        }
        Ok(by_job)
    }

    async fn fetch_job(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs j WHERE j.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let applications = self.load_applications(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(row.into_job(applications)))
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobView>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS}, {JOINED_COLUMNS} {JOB_JOINS} WHERE TRUE"));
        if let Some(profession) = filter.profession {
            query.push(" AND j.profession_id = ").push_bind(profession);
        }
        if let Some(city) = filter.city {
            query.push(" AND j.city_id = ").push_bind(city);
        }
        if let Some(country) = filter.country {
            query.push(" AND j.country_id = ").push_bind(country);
        }
        if let Some(job_type) = &filter.job_type {
            query.push(" AND j.job_type = ").push_bind(job_type.clone());
        }
        if let Some(status) = &filter.status {
            query.push(" AND j.status = ").push_bind(status.clone());
        }
        if let Some(company) = filter.company {
            query.push(" AND j.company_id = ").push_bind(company);
        }
        query.push(" ORDER BY j.posted_date DESC, j.id ASC");

        let rows: Vec<JoinedJobRow> = query.build_query_as().fetch_all(&self.pool).await?;
        debug!("Job listing matched {} rows", rows.len());

        let ids: Vec<Uuid> = rows.iter().map(|r| r.job.id).collect();
        let mut applications = self.load_applications(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let apps = applications.remove(&row.job.id).unwrap_or_default();
                row.into_view(apps, Population::Listing)
            })
            .collect())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobView>> {
        let row = sqlx::query_as::<_, JoinedJobRow>(&format!(
            "SELECT {JOB_COLUMNS}, {JOINED_COLUMNS} {JOB_JOINS} WHERE j.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let applications = self.load_applications(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(row.into_view(applications, Population::Detail)))
    }

    async fn record_view(&self, id: Uuid) -> Result<Option<i64>> {
        // Single-statement increment: concurrent fetches never lose a view.
        Ok(
            sqlx::query_scalar("UPDATE jobs SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_profession(&self, id: Uuid) -> Result<Option<Profession>> {
        Ok(
            sqlx::query_as::<_, Profession>("SELECT id, name, category FROM professions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_company_by_owner(&self, user_id: Uuid) -> Result<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(
            r#"
            SELECT id, user_id, company_name, logo, description, total_jobs_posted
            FROM companies
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs AS j
                (id, profession_id, profession_name, company_id, title, description,
                 city_id, country_id, province_id, job_type, status, posted_date, extra)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING j.id, j.profession_id, j.profession_name, j.company_id, j.title,
                      j.description, j.city_id, j.country_id, j.province_id, j.job_type,
                      j.status, j.posted_date, j.views, j.applications_count, j.extra
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.profession)
        .bind(&job.profession_name)
        .bind(job.company)
        .bind(&job.title)
        .bind(&job.description)
        .bind(job.city)
        .bind(job.country)
        .bind(job.province)
        .bind(&job.job_type)
        .bind(&job.status)
        .bind(job.posted_date)
        .bind(Json(&job.extra))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_job(Vec::new()))
    }

    async fn increment_jobs_posted(&self, company_id: Uuid) -> Result<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE companies SET total_jobs_posted = total_jobs_posted + 1 WHERE id = $1 RETURNING total_jobs_posted",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        total.ok_or_else(|| anyhow!("Company {company_id} disappeared"))
    }

    async fn append_application(
        &self,
        job_id: Uuid,
        application: NewApplication,
    ) -> Result<AppendOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent appends to the same job.
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(AppendOutcome::JobNotFound);
        }

        let (professional_id, trainee_id) = application.applicant.columns();
        let already_applied: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM job_applications
                WHERE job_id = $1 AND (professional_id = $2 OR trainee_id = $3)
            )
            "#,
        )
        .bind(job_id)
        .bind(professional_id)
        .bind(trainee_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_applied {
            return Ok(AppendOutcome::AlreadyApplied);
        }

        let application = application.into_application();
        let inserted = sqlx::query(
            r#"
            INSERT INTO job_applications
                (id, job_id, professional_id, trainee_id, notes, status, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(application.id)
        .bind(job_id)
        .bind(professional_id)
        .bind(trainee_id)
        .bind(&application.notes)
        .bind(application.status.as_str())
        .bind(application.applied_at)
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Ok(AppendOutcome::AlreadyApplied);
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("UPDATE jobs SET applications_count = applications_count + 1 WHERE id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let job = self
            .fetch_job(job_id)
            .await?
            .ok_or_else(|| anyhow!("Job {job_id} vanished after application commit"))?;
        Ok(AppendOutcome::Appended(job))
    }

    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>> {
        Ok(sqlx::query_as::<_, Professional>(
            "SELECT id, cv, cv_file_name FROM professionals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_trainee(&self, id: Uuid) -> Result<Option<Trainee>> {
        Ok(
            sqlx::query_as::<_, Trainee>("SELECT id, cv FROM trainees WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
