use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::models::applicant::{Professional, Trainee};
use crate::models::application::{Applicant, NewApplication};
use crate::models::company::Company;
use crate::models::job::{
    CompanySummary, Job, JobFilter, JobView, NamedRef, NewJob, Populated, Population,
    ProfessionSummary,
};
use crate::models::location::{City, Country, Province};
use crate::models::profession::Profession;
use crate::store::{AppendOutcome, JobStore};

/// Fixture document for `MemoryStore::from_seed`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Seed {
    pub professions: Vec<Profession>,
    pub companies: Vec<Company>,
    pub countries: Vec<Country>,
    pub provinces: Vec<Province>,
    pub cities: Vec<City>,
    pub professionals: Vec<Professional>,
    pub trainees: Vec<Trainee>,
    pub jobs: Vec<Job>,
}

/// In-process store. Each job sits behind its own mutex so read-modify-write
/// on one job never blocks another; the outer maps are only write-locked to
/// insert.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, Arc<Mutex<Job>>>>,
    professions: RwLock<HashMap<Uuid, Profession>>,
    companies: RwLock<HashMap<Uuid, Company>>,
    countries: RwLock<HashMap<Uuid, Country>>,
    provinces: RwLock<HashMap<Uuid, Province>>,
    cities: RwLock<HashMap<Uuid, City>>,
    professionals: RwLock<HashMap<Uuid, Professional>>,
    trainees: RwLock<HashMap<Uuid, Trainee>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        fn index<T>(items: Vec<T>, id: impl Fn(&T) -> Uuid) -> RwLock<HashMap<Uuid, T>> {
            RwLock::new(items.into_iter().map(|item| (id(&item), item)).collect())
        }

        let jobs = seed
            .jobs
            .into_iter()
            .map(|mut job| {
                job.applications_count = job.applications.len() as i64;
                (job.id, Arc::new(Mutex::new(job)))
            })
            .collect();

        Self {
            jobs: RwLock::new(jobs),
            professions: index(seed.professions, |p| p.id),
            companies: index(seed.companies, |c| c.id),
            countries: index(seed.countries, |c| c.id),
            provinces: index(seed.provinces, |p| p.id),
            cities: index(seed.cities, |c| c.id),
            professionals: index(seed.professionals, |p| p.id),
            trainees: index(seed.trainees, |t| t.id),
        }
    }

    /// Loads a JSON fixture file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid seed file {}", path.display()))?;
        info!(
            "Loaded seed: {} jobs, {} companies, {} professions",
            seed.jobs.len(),
            seed.companies.len(),
            seed.professions.len()
        );
        Ok(Self::from_seed(seed))
    }

    #[cfg(test)]
    pub async fn insert_profession(&self, profession: Profession) {
        self.professions.write().await.insert(profession.id, profession);
    }

    #[cfg(test)]
    pub async fn insert_company(&self, company: Company) {
        self.companies.write().await.insert(company.id, company);
    }

    #[cfg(test)]
    pub async fn insert_city(&self, city: City) {
        self.cities.write().await.insert(city.id, city);
    }

    #[cfg(test)]
    pub async fn insert_country(&self, country: Country) {
        self.countries.write().await.insert(country.id, country);
    }

    #[cfg(test)]
    pub async fn insert_province(&self, province: Province) {
        self.provinces.write().await.insert(province.id, province);
    }

    #[cfg(test)]
    pub async fn insert_professional(&self, professional: Professional) {
        self.professionals
            .write()
            .await
            .insert(professional.id, professional);
    }

    #[cfg(test)]
    pub async fn insert_trainee(&self, trainee: Trainee) {
        self.trainees.write().await.insert(trainee.id, trainee);
    }

    #[cfg(test)]
    pub async fn company(&self, id: Uuid) -> Option<Company> {
        self.companies.read().await.get(&id).cloned()
    }

    async fn job_slot(&self, id: Uuid) -> Option<Arc<Mutex<Job>>> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn populate(&self, job: Job, population: Population) -> JobView {
        let company = self.companies.read().await.get(&job.company).map(|c| CompanySummary {
            id: c.id,
            company_name: c.company_name.clone(),
            logo: c.logo.clone(),
            description: match population {
                Population::Detail => c.description.clone(),
                Population::Listing => None,
            },
        });
        let profession = self
            .professions
            .read()
            .await
            .get(&job.profession)
            .map(|p| ProfessionSummary {
                id: p.id,
                name: p.name.clone(),
                category: p.category.clone(),
            });

        let city = match job.city {
            Some(id) => {
                let name = self.cities.read().await.get(&id).map(|c| c.name.clone());
                Some(Populated::resolve(id, name.map(|name| NamedRef { id, name })))
            }
            None => None,
        };
        let country = match job.country {
            Some(id) => {
                let name = self.countries.read().await.get(&id).map(|c| c.name.clone());
                Some(Populated::resolve(id, name.map(|name| NamedRef { id, name })))
            }
            None => None,
        };
        let province = match (job.province, population) {
            (Some(id), Population::Detail) => {
                let name = self.provinces.read().await.get(&id).map(|p| p.name.clone());
                Some(Populated::resolve(id, name.map(|name| NamedRef { id, name })))
            }
            (Some(id), Population::Listing) => Some(Populated::Id(id)),
            (None, _) => None,
        };

        JobView {
            id: job.id,
            profession: Populated::resolve(job.profession, profession),
            profession_name: job.profession_name,
            company: Populated::resolve(job.company, company),
            title: job.title,
            description: job.description,
            city,
            country,
            province,
            job_type: job.job_type,
            status: job.status,
            posted_date: job.posted_date,
            views: job.views,
            applications_count: job.applications_count,
            applications: job.applications,
            extra: job.extra,
        }
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobView>> {
        let slots: Vec<_> = self.jobs.read().await.values().cloned().collect();

        let mut matching = Vec::new();
        for slot in slots {
            let job = slot.lock().await;
            if filter.matches(&job) {
                matching.push(job.clone());
            }
        }
        matching.sort_by(|a, b| {
            b.posted_date
                .cmp(&a.posted_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut views = Vec::with_capacity(matching.len());
        for job in matching {
            views.push(self.populate(job, Population::Listing).await);
        }
        Ok(views)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobView>> {
        let Some(slot) = self.job_slot(id).await else {
            return Ok(None);
        };
        let job = slot.lock().await.clone();
        Ok(Some(self.populate(job, Population::Detail).await))
    }

    async fn record_view(&self, id: Uuid) -> Result<Option<i64>> {
        let Some(slot) = self.job_slot(id).await else {
            return Ok(None);
        };
        let mut job = slot.lock().await;
        job.views += 1;
        Ok(Some(job.views))
    }

    async fn find_profession(&self, id: Uuid) -> Result<Option<Profession>> {
        Ok(self.professions.read().await.get(&id).cloned())
    }

    async fn find_company_by_owner(&self, user_id: Uuid) -> Result<Option<Company>> {
        Ok(self
            .companies
            .read()
            .await
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job> {
        let job = job.into_job(Uuid::new_v4());
        self.jobs
            .write()
            .await
            .insert(job.id, Arc::new(Mutex::new(job.clone())));
        Ok(job)
    }

    async fn increment_jobs_posted(&self, company_id: Uuid) -> Result<i64> {
        let mut companies = self.companies.write().await;
        let company = companies
            .get_mut(&company_id)
            .with_context(|| format!("Company {company_id} disappeared"))?;
        company.total_jobs_posted += 1;
        Ok(company.total_jobs_posted)
    }

    async fn append_application(
        &self,
        job_id: Uuid,
        application: NewApplication,
    ) -> Result<AppendOutcome> {
        let Some(slot) = self.job_slot(job_id).await else {
            return Ok(AppendOutcome::JobNotFound);
        };
        let mut job = slot.lock().await;

        let applicant: Applicant = application.applicant;
        if job.applications.iter().any(|a| a.applicant == applicant) {
            return Ok(AppendOutcome::AlreadyApplied);
        }

        job.applications.push(application.into_application());
        job.applications_count = job.applications.len() as i64;
        Ok(AppendOutcome::Appended(job.clone()))
    }

    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>> {
        Ok(self.professionals.read().await.get(&id).cloned())
    }

    async fn find_trainee(&self, id: Uuid) -> Result<Option<Trainee>> {
        Ok(self.trainees.read().await.get(&id).cloned())
    }
}
