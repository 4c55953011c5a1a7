use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A company profile. Each user owns at most one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub company_name: String,
    pub logo: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub total_jobs_posted: i64,
}
