use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Only the CV reference is read by the job service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: Uuid,
    pub cv: Option<String>,
    pub cv_file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trainee {
    pub id: Uuid,
    pub cv: Option<String>,
}
