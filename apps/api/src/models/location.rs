use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "country")]
    pub country_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "province")]
    pub province_id: Option<Uuid>,
    #[serde(rename = "country")]
    pub country_id: Option<Uuid>,
}
