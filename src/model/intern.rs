use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub type InternId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InternStatus {
    Active,
    Inactive,
    Completed,
}

/// Directory entry owned by the external CRUD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intern {
    pub id: InternId,
    pub name: String,
    pub status: InternStatus,
    /// First day attendance is expected; backfill never reaches before it.
    pub start_date: Option<NaiveDate>,
}

impl Intern {
    pub fn is_active(&self) -> bool {
        self.status == InternStatus::Active
    }
}
