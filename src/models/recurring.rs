use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Money, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [Cadence::Daily, Cadence::Weekly, Cadence::Monthly, Cadence::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn cycle(self, delta: i32) -> Self {
        let pos = Self::ALL.iter().position(|c| *c == self).unwrap_or(2) as i32;
        let len = Self::ALL.len() as i32;
        Self::ALL[(pos + delta).rem_euclid(len) as usize]
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: String,
    #[serde(default)]
    pub category_name: Option<String>,
    pub amount: Money,
    pub cadence: Cadence,
    pub interval_count: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub last_applied_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringExpense {
    pub project_id: ProjectId,
    pub category_id: String,
    pub amount: Money,
    pub cadence: Cadence,
    pub interval_count: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub note: Option<String>,
}
