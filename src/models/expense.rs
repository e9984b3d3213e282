use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Money, ProjectId};

/// Row of `expenses_view`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: String,
    pub spent_at: NaiveDate,
    #[serde(default)]
    pub category_name: Option<String>,
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
}

/// Insert payload for the `expenses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Money,
    pub project_id: ProjectId,
    pub category_id: String,
    pub spent_at: NaiveDate,
    pub note: Option<String>,
}
