use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Money;

/// Calendar month used as the period parameter of summary and budget reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }
}

/// One row of the monthly per-category summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget: Money,
    pub spent: Money,
    pub remaining: Money,
    pub pct: f64,
}

impl Default for BudgetStatus {
    fn default() -> Self {
        Self {
            budget: Money::zero(),
            spent: Money::zero(),
            remaining: Money::zero(),
            pct: 0.0,
        }
    }
}

impl BudgetStatus {
    /// Spent fraction for progress display, clamped to `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        (self.pct / 100.0).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    pub total: Money,
}
