use std::fmt;

use crate::models::{ProjectId, YearMonth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Projects,
    Categories,
    Recurring,
    Summary,
    BudgetStatus,
    RecentExpenses,
    Trend,
}

impl ResourceKind {
    /// Scoped kinds only run with a selected project and carry it in their key.
    pub fn is_scoped(self) -> bool {
        !matches!(self, ResourceKind::Projects)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Categories => "categories",
            Self::Recurring => "recurring",
            Self::Summary => "summary",
            Self::BudgetStatus => "budget-status",
            Self::RecentExpenses => "recent-expenses",
            Self::Trend => "trend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryParams {
    None,
    Period(YearMonth),
    Limit(u32),
    Months(u32),
}

/// Semantic identity of a cached read: `(kind, scope, params)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub kind: ResourceKind,
    pub scope: Option<ProjectId>,
    pub params: QueryParams,
}

impl QueryKey {
    pub fn unscoped(kind: ResourceKind) -> Self {
        Self {
            kind,
            scope: None,
            params: QueryParams::None,
        }
    }

    pub fn scoped(kind: ResourceKind, scope: ProjectId, params: QueryParams) -> Self {
        Self {
            kind,
            scope: Some(scope),
            params,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(scope) = &self.scope {
            write!(f, "/{scope}")?;
        }
        match self.params {
            QueryParams::None => Ok(()),
            QueryParams::Period(ym) => write!(f, "/{}-{:02}", ym.year, ym.month),
            QueryParams::Limit(n) => write!(f, "/limit={n}"),
            QueryParams::Months(n) => write!(f, "/months={n}"),
        }
    }
}
