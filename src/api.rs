//! Typed access to the backend's named procedures.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;

use crate::error::RemoteError;
use crate::models::{Money, NewExpense, NewRecurringExpense, ProjectId, YearMonth};
use crate::query::{QueryKey, QueryParams, ResourceKind};
use crate::remote::{RpcTransport, SortOrder, TableQuery};
use crate::session::SessionState;

pub const RECENT_EXPENSES_LIMIT: u32 = 10;
pub const TREND_MONTHS: u32 = 6;

/// A cacheable read. Its cache key is derived from the request itself, so a
/// read can never be cached under a different scope than the one it queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    MyProjects,
    Categories(ProjectId),
    Recurring(ProjectId),
    MonthlySummary(ProjectId, YearMonth),
    BudgetStatus(ProjectId, YearMonth),
    RecentExpenses(ProjectId, u32),
    MonthlyTrend(ProjectId, u32),
}

impl Read {
    pub fn key(&self) -> QueryKey {
        match self {
            Read::MyProjects => QueryKey::unscoped(ResourceKind::Projects),
            Read::Categories(p) => QueryKey::scoped(ResourceKind::Categories, p.clone(), QueryParams::None),
            Read::Recurring(p) => QueryKey::scoped(ResourceKind::Recurring, p.clone(), QueryParams::None),
            Read::MonthlySummary(p, ym) => {
                QueryKey::scoped(ResourceKind::Summary, p.clone(), QueryParams::Period(*ym))
            }
            Read::BudgetStatus(p, ym) => {
                QueryKey::scoped(ResourceKind::BudgetStatus, p.clone(), QueryParams::Period(*ym))
            }
            Read::RecentExpenses(p, limit) => {
                QueryKey::scoped(ResourceKind::RecentExpenses, p.clone(), QueryParams::Limit(*limit))
            }
            Read::MonthlyTrend(p, months) => {
                QueryKey::scoped(ResourceKind::Trend, p.clone(), QueryParams::Months(*months))
            }
        }
    }
}

#[derive(Clone)]
pub struct ExpenseApi {
    transport: Arc<dyn RpcTransport>,
    session: watch::Receiver<SessionState>,
}

impl ExpenseApi {
    pub fn new(transport: Arc<dyn RpcTransport>, session: watch::Receiver<SessionState>) -> Self {
        Self { transport, session }
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        self.session
            .borrow()
            .session()
            .map(|s| s.access_token.clone())
            .ok_or(RemoteError::Unauthorized)
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, RemoteError> {
        let bearer = self.bearer()?;
        self.transport.rpc(&bearer, function, params).await
    }

    pub async fn read(&self, read: &Read) -> Result<Value, RemoteError> {
        match read {
            Read::MyProjects => self.rpc("get_my_projects", json!({})).await,
            Read::Categories(p) => {
                self.rpc("get_project_categories", json!({ "p_project_id": p })).await
            }
            Read::Recurring(p) => {
                self.rpc("get_recurring_expenses", json!({ "p_project_id": p })).await
            }
            Read::MonthlySummary(p, ym) => {
                self.rpc(
                    "get_monthly_summary",
                    json!({ "p_project_id": p, "p_month": ym.month, "p_year": ym.year }),
                )
                .await
            }
            Read::BudgetStatus(p, ym) => {
                self.rpc(
                    "get_budget_status",
                    json!({ "p_project_id": p, "p_month": ym.month, "p_year": ym.year }),
                )
                .await
            }
            Read::MonthlyTrend(p, months) => {
                self.rpc(
                    "get_monthly_trend",
                    json!({ "p_project_id": p, "p_months": months }),
                )
                .await
            }
            Read::RecentExpenses(p, limit) => {
                let bearer = self.bearer()?;
                let query = TableQuery::new("expenses_view")
                    .eq("project_id", p.as_str())
                    .order("spent_at", SortOrder::Desc)
                    .limit(*limit);
                self.transport.select(&bearer, &query).await
            }
        }
    }

    // ============= Mutations =============

    pub async fn create_project(&self, name: &str) -> Result<(), RemoteError> {
        self.rpc("create_project_with_membership", json!({ "p_name": name }))
            .await
            .map(drop)
    }

    pub async fn insert_expense(&self, expense: &NewExpense) -> Result<(), RemoteError> {
        let bearer = self.bearer()?;
        let row = serde_json::to_value(expense)?;
        self.transport.insert(&bearer, "expenses", row).await
    }

    pub async fn add_category(&self, project: &ProjectId, name: &str) -> Result<(), RemoteError> {
        self.rpc(
            "add_project_category",
            json!({ "p_project_id": project, "p_name": name }),
        )
        .await
        .map(drop)
    }

    pub async fn upsert_budget(
        &self,
        project: &ProjectId,
        period: YearMonth,
        amount: Money,
    ) -> Result<(), RemoteError> {
        self.rpc(
            "upsert_project_budget",
            json!({
                "p_project_id": project,
                "p_month": period.month,
                "p_year": period.year,
                "p_amount": amount,
            }),
        )
        .await
        .map(drop)
    }

    pub async fn add_recurring(&self, rule: &NewRecurringExpense) -> Result<(), RemoteError> {
        self.rpc(
            "add_recurring_expense",
            json!({
                "p_project_id": rule.project_id,
                "p_category_id": rule.category_id,
                "p_amount": rule.amount,
                "p_cadence": rule.cadence,
                "p_interval_count": rule.interval_count.max(1),
                "p_start_date": rule.start_date,
                "p_end_date": rule.end_date,
                "p_note": rule.note,
            }),
        )
        .await
        .map(drop)
    }

    pub async fn toggle_recurring(&self, id: &str, active: bool) -> Result<(), RemoteError> {
        self.rpc(
            "toggle_recurring_expense",
            json!({ "p_id": id, "p_active": active }),
        )
        .await
        .map(drop)
    }

    pub async fn apply_recurring(&self, project: &ProjectId) -> Result<(), RemoteError> {
        self.rpc("apply_recurring_expenses", json!({ "p_project_id": project }))
            .await
            .map(drop)
    }
}
