//! Application runtime: session, scope, cache and API wired together.
//!
//! # Invariants
//! - Scoped reads are built from the current scope, so their keys always
//!   name the project they query.
//! - Every mutation goes through `QueryClient::mutate` with the kinds it
//!   affects; failures invalidate nothing.
//! - Sign-out or a change of user clears the scope and the whole cache.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ExpenseApi, Read, RECENT_EXPENSES_LIMIT, TREND_MONTHS};
use crate::error::{DisabledReason, QueryError, RemoteError};
use crate::models::{
    BudgetStatus, Category, CategoryTotal, ExpenseRow, Money, NewExpense, NewRecurringExpense,
    Project, ProjectId, RecurringExpense, TrendPoint, YearMonth,
};
use crate::query::{QueryClient, ResourceKind, ViewGuard};
use crate::remote::{AuthProvider, RpcTransport};
use crate::scope::ScopeContext;
use crate::session::{Session, SessionManager, Subscription};

/// Reads affected by a new expense.
pub const EXPENSE_KINDS: [ResourceKind; 4] = [
    ResourceKind::RecentExpenses,
    ResourceKind::Summary,
    ResourceKind::BudgetStatus,
    ResourceKind::Trend,
];

/// Reads affected by materializing recurring expenses.
pub const APPLY_RECURRING_KINDS: [ResourceKind; 4] = [
    ResourceKind::BudgetStatus,
    ResourceKind::Summary,
    ResourceKind::RecentExpenses,
    ResourceKind::Trend,
];

pub struct AppRuntime {
    pub session: Arc<SessionManager>,
    pub scope: Arc<ScopeContext>,
    pub queries: Arc<QueryClient>,
    pub api: ExpenseApi,
    owner: Arc<Mutex<Option<String>>>,
    auth_subscription: Mutex<Option<Subscription>>,
}

/// Records the signed-in user id and reports whether it changed.
fn swap_owner(owner: &Mutex<Option<String>>, next: Option<&str>) -> bool {
    let mut current = owner.lock().unwrap_or_else(PoisonError::into_inner);
    if current.as_deref() == next {
        return false;
    }
    *current = next.map(str::to_string);
    true
}

impl AppRuntime {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        transport: Arc<dyn RpcTransport>,
        resolve_timeout: Duration,
    ) -> Self {
        let session = Arc::new(SessionManager::new(provider, resolve_timeout));
        let scope = Arc::new(ScopeContext::new());
        let queries = Arc::new(QueryClient::new(session.watch(), scope.watch()));
        let api = ExpenseApi::new(transport, session.watch());
        Self {
            session,
            scope,
            queries,
            api,
            owner: Arc::new(Mutex::new(None)),
            auth_subscription: Mutex::new(None),
        }
    }

    /// Resolves the session and starts listening for session changes.
    pub async fn start(&self) -> Option<Session> {
        let initial = self.session.resolve_initial_session().await;

        swap_owner(&self.owner, initial.as_ref().map(|s| s.user_id()));

        let scope = Arc::clone(&self.scope);
        let queries = Arc::clone(&self.queries);
        let owner = Arc::clone(&self.owner);
        let subscription = self.session.subscribe(move |next| {
            if swap_owner(&owner, next.as_ref().map(|s| s.user_id())) {
                info!(signed_in = next.is_some(), "session owner changed; resetting scope and cache");
                scope.clear();
                queries.clear();
            }
        });
        *self
            .auth_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        initial
    }

    /// Drops the session subscription.
    pub fn shutdown(&self) {
        self.auth_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let session = self.session.sign_in(email, password).await?;
        if swap_owner(&self.owner, Some(session.user_id())) {
            self.scope.clear();
            self.queries.clear();
        }
        Ok(session)
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        swap_owner(&self.owner, None);
        self.scope.clear();
        self.queries.clear();
    }

    pub fn select_project(&self, project: Option<ProjectId>) {
        self.scope.set_scope(project);
    }

    fn require_scope(&self) -> Result<ProjectId, QueryError> {
        self.scope
            .get_scope()
            .ok_or(QueryError::Disabled(DisabledReason::NoScope))
    }

    async fn query_value(&self, read: Read, view: &ViewGuard) -> Result<Value, QueryError> {
        let key = read.key();
        let api = &self.api;
        self.queries
            .fetch(&key, view, || async move { api.read(&read).await })
            .await
    }

    async fn query<T: DeserializeOwned>(&self, read: Read, view: &ViewGuard) -> Result<T, QueryError> {
        let value = self.query_value(read, view).await?;
        serde_json::from_value(value).map_err(|e| QueryError::Remote(e.into()))
    }

    // ============= Reads =============

    pub async fn my_projects(&self, view: &ViewGuard) -> Result<Vec<Project>, QueryError> {
        self.query(Read::MyProjects, view).await
    }

    pub async fn categories(&self, view: &ViewGuard) -> Result<Vec<Category>, QueryError> {
        let project = self.require_scope()?;
        self.query(Read::Categories(project), view).await
    }

    pub async fn recurring_expenses(&self, view: &ViewGuard) -> Result<Vec<RecurringExpense>, QueryError> {
        let project = self.require_scope()?;
        self.query(Read::Recurring(project), view).await
    }

    pub async fn monthly_summary(
        &self,
        period: YearMonth,
        view: &ViewGuard,
    ) -> Result<Vec<CategoryTotal>, QueryError> {
        let project = self.require_scope()?;
        self.query(Read::MonthlySummary(project, period), view).await
    }

    /// Budget status for a month; a missing budget reads as all zeros.
    pub async fn budget_status(&self, period: YearMonth, view: &ViewGuard) -> Result<BudgetStatus, QueryError> {
        let project = self.require_scope()?;
        let value = self.query_value(Read::BudgetStatus(project, period), view).await?;
        let row = match value {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Array(_) | Value::Null => return Ok(BudgetStatus::default()),
            other => other,
        };
        serde_json::from_value(row).map_err(|e| QueryError::Remote(e.into()))
    }

    pub async fn recent_expenses(&self, view: &ViewGuard) -> Result<Vec<ExpenseRow>, QueryError> {
        let project = self.require_scope()?;
        self.query(Read::RecentExpenses(project, RECENT_EXPENSES_LIMIT), view)
            .await
    }

    pub async fn monthly_trend(&self, view: &ViewGuard) -> Result<Vec<TrendPoint>, QueryError> {
        let project = self.require_scope()?;
        self.query(Read::MonthlyTrend(project, TREND_MONTHS), view).await
    }

    // ============= Mutations =============

    pub async fn create_project(&self, name: &str) -> Result<(), RemoteError> {
        self.queries
            .mutate(None, &[ResourceKind::Projects], self.api.create_project(name))
            .await
    }

    pub async fn add_expense(&self, expense: &NewExpense) -> Result<(), RemoteError> {
        self.queries
            .mutate(
                Some(&expense.project_id),
                &EXPENSE_KINDS,
                self.api.insert_expense(expense),
            )
            .await
    }

    pub async fn add_category(&self, project: &ProjectId, name: &str) -> Result<(), RemoteError> {
        self.queries
            .mutate(
                Some(project),
                &[ResourceKind::Categories],
                self.api.add_category(project, name),
            )
            .await
    }

    pub async fn set_monthly_budget(
        &self,
        project: &ProjectId,
        period: YearMonth,
        amount: Money,
    ) -> Result<(), RemoteError> {
        self.queries
            .mutate(
                Some(project),
                &[ResourceKind::BudgetStatus],
                self.api.upsert_budget(project, period, amount),
            )
            .await
    }

    pub async fn add_recurring(&self, rule: &NewRecurringExpense) -> Result<(), RemoteError> {
        self.queries
            .mutate(
                Some(&rule.project_id),
                &[ResourceKind::Recurring],
                self.api.add_recurring(rule),
            )
            .await
    }

    pub async fn toggle_recurring(
        &self,
        project: &ProjectId,
        id: &str,
        active: bool,
    ) -> Result<(), RemoteError> {
        self.queries
            .mutate(
                Some(project),
                &[ResourceKind::Recurring],
                self.api.toggle_recurring(id, active),
            )
            .await
    }

    /// Materializes due recurring expenses for the current scope.
    ///
    /// Runs whenever the dashboard loads for a project. Failures are logged
    /// and otherwise ignored.
    pub async fn apply_recurring_on_load(&self) -> bool {
        let Some(project) = self.scope.get_scope() else {
            return false;
        };
        if !self.session.is_authenticated() {
            return false;
        }
        match self
            .queries
            .mutate(
                Some(&project),
                &APPLY_RECURRING_KINDS,
                self.api.apply_recurring(&project),
            )
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(%project, error = %err, "applying recurring expenses failed");
                false
            }
        }
    }
}
