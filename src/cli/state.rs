// src/cli/state.rs
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use tracing::debug;

use crate::cli::input::LineEdit;
use crate::cli::util::{iso, parse_date, parse_money, today};
use crate::error::{QueryError, RemoteError};
use crate::models::{
    BudgetStatus, Cadence, Category, CategoryTotal, ExpenseRow, Money, NewExpense,
    NewRecurringExpense, Project, ProjectId, RecurringExpense, TrendPoint, YearMonth,
};
use crate::query::{ResourceKind, ViewGuard};
use crate::runtime::{AppRuntime, EXPENSE_KINDS};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    AddExpense,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Login,
    Projects,
    Main(Tab),
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Blocking message; any key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
    Submit,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: LineEdit,
    pub password: LineEdit,
    pub focus: LoginField,
    pub editing: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: LineEdit::default(),
            password: LineEdit::masked(),
            focus: LoginField::Email,
            editing: false,
        }
    }
}

#[derive(Default)]
pub struct ProjectsPage {
    pub view: ViewGuard,
    pub list: Vec<Project>,
    pub sel: ListState,
    pub new_name: LineEdit,
    pub naming: bool,
}

#[derive(Default)]
pub struct DashboardPage {
    pub view: ViewGuard,
    pub period: Option<YearMonth>,
    pub budget: BudgetStatus,
    pub summary: Vec<CategoryTotal>,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<ExpenseRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Amount,
    Date,
    Category,
    Note,
    Save,
}

impl AddField {
    const ORDER: [AddField; 5] = [
        AddField::Amount,
        AddField::Date,
        AddField::Category,
        AddField::Note,
        AddField::Save,
    ];
}

pub struct AddExpenseForm {
    pub view: ViewGuard,
    pub categories: Vec<Category>,
    pub cat_sel: ListState,
    pub amount: LineEdit,
    pub date: LineEdit,
    pub note: LineEdit,
    pub focus: AddField,
    pub editing: bool,
}

impl Default for AddExpenseForm {
    fn default() -> Self {
        Self {
            view: ViewGuard::default(),
            categories: Vec::new(),
            cat_sel: ListState::default(),
            amount: LineEdit::default(),
            date: LineEdit::new(iso(&today())),
            note: LineEdit::default(),
            focus: AddField::Amount,
            editing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminField {
    NewCategory,
    AddCategory,
    Budget,
    SaveBudget,
    RecurringList,
    ReAmount,
    ReCategory,
    ReCadence,
    ReInterval,
    ReStart,
    ReEnd,
    ReNote,
    AddRecurring,
}

impl AdminField {
    const ORDER: [AdminField; 13] = [
        AdminField::NewCategory,
        AdminField::AddCategory,
        AdminField::Budget,
        AdminField::SaveBudget,
        AdminField::RecurringList,
        AdminField::ReAmount,
        AdminField::ReCategory,
        AdminField::ReCadence,
        AdminField::ReInterval,
        AdminField::ReStart,
        AdminField::ReEnd,
        AdminField::ReNote,
        AdminField::AddRecurring,
    ];
}

pub struct AdminPage {
    pub view: ViewGuard,
    pub categories: Vec<Category>,
    pub recurring: Vec<RecurringExpense>,
    pub rec_sel: ListState,
    pub new_category: LineEdit,
    pub budget: LineEdit,
    pub re_amount: LineEdit,
    pub re_cat_sel: ListState,
    pub re_cadence: Cadence,
    pub re_interval: LineEdit,
    pub re_start: LineEdit,
    pub re_end: LineEdit,
    pub re_note: LineEdit,
    pub focus: AdminField,
    pub editing: bool,
}

impl Default for AdminPage {
    fn default() -> Self {
        Self {
            view: ViewGuard::default(),
            categories: Vec::new(),
            recurring: Vec::new(),
            rec_sel: ListState::default(),
            new_category: LineEdit::default(),
            budget: LineEdit::default(),
            re_amount: LineEdit::default(),
            re_cat_sel: ListState::default(),
            re_cadence: Cadence::Monthly,
            re_interval: LineEdit::new("1"),
            re_start: LineEdit::new(iso(&today())),
            re_end: LineEdit::default(),
            re_note: LineEdit::default(),
            focus: AdminField::NewCategory,
            editing: false,
        }
    }
}

pub struct App {
    pub rt: Arc<AppRuntime>,
    pub screen: Screen,
    pub previous: Screen,
    pub notice: Option<Notice>,
    pub currency: String,
    pub quit: bool,
    pub login: LoginForm,
    pub projects: ProjectsPage,
    pub dashboard: DashboardPage,
    pub add: AddExpenseForm,
    pub admin: AdminPage,
}

fn cycle<T: Copy + PartialEq>(order: &[T], current: T, delta: isize) -> T {
    let pos = order.iter().position(|f| *f == current).unwrap_or(0) as isize;
    let len = order.len() as isize;
    order[(pos + delta).rem_euclid(len) as usize]
}

fn move_sel(sel: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0) as isize;
    sel.select(Some((cur + delta).rem_euclid(len as isize) as usize));
}

fn clamp_sel(sel: &mut ListState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (_, None) => sel.select(Some(0)),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        _ => {}
    }
}

/// Feeds an editing key to a text field. Returns false when editing should end.
fn edit_line(field: &mut LineEdit, k: &KeyEvent) -> bool {
    match k.code {
        KeyCode::Char(c) => field.push(c),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.left(),
        KeyCode::Right => field.right(),
        KeyCode::Enter | KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => return false,
        _ => {}
    }
    true
}

impl App {
    pub fn new(rt: Arc<AppRuntime>, currency: impl Into<String>) -> Self {
        Self {
            rt,
            screen: Screen::Loading,
            previous: Screen::Loading,
            notice: None,
            currency: currency.into(),
            quit: false,
            login: LoginForm::default(),
            projects: ProjectsPage::default(),
            dashboard: DashboardPage::default(),
            add: AddExpenseForm::default(),
            admin: AdminPage::default(),
        }
    }

    pub fn scope(&self) -> Option<ProjectId> {
        self.rt.scope.get_scope()
    }

    fn show_error(&mut self, err: &RemoteError) {
        self.notice = Some(Notice::error(err.to_string()));
    }

    /// Surfaces remote failures; disabled and discarded reads stay silent.
    fn absorb<T>(&mut self, result: Result<T, QueryError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) if err.is_silent() => {
                debug!(error = %err, "query skipped");
                None
            }
            Err(QueryError::Remote(err)) => {
                self.show_error(&err);
                None
            }
            Err(_) => None,
        }
    }

    fn unmount_views(&mut self) {
        self.projects.view.unmount();
        self.dashboard.view.unmount();
        self.add.view.unmount();
        self.admin.view.unmount();
    }

    /// Switches screens: the old screen's views stop receiving results and
    /// the new one is mounted and loaded.
    pub async fn enter(&mut self, screen: Screen) {
        self.unmount_views();
        if screen != Screen::Help {
            self.previous = screen;
        }
        self.screen = screen;
        match screen {
            Screen::Loading | Screen::Help => {}
            Screen::Login => {
                self.login = LoginForm::default();
            }
            Screen::Projects => {
                self.projects.view = ViewGuard::mount();
                self.projects.naming = false;
                self.load_projects().await;
            }
            Screen::Main(Tab::Dashboard) => {
                self.dashboard.view = ViewGuard::mount();
                self.rt.apply_recurring_on_load().await;
                self.load_dashboard().await;
            }
            Screen::Main(Tab::AddExpense) => {
                self.add.view = ViewGuard::mount();
                self.add.editing = false;
                self.load_add_expense().await;
            }
            Screen::Main(Tab::Admin) => {
                self.admin.view = ViewGuard::mount();
                self.admin.editing = false;
                self.load_admin().await;
            }
        }
    }

    /// Follows session changes: signed-out users land on Login, signed-in
    /// users leave it.
    pub async fn sync_session(&mut self) {
        match self.rt.session.state() {
            SessionState::Unresolved => {}
            SessionState::Unauthenticated => {
                if self.screen != Screen::Login {
                    self.enter(Screen::Login).await;
                }
            }
            SessionState::Authenticated(_) => {
                if matches!(self.screen, Screen::Login | Screen::Loading) {
                    self.enter(Screen::Main(Tab::Dashboard)).await;
                }
            }
        }
    }

    // ============= Loading =============

    pub async fn load_projects(&mut self) {
        let view = self.projects.view.clone();
        let result = self.rt.my_projects(&view).await;
        if let Some(list) = self.absorb(result) {
            self.projects.list = list;
            let current = self.scope();
            if let Some(pos) = current.and_then(|id| self.projects.list.iter().position(|p| p.id == id)) {
                self.projects.sel.select(Some(pos));
            }
            clamp_sel(&mut self.projects.sel, self.projects.list.len());
        }
    }

    pub async fn load_dashboard(&mut self) {
        if self.scope().is_none() {
            self.dashboard = DashboardPage {
                view: self.dashboard.view.clone(),
                ..DashboardPage::default()
            };
            return;
        }
        let view = self.dashboard.view.clone();
        let period = YearMonth::of(today());
        self.dashboard.period = Some(period);

        let result = self.rt.budget_status(period, &view).await;
        if let Some(budget) = self.absorb(result) {
            self.dashboard.budget = budget;
        }
        let result = self.rt.monthly_summary(period, &view).await;
        if let Some(summary) = self.absorb(result) {
            self.dashboard.summary = summary;
        }
        let result = self.rt.monthly_trend(&view).await;
        if let Some(trend) = self.absorb(result) {
            self.dashboard.trend = trend;
        }
        let result = self.rt.recent_expenses(&view).await;
        if let Some(recent) = self.absorb(result) {
            self.dashboard.recent = recent;
        }
    }

    pub async fn load_add_expense(&mut self) {
        let view = self.add.view.clone();
        let result = self.rt.categories(&view).await;
        if let Some(categories) = self.absorb(result) {
            self.add.categories = categories;
        }
        if self.scope().is_none() {
            self.add.categories.clear();
        }
        clamp_sel(&mut self.add.cat_sel, self.add.categories.len());
    }

    pub async fn load_admin(&mut self) {
        let view = self.admin.view.clone();
        if self.scope().is_none() {
            self.admin.categories.clear();
            self.admin.recurring.clear();
        }
        let result = self.rt.categories(&view).await;
        if let Some(categories) = self.absorb(result) {
            self.admin.categories = categories;
        }
        let result = self.rt.recurring_expenses(&view).await;
        if let Some(recurring) = self.absorb(result) {
            self.admin.recurring = recurring;
        }
        clamp_sel(&mut self.admin.re_cat_sel, self.admin.categories.len());
        clamp_sel(&mut self.admin.rec_sel, self.admin.recurring.len());
    }

    fn is_editing(&self) -> bool {
        match self.screen {
            Screen::Login => self.login.editing,
            Screen::Projects => self.projects.naming,
            Screen::Main(Tab::AddExpense) => self.add.editing,
            Screen::Main(Tab::Admin) => self.admin.editing,
            _ => false,
        }
    }

    // ============= Keys =============

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }
        if self.notice.is_some() {
            if matches!(k.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.notice = None;
            }
            return Ok(());
        }
        if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return Ok(());
        }

        if !self.is_editing() {
            let signed_in = self.rt.session.is_authenticated();
            match k.code {
                KeyCode::Char('q') => {
                    self.quit = true;
                    return Ok(());
                }
                KeyCode::Char('?') if self.screen != Screen::Help => {
                    self.enter(Screen::Help).await;
                    return Ok(());
                }
                KeyCode::Char('1') if signed_in => {
                    self.enter(Screen::Main(Tab::Dashboard)).await;
                    return Ok(());
                }
                KeyCode::Char('2') if signed_in => {
                    self.enter(Screen::Main(Tab::AddExpense)).await;
                    return Ok(());
                }
                KeyCode::Char('3') if signed_in => {
                    self.enter(Screen::Main(Tab::Admin)).await;
                    return Ok(());
                }
                KeyCode::Char('p') if signed_in && self.screen != Screen::Projects => {
                    self.enter(Screen::Projects).await;
                    return Ok(());
                }
                KeyCode::Char('L') if signed_in => {
                    self.rt.sign_out().await;
                    self.sync_session().await;
                    return Ok(());
                }
                _ => {}
            }
        }

        match self.screen {
            Screen::Loading => {}
            Screen::Help => {
                if matches!(k.code, KeyCode::Esc | KeyCode::Char('b')) {
                    let back = self.previous;
                    self.enter(back).await;
                }
            }
            Screen::Login => self.handle_login_key(k).await,
            Screen::Projects => self.handle_projects_key(k).await,
            Screen::Main(Tab::Dashboard) => self.handle_dashboard_key(k).await,
            Screen::Main(Tab::AddExpense) => self.handle_add_key(k).await,
            Screen::Main(Tab::Admin) => self.handle_admin_key(k).await,
        }
        Ok(())
    }

    async fn handle_login_key(&mut self, k: KeyEvent) {
        let order = [LoginField::Email, LoginField::Password, LoginField::Submit];
        if self.login.editing {
            let field = match self.login.focus {
                LoginField::Email => &mut self.login.email,
                LoginField::Password => &mut self.login.password,
                LoginField::Submit => {
                    self.login.editing = false;
                    return;
                }
            };
            if !edit_line(field, &k) {
                self.login.editing = false;
                match k.code {
                    KeyCode::Tab => self.login.focus = cycle(&order, self.login.focus, 1),
                    KeyCode::BackTab => self.login.focus = cycle(&order, self.login.focus, -1),
                    KeyCode::Enter if self.login.focus == LoginField::Password => self.submit_login().await,
                    _ => {}
                }
            }
            return;
        }
        match k.code {
            KeyCode::Tab | KeyCode::Down => self.login.focus = cycle(&order, self.login.focus, 1),
            KeyCode::BackTab | KeyCode::Up => self.login.focus = cycle(&order, self.login.focus, -1),
            KeyCode::Enter => match self.login.focus {
                LoginField::Submit => self.submit_login().await,
                _ => self.login.editing = true,
            },
            _ => {}
        }
    }

    pub async fn submit_login(&mut self) {
        let email = self.login.email.trimmed().to_string();
        let password = self.login.password.value.clone();
        if email.is_empty() || password.is_empty() {
            self.notice = Some(Notice::error("Enter email and password"));
            return;
        }
        match self.rt.sign_in(&email, &password).await {
            Ok(_) => {
                self.login.password.clear();
                self.sync_session().await;
            }
            Err(err) => self.show_error(&err),
        }
    }

    async fn handle_projects_key(&mut self, k: KeyEvent) {
        if self.projects.naming {
            if !edit_line(&mut self.projects.new_name, &k) {
                self.projects.naming = false;
                if k.code == KeyCode::Enter {
                    self.create_project().await;
                }
            }
            return;
        }
        match k.code {
            KeyCode::Up => move_sel(&mut self.projects.sel, self.projects.list.len(), -1),
            KeyCode::Down => move_sel(&mut self.projects.sel, self.projects.list.len(), 1),
            KeyCode::Enter => {
                let chosen = self
                    .projects
                    .sel
                    .selected()
                    .and_then(|i| self.projects.list.get(i))
                    .map(|p| p.id.clone());
                if let Some(id) = chosen {
                    self.rt.select_project(Some(id));
                    self.enter(Screen::Main(Tab::Dashboard)).await;
                }
            }
            KeyCode::Char('x') => {
                self.rt.select_project(None);
            }
            KeyCode::Char('n') => self.projects.naming = true,
            KeyCode::Char('r') => {
                self.rt.queries.invalidate(ResourceKind::Projects, None);
                self.load_projects().await;
            }
            KeyCode::Esc | KeyCode::Char('b') => self.enter(Screen::Main(Tab::Dashboard)).await,
            _ => {}
        }
    }

    pub async fn create_project(&mut self) {
        let name = self.projects.new_name.trimmed().to_string();
        if name.is_empty() {
            return;
        }
        match self.rt.create_project(&name).await {
            Ok(()) => {
                self.projects.new_name.clear();
                self.load_projects().await;
            }
            Err(err) => self.show_error(&err),
        }
    }

    async fn handle_dashboard_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Char('r') => {
                if let Some(scope) = self.scope() {
                    for kind in EXPENSE_KINDS {
                        self.rt.queries.invalidate(kind, Some(&scope));
                    }
                }
                self.load_dashboard().await;
            }
            KeyCode::Char('a') => self.enter(Screen::Main(Tab::AddExpense)).await,
            KeyCode::Enter if self.scope().is_none() => self.enter(Screen::Projects).await,
            _ => {}
        }
    }

    async fn handle_add_key(&mut self, k: KeyEvent) {
        if self.add.editing {
            let field = match self.add.focus {
                AddField::Amount => &mut self.add.amount,
                AddField::Date => &mut self.add.date,
                AddField::Note => &mut self.add.note,
                AddField::Category | AddField::Save => {
                    self.add.editing = false;
                    return;
                }
            };
            if !edit_line(field, &k) {
                self.add.editing = false;
                match k.code {
                    KeyCode::Tab => self.add.focus = cycle(&AddField::ORDER, self.add.focus, 1),
                    KeyCode::BackTab => self.add.focus = cycle(&AddField::ORDER, self.add.focus, -1),
                    _ => {}
                }
            }
            return;
        }
        match k.code {
            KeyCode::Tab => self.add.focus = cycle(&AddField::ORDER, self.add.focus, 1),
            KeyCode::BackTab => self.add.focus = cycle(&AddField::ORDER, self.add.focus, -1),
            KeyCode::Up if self.add.focus == AddField::Category => {
                move_sel(&mut self.add.cat_sel, self.add.categories.len(), -1)
            }
            KeyCode::Down if self.add.focus == AddField::Category => {
                move_sel(&mut self.add.cat_sel, self.add.categories.len(), 1)
            }
            KeyCode::Up => self.add.focus = cycle(&AddField::ORDER, self.add.focus, -1),
            KeyCode::Down => self.add.focus = cycle(&AddField::ORDER, self.add.focus, 1),
            KeyCode::Char('s') => self.submit_expense().await,
            KeyCode::Enter => match self.add.focus {
                AddField::Save => self.submit_expense().await,
                AddField::Category => self.add.focus = AddField::Note,
                _ => self.add.editing = true,
            },
            _ => {}
        }
    }

    /// Validates the form and inserts the expense; input survives failures.
    pub async fn submit_expense(&mut self) {
        let Some(project_id) = self.scope() else {
            self.notice = Some(Notice::error("Pick a project first"));
            return;
        };
        let amount = parse_money(&self.add.amount.value).filter(|d| Money(*d).is_positive());
        let category = self
            .add
            .cat_sel
            .selected()
            .and_then(|i| self.add.categories.get(i))
            .map(|c| c.id.clone());
        let (Some(amount), Some(category_id)) = (amount, category) else {
            self.notice = Some(Notice::error("Enter amount and choose category"));
            return;
        };
        let Some(spent_at) = parse_date(&self.add.date.value) else {
            self.notice = Some(Notice::error("Date must be YYYY-MM-DD"));
            return;
        };
        let expense = NewExpense {
            amount: Money(amount),
            project_id,
            category_id,
            spent_at,
            note: Some(self.add.note.trimmed().to_string()).filter(|n| !n.is_empty()),
        };
        match self.rt.add_expense(&expense).await {
            Ok(()) => {
                self.add.amount.clear();
                self.add.note.clear();
                self.notice = Some(Notice::info("Saved", "Expense added"));
            }
            Err(err) => self.show_error(&err),
        }
    }

    async fn handle_admin_key(&mut self, k: KeyEvent) {
        if self.admin.editing {
            let field = match self.admin.focus {
                AdminField::NewCategory => &mut self.admin.new_category,
                AdminField::Budget => &mut self.admin.budget,
                AdminField::ReAmount => &mut self.admin.re_amount,
                AdminField::ReInterval => &mut self.admin.re_interval,
                AdminField::ReStart => &mut self.admin.re_start,
                AdminField::ReEnd => &mut self.admin.re_end,
                AdminField::ReNote => &mut self.admin.re_note,
                _ => {
                    self.admin.editing = false;
                    return;
                }
            };
            if !edit_line(field, &k) {
                self.admin.editing = false;
                match k.code {
                    KeyCode::Tab => self.admin.focus = cycle(&AdminField::ORDER, self.admin.focus, 1),
                    KeyCode::BackTab => {
                        self.admin.focus = cycle(&AdminField::ORDER, self.admin.focus, -1)
                    }
                    _ => {}
                }
            }
            return;
        }

        let focus = self.admin.focus;
        match k.code {
            KeyCode::Tab => self.admin.focus = cycle(&AdminField::ORDER, focus, 1),
            KeyCode::BackTab => self.admin.focus = cycle(&AdminField::ORDER, focus, -1),
            KeyCode::Up | KeyCode::Down => {
                let delta = if k.code == KeyCode::Up { -1 } else { 1 };
                match focus {
                    AdminField::RecurringList => {
                        move_sel(&mut self.admin.rec_sel, self.admin.recurring.len(), delta)
                    }
                    AdminField::ReCategory => {
                        move_sel(&mut self.admin.re_cat_sel, self.admin.categories.len(), delta)
                    }
                    AdminField::ReCadence => {
                        self.admin.re_cadence = self.admin.re_cadence.cycle(delta as i32)
                    }
                    _ => self.admin.focus = cycle(&AdminField::ORDER, focus, delta),
                }
            }
            KeyCode::Left if focus == AdminField::ReCadence => {
                self.admin.re_cadence = self.admin.re_cadence.cycle(-1)
            }
            KeyCode::Right if focus == AdminField::ReCadence => {
                self.admin.re_cadence = self.admin.re_cadence.cycle(1)
            }
            KeyCode::Char('t') if focus == AdminField::RecurringList => self.toggle_selected_recurring().await,
            KeyCode::Enter => match focus {
                AdminField::AddCategory => self.add_category().await,
                AdminField::SaveBudget => self.save_budget().await,
                AdminField::AddRecurring => self.add_recurring().await,
                AdminField::RecurringList => self.toggle_selected_recurring().await,
                AdminField::ReCategory | AdminField::ReCadence => {
                    self.admin.focus = cycle(&AdminField::ORDER, focus, 1)
                }
                _ => self.admin.editing = true,
            },
            _ => {}
        }
    }

    pub async fn add_category(&mut self) {
        let Some(project) = self.scope() else { return };
        let name = self.admin.new_category.trimmed().to_string();
        if name.is_empty() {
            return;
        }
        match self.rt.add_category(&project, &name).await {
            Ok(()) => {
                self.admin.new_category.clear();
                self.load_admin().await;
            }
            Err(err) => self.show_error(&err),
        }
    }

    pub async fn save_budget(&mut self) {
        let Some(project) = self.scope() else { return };
        if self.admin.budget.is_blank() {
            return;
        }
        let Some(amount) = parse_money(&self.admin.budget.value) else {
            self.notice = Some(Notice::error("Enter a valid budget amount"));
            return;
        };
        let period = YearMonth::of(today());
        match self.rt.set_monthly_budget(&project, period, Money(amount)).await {
            Ok(()) => self.notice = Some(Notice::info("Saved", "Budget updated")),
            Err(err) => self.show_error(&err),
        }
    }

    pub async fn add_recurring(&mut self) {
        let Some(project_id) = self.scope() else {
            self.notice = Some(Notice::error("Select project first"));
            return;
        };
        let amount = parse_money(&self.admin.re_amount.value).filter(|d| Money(*d).is_positive());
        let category = self
            .admin
            .re_cat_sel
            .selected()
            .and_then(|i| self.admin.categories.get(i))
            .map(|c| c.id.clone());
        let (Some(amount), Some(category_id)) = (amount, category) else {
            self.notice = Some(Notice::error("Enter amount and choose category"));
            return;
        };
        let interval_count = self
            .admin
            .re_interval
            .trimmed()
            .parse::<u32>()
            .unwrap_or(1)
            .max(1);
        let Some(start_date) = parse_date(&self.admin.re_start.value) else {
            self.notice = Some(Notice::error("Start date must be YYYY-MM-DD"));
            return;
        };
        let end_date = if self.admin.re_end.is_blank() {
            None
        } else {
            match parse_date(&self.admin.re_end.value) {
                Some(d) => Some(d),
                None => {
                    self.notice = Some(Notice::error("End date must be YYYY-MM-DD"));
                    return;
                }
            }
        };
        let rule = NewRecurringExpense {
            project_id,
            category_id,
            amount: Money(amount),
            cadence: self.admin.re_cadence,
            interval_count,
            start_date,
            end_date,
            note: Some(self.admin.re_note.trimmed().to_string()).filter(|n| !n.is_empty()),
        };
        match self.rt.add_recurring(&rule).await {
            Ok(()) => {
                self.admin.re_amount.clear();
                self.admin.re_note.clear();
                self.notice = Some(Notice::info("Saved", "Recurring rule added"));
                self.load_admin().await;
            }
            Err(err) => self.show_error(&err),
        }
    }

    pub async fn toggle_selected_recurring(&mut self) {
        let Some(project) = self.scope() else { return };
        let Some((id, active)) = self
            .admin
            .rec_sel
            .selected()
            .and_then(|i| self.admin.recurring.get(i))
            .map(|r| (r.id.clone(), r.active))
        else {
            return;
        };
        match self.rt.toggle_recurring(&project, &id, !active).await {
            Ok(()) => self.load_admin().await,
            Err(err) => self.show_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(&AddField::ORDER, AddField::Save, 1), AddField::Amount);
        assert_eq!(cycle(&AddField::ORDER, AddField::Amount, -1), AddField::Save);
    }

    #[test]
    fn selection_clamps_to_list() {
        let mut sel = ListState::default();
        clamp_sel(&mut sel, 3);
        assert_eq!(sel.selected(), Some(0));
        sel.select(Some(7));
        clamp_sel(&mut sel, 3);
        assert_eq!(sel.selected(), Some(2));
        clamp_sel(&mut sel, 0);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn editing_ends_on_enter() {
        let mut field = LineEdit::default();
        assert!(edit_line(&mut field, &KeyEvent::from(KeyCode::Char('4'))));
        assert!(!edit_line(&mut field, &KeyEvent::from(KeyCode::Enter)));
        assert_eq!(field.value, "4");
    }
}
