use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        BarChart, Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Sparkline,
        Table, Tabs, Wrap,
    },
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::cli::input::LineEdit;
use crate::cli::state::{AddField, AdminField, App, LoginField, NoticeKind, Screen, Tab};
use crate::cli::util::format_currency;
use crate::models::Cadence;

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // header | main content | status line
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
        .split(size);

    draw_header(f, root[0], app);

    match app.screen {
        Screen::Loading => draw_loading(f, root[1]),
        Screen::Login => draw_login(f, root[1], app),
        Screen::Projects => draw_projects(f, root[1], app),
        Screen::Main(Tab::Dashboard) => draw_dashboard(f, root[1], app),
        Screen::Main(Tab::AddExpense) => draw_add_expense(f, root[1], app),
        Screen::Main(Tab::Admin) => draw_admin(f, root[1], app),
        Screen::Help => draw_help(f, root[1]),
    }

    let status = Paragraph::new(status_line(app)).style(Style::default().fg(Color::DarkGray));
    f.render_widget(status, root[2]);

    if let Some(notice) = &app.notice {
        let area = center_rect(root[1], 56, 7);
        f.render_widget(Clear, area);
        let color = match notice.kind {
            NoticeKind::Info => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        let p = Paragraph::new(format!("{}\n\n[Enter] OK", notice.body))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title(notice.title.as_str()),
            );
        f.render_widget(p, area);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let title = match app.scope() {
        Some(id) => {
            let name = app
                .projects
                .list
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string());
            format!("Shared Expenses | {name}")
        }
        None => "Shared Expenses".to_string(),
    };
    let titles = ["Dashboard", "Add Expense", "Admin"]
        .into_iter()
        .map(|t| Line::from(Span::raw(t)))
        .collect::<Vec<_>>();
    let selected = match app.screen {
        Screen::Main(Tab::Dashboard) => Some(0),
        Screen::Main(Tab::AddExpense) => Some(1),
        Screen::Main(Tab::Admin) => Some(2),
        _ => None,
    };
    let mut tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    if let Some(i) = selected {
        tabs = tabs.select(i);
    }
    f.render_widget(tabs, area);
}

fn status_line(app: &App) -> String {
    match app.screen {
        Screen::Loading => "Restoring session…".into(),
        Screen::Login => "Tab: next field | Enter: edit/submit | q: quit".into(),
        _ => "1/2/3: tabs | p: projects | L: logout | ?: help | q: quit".into(),
    }
}

fn draw_loading(f: &mut Frame, area: Rect) {
    let p = Paragraph::new("Loading…").block(Block::default().borders(Borders::ALL));
    f.render_widget(p, center_rect(area, 30, 3));
}

fn marker(editing: bool, focused: bool) -> &'static str {
    match (focused, editing) {
        (true, true) => "  <editing>",
        (true, false) => "  <",
        _ => "",
    }
}

fn field_line(label: &str, field: &LineEdit, focused: bool, editing: bool) -> String {
    format!("{label:<10}: {}{}", field.rendered(), marker(editing, focused))
}

fn button(label: &str, focused: bool) -> String {
    if focused {
        format!("[ {label} ]  <")
    } else {
        format!("[ {label} ]")
    }
}

// Login

fn draw_login(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.login;
    let lines = [
        field_line("Email", &form.email, form.focus == LoginField::Email, form.editing),
        field_line("Password", &form.password, form.focus == LoginField::Password, form.editing),
        String::new(),
        button("Sign in", form.focus == LoginField::Submit),
    ]
    .join("\n");
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Sign in"));
    f.render_widget(p, center_rect(area, 60, 8));
}

// Projects

fn draw_projects(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    let current = app.scope();
    let items: Vec<ListItem> = app
        .projects
        .list
        .iter()
        .map(|p| {
            let mut spans = vec![Span::raw(p.name.clone())];
            if current.as_ref() == Some(&p.id) {
                spans.push(Span::styled("  (Selected)", Style::default().fg(Color::Green)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let title = if app.projects.list.is_empty() {
        "Projects  (none yet, n=new)"
    } else {
        "Projects  (Up/Down, Enter=select, x=clear, n=new, r=refresh)"
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, rows[0], &mut app.projects.sel);

    let name = Paragraph::new(format!(
        "{}{}",
        app.projects.new_name.rendered(),
        if app.projects.naming { "  <editing>" } else { "" }
    ))
    .block(Block::default().borders(Borders::ALL).title("New project name"));
    f.render_widget(name, rows[1]);
}

// Dashboard

fn to_bar(d: Decimal) -> u64 {
    d.round().to_u64().unwrap_or(0)
}

fn draw_dashboard(f: &mut Frame, area: Rect, app: &App) {
    if app.scope().is_none() {
        let p = Paragraph::new("No project selected.\n\nPress Enter or p to pick a project.")
            .block(Block::default().borders(Borders::ALL).title("Dashboard"));
        f.render_widget(p, area);
        return;
    }
    let dash = &app.dashboard;
    let currency = app.currency.as_str();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let period = dash
        .period
        .map(|p| format!("{}-{:02}", p.year, p.month))
        .unwrap_or_default();
    let budget = &dash.budget;
    let label = format!(
        "{} of {} spent ({:.0}%), {} left",
        format_currency(budget.spent.0, currency),
        format_currency(budget.budget.0, currency),
        budget.pct,
        format_currency(budget.remaining.0, currency),
    );
    let gauge_color = if budget.pct >= 100.0 { Color::Red } else { Color::Cyan };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(format!("Budget {period}")))
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(budget.ratio())
        .label(label);
    f.render_widget(gauge, top[0]);

    let trend: Vec<u64> = dash.trend.iter().map(|t| to_bar(t.total.0)).collect();
    let trend_title = match dash.trend.last() {
        Some(last) => format!("Trend ({} mo, latest {})", dash.trend.len(), format_currency(last.total.0, currency)),
        None => "Trend".to_string(),
    };
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(trend_title))
        .data(&trend)
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(spark, top[1]);

    let bars: Vec<(&str, u64)> = dash
        .summary
        .iter()
        .map(|c| (c.category.as_str(), to_bar(c.total.0)))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("By category"))
        .data(bars.as_slice())
        .bar_width(7)
        .bar_gap(1);
    f.render_widget(chart, bottom[0]);

    let header = Row::new(vec!["Date", "Category", "Note", "Amount"]).height(1);
    let body: Vec<Row> = dash
        .recent
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(e.spent_at.to_string()),
                Cell::from(e.category_name.clone().unwrap_or_else(|| "-".into())),
                Cell::from(e.note.clone().unwrap_or_default()),
                Cell::from(format_currency(e.amount.0, currency)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(11),
        Constraint::Length(14),
        Constraint::Min(6),
        Constraint::Length(14),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent expenses  (r=refresh, a=add)"));
    f.render_widget(table, bottom[1]);
}

// Add Expense

fn draw_add_expense(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let form = &app.add;
    let selected_name = form
        .cat_sel
        .selected()
        .and_then(|i| form.categories.get(i))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "<none>".into());
    let cat_focused = form.focus == AddField::Category;

    let lines = [
        field_line("Amount", &form.amount, form.focus == AddField::Amount, form.editing),
        field_line("Date", &form.date, form.focus == AddField::Date, form.editing),
        format!(
            "{:<10}: {}{}",
            "Category",
            selected_name,
            if cat_focused { "  < (Up/Down)" } else { "" }
        ),
        field_line("Note", &form.note, form.focus == AddField::Note, form.editing),
        String::new(),
        button("Save", form.focus == AddField::Save),
        String::new(),
        "Tab: next field | Enter: edit | s: save".into(),
    ]
    .join("\n");
    let title = if app.scope().is_none() {
        "Add Expense (no project selected)"
    } else {
        "Add Expense"
    };
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, cols[0]);

    let items: Vec<ListItem> = app
        .add
        .categories
        .iter()
        .map(|c| ListItem::new(Line::from(c.name.clone())))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Categories"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, cols[1], &mut app.add.cat_sel);
}

// Admin

fn cadence_line(current: Cadence, focused: bool) -> String {
    let options = Cadence::ALL
        .iter()
        .map(|c| {
            if *c == current {
                format!("({c})")
            } else {
                c.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:<10}: {}{}", "Cadence", options, if focused { "  < (Left/Right)" } else { "" })
}

fn draw_admin(f: &mut Frame, area: Rect, app: &App) {
    if app.scope().is_none() {
        let p = Paragraph::new("Select project first (press p).")
            .block(Block::default().borders(Borders::ALL).title("Admin"));
        f.render_widget(p, area);
        return;
    }
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(6)])
        .split(cols[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(12)])
        .split(cols[1]);

    let currency = app.currency.clone();
    let page = &app.admin;
    let focus = page.focus;
    let editing = page.editing;

    let re_cat = page.re_cat_sel.selected();
    let cats: Vec<ListItem> = page
        .categories
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mark = if Some(i) == re_cat { "* " } else { "  " };
            ListItem::new(Line::from(format!("{mark}{}", c.name)))
        })
        .collect();
    let cat_title = if focus == AdminField::ReCategory {
        "Categories  (Up/Down picks recurring category) <"
    } else {
        "Categories"
    };
    f.render_widget(
        List::new(cats).block(Block::default().borders(Borders::ALL).title(cat_title)),
        left[0],
    );

    let cat_form = [
        field_line("New", &page.new_category, focus == AdminField::NewCategory, editing),
        button("Add category", focus == AdminField::AddCategory),
        field_line("Budget", &page.budget, focus == AdminField::Budget, editing),
        button("Save budget", focus == AdminField::SaveBudget),
    ]
    .join("\n");
    f.render_widget(
        Paragraph::new(cat_form).block(Block::default().borders(Borders::ALL).title("Categories & budget")),
        left[1],
    );

    let header = Row::new(vec!["Category", "Amount", "Every", "Next from", "Status"]).height(1);
    let body: Vec<Row> = page
        .recurring
        .iter()
        .map(|r| {
            let every = if r.interval_count > 1 {
                format!("{} {}", r.interval_count, r.cadence)
            } else {
                r.cadence.to_string()
            };
            Row::new(vec![
                Cell::from(r.category_name.clone().unwrap_or_else(|| "-".into())),
                Cell::from(format_currency(r.amount.0, &currency)),
                Cell::from(every),
                Cell::from(
                    r.last_applied_on
                        .unwrap_or(r.start_date)
                        .to_string(),
                ),
                Cell::from(if r.active { "active" } else { "paused" }),
            ])
        })
        .collect();
    let widths = [
        Constraint::Min(8),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(7),
    ];
    let list_title = if focus == AdminField::RecurringList {
        "Recurring  (Up/Down, t/Enter=pause/resume) <"
    } else {
        "Recurring"
    };
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut sel = ratatui::widgets::TableState::default();
    sel.select(page.rec_sel.selected());
    f.render_stateful_widget(table, right[0], &mut sel);

    let re_form = [
        field_line("Amount", &page.re_amount, focus == AdminField::ReAmount, editing),
        format!(
            "{:<10}: {}",
            "Category",
            re_cat
                .and_then(|i| page.categories.get(i))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "<none>".into())
        ),
        cadence_line(page.re_cadence, focus == AdminField::ReCadence),
        field_line("Interval", &page.re_interval, focus == AdminField::ReInterval, editing),
        field_line("Start", &page.re_start, focus == AdminField::ReStart, editing),
        field_line("End", &page.re_end, focus == AdminField::ReEnd, editing),
        field_line("Note", &page.re_note, focus == AdminField::ReNote, editing),
        button("Add recurring", focus == AdminField::AddRecurring),
    ]
    .join("\n");
    f.render_widget(
        Paragraph::new(re_form).block(Block::default().borders(Borders::ALL).title("New recurring rule")),
        right[1],
    );
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help_text = [
        "Global Keys:",
        "  q        : Quit",
        "  ?        : This help (Esc/b to go back)",
        "  1 / 2 / 3: Dashboard / Add Expense / Admin",
        "  p        : Projects",
        "  L        : Sign out",
        "",
        "Projects:",
        "  Up/Down  : Navigate list",
        "  Enter    : Select project",
        "  x        : Clear selection",
        "  n        : Name a new project (Enter creates)",
        "  r        : Refresh",
        "",
        "Dashboard:",
        "  r        : Refresh",
        "  a        : Add expense",
        "",
        "Add Expense / Admin:",
        "  Tab      : Cycle through fields",
        "  Enter    : Edit field / press button",
        "  Esc      : Stop editing",
        "  Up/Down  : Choose category, cadence or recurring rule",
        "  s        : Save expense",
        "  t        : Pause/resume selected recurring rule",
    ]
    .join("\n");

    let p = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help & Keybindings"));
    f.render_widget(p, area);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
