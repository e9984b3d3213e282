mod support;

use crossterm::event::{KeyCode, KeyEvent};
use serde_json::json;

use shared_expense_tracker::cli::state::{App, NoticeKind, Screen, Tab};
use shared_expense_tracker::error::RemoteError;
use shared_expense_tracker::models::ProjectId;
use support::{started, FakeBackend};

async fn signed_in_app(backend: &std::sync::Arc<FakeBackend>) -> App {
    backend.respond("get_my_projects", json!([{ "id": "p1", "name": "Flat 4B" }]));
    backend.respond("get_project_categories", json!([{ "id": "c1", "name": "Food" }]));
    let rt = started(backend).await;
    let mut app = App::new(rt, "INR");
    app.sync_session().await;
    app
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::from(code)
}

#[tokio::test]
async fn signed_out_start_lands_on_login() {
    let backend = FakeBackend::new();
    let rt = started(&backend).await;
    let mut app = App::new(rt, "INR");

    app.sync_session().await;

    assert_eq!(app.screen, Screen::Login);
    assert_eq!(backend.remote_calls(), 0);
}

#[tokio::test]
async fn login_moves_to_the_dashboard() {
    let backend = FakeBackend::new();
    let rt = started(&backend).await;
    let mut app = App::new(rt, "INR");
    app.sync_session().await;

    app.login.email.set("u1@example.com");
    app.login.password.set("secret");
    app.submit_login().await;

    assert_eq!(app.screen, Screen::Main(Tab::Dashboard));
    assert!(app.login.password.value.is_empty());
    assert_eq!(backend.count("sign_in"), 1);
}

#[tokio::test]
async fn failed_login_shows_the_message() {
    let backend = FakeBackend::new();
    backend.fail("sign_in", RemoteError::api(400, "Invalid login credentials"));
    let rt = started(&backend).await;
    let mut app = App::new(rt, "INR");
    app.sync_session().await;

    app.login.email.set("u1@example.com");
    app.login.password.set("wrong");
    app.submit_login().await;

    assert_eq!(app.screen, Screen::Login);
    let notice = app.notice.as_ref().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.body, "Invalid login credentials");
}

#[tokio::test]
async fn expense_needs_a_project() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.enter(Screen::Main(Tab::AddExpense)).await;

    app.add.amount.set("120");
    app.submit_expense().await;

    assert_eq!(app.notice.as_ref().unwrap().body, "Pick a project first");
    assert!(backend.inserted().is_empty());
}

#[tokio::test]
async fn expense_needs_amount_and_category() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.rt.select_project(Some(ProjectId::new("p1")));
    app.enter(Screen::Main(Tab::AddExpense)).await;

    app.add.amount.set("-5");
    app.submit_expense().await;

    assert_eq!(
        app.notice.as_ref().unwrap().body,
        "Enter amount and choose category"
    );
    assert_eq!(backend.count("insert:expenses"), 0);
}

#[tokio::test]
async fn failed_expense_keeps_the_form() {
    let backend = FakeBackend::signed_in("u1");
    backend.fail("insert:expenses", RemoteError::api(403, "not a member of this project"));
    let mut app = signed_in_app(&backend).await;
    app.rt.select_project(Some(ProjectId::new("p1")));
    app.enter(Screen::Main(Tab::AddExpense)).await;
    assert_eq!(app.add.cat_sel.selected(), Some(0));

    app.add.amount.set("250");
    app.add.note.set("lunch");
    app.submit_expense().await;

    let notice = app.notice.as_ref().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.body, "not a member of this project");
    assert_eq!(app.add.amount.value, "250");
    assert_eq!(app.add.note.value, "lunch");
}

#[tokio::test]
async fn saved_expense_resets_amount_and_note() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.rt.select_project(Some(ProjectId::new("p1")));
    app.enter(Screen::Main(Tab::AddExpense)).await;

    app.add.amount.set("99.50");
    app.add.note.set("chai");
    app.submit_expense().await;

    assert_eq!(app.notice.as_ref().unwrap().body, "Expense added");
    assert!(app.add.amount.value.is_empty());
    assert!(app.add.note.value.is_empty());
    let (_, row) = &backend.inserted()[0];
    assert_eq!(row["category_id"], json!("c1"));
    assert_eq!(row["note"], json!("chai"));
}

#[tokio::test]
async fn failed_category_keeps_its_name() {
    let backend = FakeBackend::signed_in("u1");
    backend.fail("add_project_category", RemoteError::api(409, "category already exists"));
    let mut app = signed_in_app(&backend).await;
    app.rt.select_project(Some(ProjectId::new("p1")));
    app.enter(Screen::Main(Tab::Admin)).await;

    app.admin.new_category.set("Food");
    app.add_category().await;

    assert_eq!(app.admin.new_category.value, "Food");
    assert_eq!(app.notice.as_ref().unwrap().body, "category already exists");
}

#[tokio::test]
async fn recurring_rule_needs_a_project() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.enter(Screen::Main(Tab::Admin)).await;

    app.add_recurring().await;

    assert_eq!(app.notice.as_ref().unwrap().body, "Select project first");
    assert_eq!(backend.count("add_recurring_expense"), 0);
}

#[tokio::test]
async fn picking_a_project_applies_recurring_and_loads_the_dashboard() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;

    app.handle_key(press(KeyCode::Char('p'))).await.unwrap();
    assert_eq!(app.screen, Screen::Projects);
    assert_eq!(app.projects.list.len(), 1);

    app.handle_key(press(KeyCode::Enter)).await.unwrap();

    assert_eq!(app.screen, Screen::Main(Tab::Dashboard));
    assert_eq!(app.scope(), Some(ProjectId::new("p1")));
    assert_eq!(backend.count("apply_recurring_expenses"), 1);
    assert_eq!(backend.count("get_monthly_summary"), 1);
    assert_eq!(backend.count("select:expenses_view"), 1);
}

#[tokio::test]
async fn logout_key_returns_to_login_and_forgets_the_project() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.rt.select_project(Some(ProjectId::new("p1")));

    app.handle_key(press(KeyCode::Char('L'))).await.unwrap();

    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.scope(), None);
    assert!(app.rt.queries.is_empty());
}

#[tokio::test]
async fn notice_blocks_other_keys_until_dismissed() {
    let backend = FakeBackend::signed_in("u1");
    let mut app = signed_in_app(&backend).await;
    app.enter(Screen::Main(Tab::AddExpense)).await;
    app.submit_expense().await;
    assert!(app.notice.is_some());

    app.handle_key(press(KeyCode::Char('3'))).await.unwrap();
    assert_eq!(app.screen, Screen::Main(Tab::AddExpense));

    app.handle_key(press(KeyCode::Enter)).await.unwrap();
    assert!(app.notice.is_none());
}
