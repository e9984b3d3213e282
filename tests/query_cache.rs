mod support;

use serde_json::json;

use shared_expense_tracker::api::Read;
use shared_expense_tracker::error::{DisabledReason, QueryError, RemoteError};
use shared_expense_tracker::models::{ProjectId, YearMonth};
use shared_expense_tracker::query::ViewGuard;
use support::{runtime, started, FakeBackend};

const MARCH: YearMonth = YearMonth { year: 2025, month: 3 };

fn p(id: &str) -> ProjectId {
    ProjectId::new(id)
}

#[tokio::test]
async fn nothing_is_fetched_before_the_session_resolves() {
    let backend = FakeBackend::signed_in("u1");
    let rt = runtime(&backend);
    let view = ViewGuard::mount();

    let projects = rt.my_projects(&view).await;
    rt.select_project(Some(p("p1")));
    let categories = rt.categories(&view).await;

    assert_eq!(projects, Err(QueryError::Disabled(DisabledReason::SessionUnresolved)));
    assert_eq!(categories, Err(QueryError::Disabled(DisabledReason::SessionUnresolved)));
    assert_eq!(backend.remote_calls(), 0);
    assert!(rt.queries.is_empty());
}

#[tokio::test]
async fn signed_out_reads_are_disabled() {
    let backend = FakeBackend::new();
    let rt = started(&backend).await;

    let result = rt.my_projects(&ViewGuard::mount()).await;

    assert_eq!(result, Err(QueryError::Disabled(DisabledReason::SignedOut)));
    assert_eq!(backend.remote_calls(), 0);
}

#[tokio::test]
async fn scoped_reads_wait_for_a_project() {
    let backend = FakeBackend::signed_in("u1");
    let rt = started(&backend).await;
    let view = ViewGuard::mount();

    assert_eq!(
        rt.recent_expenses(&view).await,
        Err(QueryError::Disabled(DisabledReason::NoScope))
    );
    assert!(rt.my_projects(&view).await.is_ok());
    assert_eq!(backend.calls(), vec!["get_session", "get_my_projects"]);
}

#[tokio::test]
async fn cached_reads_do_not_refetch() {
    let backend = FakeBackend::signed_in("u1");
    backend.respond("get_project_categories", json!([{ "id": "c1", "name": "Food" }]));
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let first = rt.categories(&view).await.unwrap();
    let second = rt.categories(&view).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].name, "Food");
    assert_eq!(backend.count("get_project_categories"), 1);
    assert!(rt.queries.contains(&Read::Categories(p("p1")).key()));
}

#[tokio::test]
async fn concurrent_reads_share_one_request() {
    let backend = FakeBackend::signed_in("u1");
    backend.respond("get_project_categories", json!([{ "id": "c1", "name": "Food" }]));
    backend.hold("get_project_categories");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let (a, b, ()) = tokio::join!(rt.categories(&view), rt.categories(&view), async {
        backend.wait_for_call("get_project_categories").await;
        backend.release(1);
    });

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.count("get_project_categories"), 1);
}

#[tokio::test]
async fn concurrent_reads_share_one_failure() {
    let backend = FakeBackend::signed_in("u1");
    backend.fail("get_project_categories", RemoteError::network("offline"));
    backend.hold("get_project_categories");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let (a, b, ()) = tokio::join!(rt.categories(&view), rt.categories(&view), async {
        backend.wait_for_call("get_project_categories").await;
        backend.release(1);
    });

    let offline = Err(QueryError::Remote(RemoteError::network("offline")));
    assert_eq!(a, offline);
    assert_eq!(b, offline);
    assert_eq!(backend.count("get_project_categories"), 1);
    assert!(rt.queries.is_empty());
}

#[tokio::test]
async fn result_is_dropped_when_scope_clears_mid_flight() {
    let backend = FakeBackend::signed_in("u1");
    backend.respond("get_monthly_summary", json!([{ "category": "Food", "total": 120 }]));
    backend.hold("get_monthly_summary");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let (summary, ()) = tokio::join!(rt.monthly_summary(MARCH, &view), async {
        backend.wait_for_call("get_monthly_summary").await;
        rt.select_project(None);
        backend.release(1);
    });

    assert_eq!(summary, Err(QueryError::Discarded));
    assert!(rt.queries.is_empty());
}

#[tokio::test]
async fn result_is_dropped_when_scope_switches_mid_flight() {
    let backend = FakeBackend::signed_in("u1");
    backend.hold("get_recurring_expenses");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let (recurring, ()) = tokio::join!(rt.recurring_expenses(&view), async {
        backend.wait_for_call("get_recurring_expenses").await;
        rt.select_project(Some(p("p2")));
        backend.release(1);
    });

    assert_eq!(recurring, Err(QueryError::Discarded));
    assert!(!rt.queries.contains(&Read::Recurring(p("p1")).key()));
    assert!(!rt.queries.contains(&Read::Recurring(p("p2")).key()));
}

#[tokio::test]
async fn result_is_dropped_when_invalidated_mid_flight() {
    let backend = FakeBackend::signed_in("u1");
    backend.hold("get_monthly_summary");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));
    let view = ViewGuard::mount();

    let (summary, ()) = tokio::join!(rt.monthly_summary(MARCH, &view), async {
        backend.wait_for_call("get_monthly_summary").await;
        rt.queries
            .invalidate(shared_expense_tracker::query::ResourceKind::Summary, Some(&p("p1")));
        backend.release(1);
    });

    assert_eq!(summary, Err(QueryError::Discarded));
    assert!(!rt.queries.contains(&Read::MonthlySummary(p("p1"), MARCH).key()));
}

#[tokio::test]
async fn unmounted_view_gets_nothing_but_cache_is_filled() {
    let backend = FakeBackend::signed_in("u1");
    backend.hold("get_my_projects");
    let rt = started(&backend).await;
    let view = ViewGuard::mount();

    let (projects, ()) = tokio::join!(rt.my_projects(&view), async {
        backend.wait_for_call("get_my_projects").await;
        view.unmount();
        backend.release(1);
    });

    assert_eq!(projects, Err(QueryError::Discarded));
    assert!(rt.queries.contains(&Read::MyProjects.key()));
}

#[tokio::test]
async fn failed_reads_are_not_cached() {
    let backend = FakeBackend::signed_in("u1");
    backend.fail("get_my_projects", RemoteError::network("offline"));
    let rt = started(&backend).await;
    let view = ViewGuard::mount();

    let failed = rt.my_projects(&view).await;
    assert_eq!(failed, Err(QueryError::Remote(RemoteError::network("offline"))));
    assert!(!failed.unwrap_err().is_silent());
    assert!(rt.queries.is_empty());

    backend.succeed("get_my_projects");
    backend.respond("get_my_projects", json!([{ "id": "p1", "name": "Flat 4B" }]));
    let projects = rt.my_projects(&view).await.unwrap();
    assert_eq!(projects[0].id, p("p1"));
    assert_eq!(backend.count("get_my_projects"), 2);
}

#[tokio::test]
async fn missing_budget_reads_as_zero() {
    let backend = FakeBackend::signed_in("u1");
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));

    let status = rt.budget_status(MARCH, &ViewGuard::mount()).await.unwrap();

    assert!(!status.budget.is_positive());
    assert_eq!(status.ratio(), 0.0);
}

#[tokio::test]
async fn budget_row_is_decoded() {
    let backend = FakeBackend::signed_in("u1");
    backend.respond(
        "get_budget_status",
        json!([{ "budget": 1000, "spent": 250, "remaining": 750, "pct": 25.0 }]),
    );
    let rt = started(&backend).await;
    rt.select_project(Some(p("p1")));

    let status = rt.budget_status(MARCH, &ViewGuard::mount()).await.unwrap();

    assert!(status.remaining.is_positive());
    assert_eq!(status.ratio(), 0.25);
}
