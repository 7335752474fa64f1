mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use common::{add_account, app, resolved, PASSWORD};
use pestgo_web::services::MockBackend;
use pestgo_web::session::SessionPhase;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    session.shutdown();
}

#[tokio::test]
async fn protected_page_redirects_to_sign_in_when_absent() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    for path in ["/", "/customers", "/visits", "/settings", "/reports"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), "/auth/signin");
    }

    let response = send(&app, get("/auth/signin")).await;
    assert_eq!(response.status(), StatusCode::OK);
    session.shutdown();
}

#[tokio::test]
async fn loading_page_is_served_while_resolving() {
    let backend = Arc::new(MockBackend::new());
    backend.hang_session_lookup(true);
    let (app, session) = app(&backend).await;

    let response = send(&app, get("/customers")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("http-equiv=\"refresh\""));
    session.shutdown();
}

#[tokio::test]
async fn unmatched_paths_redirect_home() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let response = send(&app, get("/does/not/exist")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session.shutdown();
}

#[tokio::test]
async fn signed_in_user_is_kept_off_public_pages() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    backend.restore_session_for("firm@example.com").unwrap();
    let (app, session) = app(&backend).await;
    assert_eq!(resolved(&session).await.phase(), SessionPhase::SignedIn);

    for path in ["/auth/signin", "/auth/signup"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    for path in ["/", "/customers", "/visits", "/settings", "/warehouse"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
    }
    session.shutdown();
}

#[tokio::test]
async fn sign_in_form_flow() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let response = send(
        &app,
        post_form("/auth/signin", "email=firm%40example.com&password=wrong"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(session.state().identity.is_none());

    let form = format!("email=firm%40example.com&password={}", PASSWORD);
    let response = send(&app, post_form("/auth/signin", &form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(session.state().phase(), SessionPhase::SignedIn);

    let response = send(&app, post_form("/auth/signout", "")).await;
    assert_eq!(location(&response), "/auth/signin");
    assert!(session.state().identity.is_none());
    session.shutdown();
}

#[tokio::test]
async fn sign_up_form_validates_and_creates_profile() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let mismatch = "full_name=Ada&email=ada%40example.com&password=secret123&confirm_password=secret124";
    let response = send(&app, post_form("/auth/signup", mismatch)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let admin = "full_name=Ada&email=ada%40example.com&password=secret123&confirm_password=secret123&role=admin";
    let response = send(&app, post_form("/auth/signup", admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(backend.rows("profiles").is_empty());

    let valid = "full_name=Ada&email=ada%40example.com&password=secret123&confirm_password=secret123&role=company";
    let response = send(&app, post_form("/auth/signup", valid)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin?registered=1");

    let profiles = backend.rows("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["role"], "company");
    session.shutdown();
}

#[tokio::test]
async fn only_managers_may_create_customers() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "op@example.com", "operator", None);
    backend.restore_session_for("op@example.com").unwrap();
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let response = send(&app, post_form("/customers", "company_name=Acme")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(backend.rows("customers").is_empty());
    session.shutdown();
}

#[tokio::test]
async fn company_creates_and_deletes_customer() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    backend.restore_session_for("firm@example.com").unwrap();
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let response = send(
        &app,
        post_form("/customers", "company_name=Acme+Gida&address=Kadikoy"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/customers");

    let rows = backend.rows("customers");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["created_by_company_id"], "co-1");

    let listed = body_text(send(&app, get("/customers?q=acme")).await).await;
    assert!(listed.contains("Acme Gida"));

    let id = rows[0]["id"].as_str().unwrap().to_string();
    let response = send(&app, post_form(&format!("/customers/{}/delete", id), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(backend.rows("customers").is_empty());
    session.shutdown();
}

#[tokio::test]
async fn pages_carry_security_headers() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let response = send(&app, get("/auth/signin")).await;
    let headers = response.headers();
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert!(headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
    session.shutdown();
}

#[tokio::test]
async fn language_switch_changes_rendered_text() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let turkish = body_text(send(&app, get("/auth/signin")).await).await;
    assert!(turkish.contains("Giriş Yap"));

    let response = send(
        &app,
        post_form("/language", "language=en&return_to=%2Fauth%2Fsignin"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin");

    let english = body_text(send(&app, get("/auth/signin")).await).await;
    assert!(english.contains("Sign In"));

    let response = send(&app, post_form("/language", "language=de")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    session.shutdown();
}

#[tokio::test]
async fn form_submissions_wait_out_resolution() {
    let backend = Arc::new(MockBackend::new());
    backend.hang_session_lookup(true);
    let (app, session) = app(&backend).await;

    let response = send(&app, post_form("/customers", "company_name=Acme")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    assert!(backend.rows("customers").is_empty());
    session.shutdown();
}

#[tokio::test]
async fn language_switch_refuses_foreign_return_paths() {
    let backend = Arc::new(MockBackend::new());
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    for target in ["%2F%5Cevil.example", "%2F%2Fevil.example", "https%3A%2F%2Fevil.example"] {
        let form = format!("language=en&return_to={}", target);
        let response = send(&app, post_form("/language", &form)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/", "{}", target);
    }
    session.shutdown();
}

#[tokio::test]
async fn company_edits_customer() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    backend.seed(
        "customers",
        vec![
            json!({"id": "c1", "company_name": "Acme", "address": "Kadikoy", "created_by_company_id": "co-1"}),
            json!({"id": "c2", "company_name": "Rival", "created_by_company_id": "co-2"}),
        ],
    );
    backend.restore_session_for("firm@example.com").unwrap();
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let form = "company_name=Acme+Gida&address=&latitude=41%2C02&longitude=29.01";
    let response = send(&app, post_form("/customers/c1", form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/customers");

    let rows = backend.rows("customers");
    let edited = rows.iter().find(|row| row["id"] == "c1").unwrap();
    assert_eq!(edited["company_name"], "Acme Gida");
    assert!(edited["address"].is_null());
    assert_eq!(edited["latitude"], 41.02);
    assert_eq!(edited["longitude"], 29.01);

    let response = send(&app, post_form("/customers/c2", "company_name=Taken")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let untouched = backend.rows("customers");
    assert_eq!(untouched.iter().find(|row| row["id"] == "c2").unwrap()["company_name"], "Rival");

    let response = send(&app, post_form("/customers/c1", "company_name=Acme&latitude=120")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    session.shutdown();
}

#[tokio::test]
async fn company_manages_visits() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    backend.seed(
        "customers",
        vec![json!({"id": "c1", "company_name": "Acme Gida", "address": "Kadikoy", "created_by_company_id": "co-1"})],
    );
    backend.restore_session_for("firm@example.com").unwrap();
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let form = "customer_id=c1&visit_date=2024-06-01&start_time=09%3A30&end_time=&visit_type=Kontrol&status=planned&notes=Mutfak";
    let response = send(&app, post_form("/visits", form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/visits");

    let rows = backend.rows("visits");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["created_by_company_id"], "co-1");
    assert_eq!(rows[0]["status"], "planned");

    let listed = body_text(send(&app, get("/visits")).await).await;
    assert!(listed.contains("Acme Gida"));
    assert!(listed.contains("Mutfak"));

    let id = rows[0]["id"].as_str().unwrap().to_string();
    let update = "customer_id=c1&visit_date=2024-06-02&status=completed&notes=";
    let response = send(&app, post_form(&format!("/visits/{}", id), update)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let rows = backend.rows("visits");
    assert_eq!(rows[0]["visit_date"], "2024-06-02");
    assert_eq!(rows[0]["status"], "completed");
    assert!(rows[0]["notes"].is_null());

    let response = send(&app, post_form(&format!("/visits/{}/delete", id), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(backend.rows("visits").is_empty());
    session.shutdown();
}

#[tokio::test]
async fn visits_reject_foreign_customers_and_operators() {
    let backend = Arc::new(MockBackend::new());
    add_account(&backend, "firm@example.com", "company", Some("co-1"));
    add_account(&backend, "op@example.com", "operator", None);
    backend.seed(
        "customers",
        vec![json!({"id": "c2", "company_name": "Rival", "created_by_company_id": "co-2"})],
    );
    backend.restore_session_for("firm@example.com").unwrap();
    let (app, session) = app(&backend).await;
    resolved(&session).await;

    let form = "customer_id=c2&visit_date=2024-06-01&status=planned";
    let response = send(&app, post_form("/visits", form)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(backend.rows("visits").is_empty());
    session.shutdown();

    backend.restore_session_for("op@example.com").unwrap();
    let (app, session) = common::app(&backend).await;
    resolved(&session).await;

    let response = send(&app, post_form("/visits", form)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = send(&app, post_form("/visits/v1/delete", "")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    session.shutdown();
}
