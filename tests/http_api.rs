use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use apartment_billing::auth::SqlIdentityProvider;
use apartment_billing::backend::{router, AppState};
use apartment_billing::database::db::{connection, migrate};
use apartment_billing::database::RecordStore;

async fn app() -> Router {
    let pool = connection::in_memory_pool().await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let identity = SqlIdentityProvider::new(pool.clone());
    identity.create_admin("admin@example.com", "pw").await.unwrap();
    router(AppState::new(RecordStore::new(pool), Arc::new(identity)))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"email": "admin@example.com", "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

fn payment_body(apartment: &str, description: &str) -> Value {
    json!({
        "apartment": apartment,
        "amount": "100",
        "date": "2024-01-05",
        "description": description,
        "status": "unpaid",
    })
}

#[tokio::test]
async fn health_check_answers() {
    let response = app().await.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Backend is running");
}

#[tokio::test]
async fn bad_login_returns_the_localized_message() {
    let response = app()
        .await
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"email": "admin@example.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_credentials");
    assert_eq!(body["error"]["message"], "خطأ في اسم المستخدم أو كلمة المرور");
}

#[tokio::test]
async fn mutations_require_a_session() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(json_request("POST", "/payments", None, payment_body("101", "January-2024")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/expenses", Some("Bearer nope"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_callers_only_see_one_apartment() {
    let app = app().await;
    let token = login(&app).await;
    for apartment in ["101", "102"] {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/payments",
                Some(&token),
                payment_body(apartment, "January-2024"),
            ))
            .await
            .unwrap();
    }

    for uri in ["/payments", "/payments?q=10", "/payments?apartment=%20", "/payments?description=January-2024"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app.clone().oneshot(get("/payments?apartment=101", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let id = listed[0]["id"].as_i64().unwrap();

    let response = app.clone().oneshot(get(&format!("/payments/{id}/invoice"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get(&format!("/payments/{id}/invoice"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
}

#[tokio::test]
async fn payments_can_be_created_filtered_and_deleted() {
    let app = app().await;
    let token = login(&app).await;

    for apartment in ["101", "102", "201"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/payments",
                Some(&token),
                payment_body(apartment, "January-2024"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.clone().oneshot(get("/payments?q=10", Some(&token))).await.unwrap();
    let listed = body_json(response).await;
    let apartments: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["apartment"].as_str().unwrap())
        .collect();
    assert_eq!(apartments, vec!["102", "101"]);

    let response = app.clone().oneshot(get("/payments?apartment=201", None)).await.unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let id = listed[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &format!("/payments/{id}"), Some(&token), json!({"status": "paid"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "paid");
    assert_eq!(updated["apartment"], "201");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/payments/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let again = Request::builder()
        .method("DELETE")
        .uri(format!("/payments/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(again).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn monthly_generation_is_idempotent() {
    let app = app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/payments/generate", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await;
    assert_eq!(first["outcome"], "created");
    assert_eq!(first["inserted"], 16);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/payments/generate", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["outcome"], "already_exists");
    assert_eq!(second["inserted"], 0);

    let response = app.oneshot(get("/payments", Some(&token))).await.unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn invoice_downloads_as_an_attachment() {
    let app = app().await;
    let token = login(&app).await;
    app.clone()
        .oneshot(json_request("POST", "/payments", Some(&token), payment_body("101", "January-2024")))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/invoice/101/January-2024", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"invoice-101-2024-01-05.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let response = app.oneshot(get("/invoice/101/February-2024", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expenses_round_trip_through_the_api() {
    let app = app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/expense",
            Some(&token),
            json!({
                "amount": "45.50",
                "date": "2024-02-01",
                "description": "Stairwell cleaning",
                "category": "Cleaning",
                "status": "paid",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // raw token, no scheme
    let response = app.clone().oneshot(get("/expenses?q=stair", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["category"], "Cleaning");

    let response = app
        .oneshot(json_request("POST", "/logout", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
