use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_backend::auth::jwt::{sign_token, TokenKind};
use storefront_backend::build_app;
use storefront_backend::config::AppConfig;
use storefront_backend::models::user::{NewUser, User};
use storefront_backend::state::AppState;
use storefront_backend::store::{MemoryProductStore, MemoryUserStore, PageRequest, Paged, StoreError, UserStore};

const PASSWORD: &str = "correct-horse";
const SECRET: &str = "integration-test-secret-0123456789";

fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars = vec![("STORAGE", "memory"), ("JWT_SECRET", SECRET), ("BCRYPT_COST", "4")];
    vars.extend_from_slice(overrides);
    AppConfig::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("test config")
}

fn app_with(overrides: &[(&str, &str)]) -> Router {
    build_app(AppState::in_memory(test_config(overrides)))
}

fn app() -> Router {
    app_with(&[])
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get_with_authorization(app: &Router, uri: &str, authorization: &str) -> (StatusCode, Value) {
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn register(app: &Router, username: &str, email: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/products/users/register/",
        Some(json!({ "username": username, "email": email, "password": PASSWORD })),
        None,
    )
    .await
}

async fn login(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/token/",
        Some(json!({ "username": username, "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

async fn access_token(app: &Router) -> String {
    register(app, "staff", "staff@example.com").await;
    login(app, "staff").await["access"].as_str().unwrap().to_string()
}

fn widget() -> Value {
    json!({
        "name": "Widget",
        "description": "A widget",
        "price": "9.99",
        "category": "Tools",
        "stock_quantity": 5
    })
}

async fn create_product(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/api/products/products/", Some(body), Some(token)).await
}

#[tokio::test]
async fn health_check_responds() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_enforces_unique_email() {
    let app = app();

    let (status, body) = register(&app, "ada", "ada@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let (status, body) = register(&app, "ada2", "ADA@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["fields"]["email"].is_array());

    let (status, _) = register(&app, "grace", "grace@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn registration_enforces_unique_username() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;

    let (status, body) = register(&app, "ada", "other@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["username"][0], "A user with that username already exists.");
}

#[tokio::test]
async fn registration_reports_invalid_fields() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/products/users/register/",
        Some(json!({ "username": "ada", "email": "not-an-email", "password": "123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].is_array());
    assert!(body["fields"].get("username").is_none());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let request = Request::post("/api/products/users/register/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_list_is_paginated_and_hides_passwords() {
    let app = app();
    for (name, email) in [("a1", "a1@example.com"), ("a2", "a2@example.com"), ("a3", "a3@example.com")] {
        register(&app, name, email).await;
    }

    let (status, body) = get(&app, "/api/products/users/?page_size=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["next"], 2);
    assert_eq!(body["previous"], Value::Null);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert!(body["results"][0].get("password_hash").is_none());

    let (status, body) = get(&app, "/api/products/users/?page=2&page_size=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["username"], "a3");

    let (status, _) = get(&app, "/api/products/users/?page=5&page_size=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valid_credentials_yield_a_token_pair() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;

    let pair = login(&app, "ada").await;
    assert!(pair["access"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(pair["refresh"].as_str().is_some_and(|t| !t.is_empty()));

    let (_, users) = get(&app, "/api/products/users/").await;
    assert!(users["results"][0]["last_login"].is_string());
}

#[tokio::test]
async fn invalid_credentials_are_rejected() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/token/",
        Some(json!({ "username": "ada", "password": "wrong-password" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_failed");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/token/",
        Some(json!({ "username": "nobody", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::POST, "/api/token/", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());
}

#[tokio::test]
async fn refresh_issues_a_new_access_token() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;
    let pair = login(&app, "ada").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/token/refresh/",
        Some(json!({ "refresh": pair["refresh"] })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();

    // the refreshed token works as a bearer credential
    let (status, _) = create_product(&app, access, widget()).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn refresh_rejects_access_and_garbage_tokens() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;
    let pair = login(&app, "ada").await;

    for bad in [pair["access"].clone(), json!("garbage.token.value")] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/token/refresh/",
            Some(json!({ "refresh": bad })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");
    }
}

#[tokio::test]
async fn token_routes_are_also_served_under_the_products_prefix() {
    let app = app();
    register(&app, "ada", "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/products/api/token/",
        Some(json!({ "username": "ada", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/products/api/token/refresh/",
        Some(json!({ "refresh": body["refresh"] })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn created_product_round_trips_through_detail() {
    let app = app();
    let token = access_token(&app).await;

    let (status, created) = create_product(&app, &token, widget()).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, detail) = get(&app, &format!("/api/products/products/{id}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Widget");
    assert_eq!(detail["description"], "A widget");
    assert_eq!(detail["price"], "9.99");
    assert_eq!(detail["category"], "Tools");
    assert_eq!(detail["stock_quantity"], 5);
    assert_eq!(detail["image_url"], Value::Null);
    assert!(detail["created_date"].is_string());
    assert_eq!(detail, created);
}

#[tokio::test]
async fn product_creation_requires_a_token_by_default() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/api/products/products/", Some(widget()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_failed");
}

#[tokio::test]
async fn open_write_policy_allows_anonymous_creation() {
    let app = app_with(&[("AUTH_WRITES", "open")]);
    let (status, _) = send(&app, Method::POST, "/api/products/products/", Some(widget()), None).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn negative_stock_quantity_is_rejected() {
    let app = app();
    let token = access_token(&app).await;

    let mut body = widget();
    body["stock_quantity"] = json!(-1);
    let (status, body) = create_product(&app, &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["stock_quantity"][0], "Ensure this value is greater than or equal to 0.");

    let (_, listing) = get(&app, "/api/products/products/").await;
    assert_eq!(listing["count"], 0);
}

#[tokio::test]
async fn negative_price_is_rejected_unless_allowed() {
    let mut body = widget();
    body["price"] = json!("-1.00");

    let strict = app();
    let token = access_token(&strict).await;
    let (status, _) = create_product(&strict, &token, body.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let lenient = app_with(&[("ALLOW_NEGATIVE_PRICE", "true")]);
    let token = access_token(&lenient).await;
    let (status, created) = create_product(&lenient, &token, body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["price"], "-1.00");
}

#[tokio::test]
async fn unknown_product_ids_are_not_found() {
    let app = app();
    let (status, body) = get(&app, "/api/products/products/999/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = get(&app, "/api/products/products/abc/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_substrings_case_insensitively() {
    let app = app();
    let token = access_token(&app).await;
    create_product(&app, &token, widget()).await;
    let mut gadget = widget();
    gadget["name"] = json!("Gadget");
    gadget["description"] = json!("A shiny gadget");
    create_product(&app, &token, gadget).await;

    let (status, body) = get(&app, "/api/products/products/search/?q=WIDG").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Widget");

    let (_, body) = get(&app, "/api/products/products/search/?search=shiny").await;
    assert_eq!(body["results"][0]["name"], "Gadget");

    let (status, body) = get(&app, "/api/products/products/search/?q=zzz-no-match").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["results"], json!([]));

    let (_, body) = get(&app, "/api/products/products/search/").await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn list_filters_by_category_and_stock() {
    let app = app();
    let token = access_token(&app).await;
    create_product(&app, &token, widget()).await;
    let mut apple = widget();
    apple["name"] = json!("Apple");
    apple["category"] = json!("Food");
    apple["stock_quantity"] = json!(0);
    create_product(&app, &token, apple).await;

    let (_, body) = get(&app, "/api/products/products/?category=tools").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Widget");

    let (_, body) = get(&app, "/api/products/products/?in_stock=false").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Apple");

    let (status, body) = get(&app, "/api/products/products/?min_price=cheap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["min_price"].is_array());
}

#[tokio::test]
async fn authenticated_read_policy_guards_listings() {
    let app = app_with(&[("AUTH_READS", "authenticated")]);
    let token = access_token(&app).await;

    for uri in ["/api/products/users/", "/api/products/products/", "/api/products/products/search/?q=x"] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");

        let (status, _) = send(&app, Method::GET, uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    // registration stays open
    let (status, _) = register(&app, "newcomer", "new@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn bad_bearer_token_is_rejected_even_on_open_routes() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/products/products/", None, Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn unknown_routes_return_json_not_found() {
    let (status, body) = get(&app(), "/api/nowhere/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn malformed_query_strings_get_a_json_error() {
    let app = app();
    for uri in [
        "/api/products/products/?page=1&page=2",
        "/api/products/products/search/?q=a&q=b",
        "/api/products/users/?page_size=1&page_size=2",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "validation_error", "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn undecodable_product_id_is_a_json_not_found() {
    let (status, body) = get(&app(), "/api/products/products/%FF/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn refresh_for_a_missing_user_is_rejected() {
    let app = app();
    let refresh = sign_token(999, "ghost", TokenKind::Refresh, 60, SECRET).unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/token/refresh/",
        Some(json!({ "refresh": refresh })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

/// Stores users normally but reports every account as deactivated.
struct DeactivatedUsers(MemoryUserStore);

fn deactivate(user: Option<User>) -> Option<User> {
    user.map(|u| User { is_active: false, ..u })
}

#[async_trait]
impl UserStore for DeactivatedUsers {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.0.insert(new_user).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(deactivate(self.0.find_by_id(id).await?))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(deactivate(self.0.find_by_username(username).await?))
    }

    async fn list(&self, page: PageRequest) -> Result<Paged<User>, StoreError> {
        self.0.list(page).await
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        self.0.record_login(id).await
    }
}

#[tokio::test]
async fn inactive_accounts_cannot_obtain_or_refresh_tokens() {
    let state = AppState::new(
        Arc::new(DeactivatedUsers(MemoryUserStore::new())),
        Arc::new(MemoryProductStore::new()),
        test_config(&[]),
    );
    let app = build_app(state);

    let (status, created) = register(&app, "ada", "ada@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/token/",
        Some(json!({ "username": "ada", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_failed");

    let refresh = sign_token(id, "ada", TokenKind::Refresh, 60, SECRET).unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/token/refresh/",
        Some(json!({ "refresh": refresh })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn non_bearer_authorization_is_anonymous_on_open_routes() {
    let (status, body) = get_with_authorization(&app(), "/api/products/products/", "Basic YWRhOnB3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let guarded = app_with(&[("AUTH_READS", "authenticated")]);
    let (status, body) = get_with_authorization(&guarded, "/api/products/products/", "Basic YWRhOnB3").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_failed");
}
