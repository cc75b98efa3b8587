use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use sqlx::PgPool;

use locallibrary_server::{config::BootstrapAdmin, models::Permission};

use crate::common::{json, TestApp};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn login_issues_bearer_token(pool: PgPool) {
    let app = TestApp::new(pool).await;
    app.user("testuser1", "1X<ISRUkw+tuK", &[Permission::CanMarkReturned])
        .await;

    let response = app
        .post_form(
            "/accounts/login/",
            "username=TestUser1&password=1X%3CISRUkw%2BtuK&next=%2Fcatalog%2Fmybooks%2F",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["next"], "/catalog/mybooks/");

    let token = body["token"].as_str().unwrap().to_string();
    let claims = app.state.services.users.decode_token(&token).unwrap();
    assert_eq!(claims.username(), "testuser1");
    assert!(claims.has_perm(Permission::CanMarkReturned));

    let response = app.get("/catalog/mybooks/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn bad_credentials_are_unauthorized(pool: PgPool) {
    let app = TestApp::new(pool).await;
    app.user("testuser1", "1X<ISRUkw+tuK", &[]).await;

    let response = app
        .post_form("/accounts/login/", "username=testuser1&password=wrong", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_form("/accounts/login/", "username=nobody&password=wrong", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_form("/accounts/login/", "username=testuser1", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["errors"]["password"][0], "This field is required.");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn login_form_echoes_next(pool: PgPool) {
    let app = TestApp::new(pool).await;

    let body = json(app.get("/accounts/login/?next=/catalog/mybooks/", None).await).await;
    assert_eq!(body["initial"]["next"], "/catalog/mybooks/");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn invalid_token_is_rejected(pool: PgPool) {
    let app = TestApp::new(pool).await;

    let response = app.get("/catalog/mybooks/", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/catalog/mybooks/")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn bootstrap_admin_is_created_once(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let admin = BootstrapAdmin {
        username: "admin".to_string(),
        password: "admin-pass".to_string(),
    };

    let users = &app.state.services.users;
    assert!(users.ensure_bootstrap_admin(&admin).await.unwrap());
    assert!(!users.ensure_bootstrap_admin(&admin).await.unwrap());

    let token = app.token("admin", "admin-pass").await;
    let response = app.get("/catalog/borrowed/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn health_and_readiness(pool: PgPool) {
    let app = TestApp::new(pool).await;

    let body = json(app.get("/health", None).await).await;
    assert_eq!(body["status"], "healthy");

    let body = json(app.get("/ready", None).await).await;
    assert_eq!(body["status"], "ready");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn tokens_follow_account_changes(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let librarian = app
        .user("testuser2", "2HJ1vRV0Z&3iD", &[Permission::CanMarkReturned])
        .await;
    let token = app.token("testuser2", "2HJ1vRV0Z&3iD").await;

    let response = app.get("/catalog/borrowed/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // revoked permissions apply to tokens already issued
    sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
        .bind(librarian.id)
        .execute(&app.repository().pool)
        .await
        .unwrap();
    let response = app.get("/catalog/borrowed/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(librarian.id)
        .execute(&app.repository().pool)
        .await
        .unwrap();
    let response = app.get("/catalog/mybooks/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
