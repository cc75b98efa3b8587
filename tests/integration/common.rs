//! Shared fixtures for integration tests

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use locallibrary_server::{
    api,
    models::{Author, Book, BookInstance, LoanStatus, NewAuthor, NewBook, NewBookInstance, NewUser, Permission, User},
    repository::Repository,
    services::Services,
    AppConfig, AppState,
};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new(pool: PgPool) -> Self {
        let config = AppConfig::default();
        let services = Services::new(Repository::new(pool), &config)
            .await
            .expect("services");
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };
        Self {
            router: api::router(state.clone()),
            state,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.state.services.repository
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(request("GET", uri, token, Body::empty())).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, token: Option<&str>) -> Response {
        let mut req = request("POST", uri, token, Body::from(body.to_string()));
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().expect("content type"),
        );
        self.send(req).await
    }

    /// Create an account holding `permissions`
    pub async fn user(&self, username: &str, password: &str, permissions: &[Permission]) -> User {
        let users = &self.state.services.users;
        let user = users
            .create_user(&NewUser {
                username: username.to_string(),
                password: password.to_string(),
                ..Default::default()
            })
            .await
            .expect("create user");
        for permission in permissions {
            users.grant(user.id, *permission).await.expect("grant");
        }
        user
    }

    /// Sign in and return the bearer token
    pub async fn token(&self, username: &str, password: &str) -> String {
        self.state
            .services
            .users
            .authenticate(username, password)
            .await
            .expect("authenticate")
            .token
    }

    pub async fn author(&self, first_name: &str, last_name: &str) -> Author {
        self.repository()
            .authors
            .create(&NewAuthor {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth: None,
                date_of_death: None,
            })
            .await
            .expect("create author")
    }

    pub async fn book(&self, title: &str, author: &Author) -> Book {
        self.repository()
            .books
            .create(&NewBook {
                title: title.to_string(),
                author_id: Some(author.id),
                summary: "My book summary".to_string(),
                isbn: "ABCDEFG".to_string(),
                language_id: None,
                genre_ids: vec![],
            })
            .await
            .expect("create book")
    }

    pub async fn copy(
        &self,
        book: &Book,
        status: LoanStatus,
        borrower: Option<&User>,
        due_back: Option<NaiveDate>,
    ) -> BookInstance {
        self.repository()
            .book_instances
            .create(&NewBookInstance {
                book_id: book.id,
                imprint: "Unlikely Imprint, 2016".to_string(),
                status,
                due_back,
                borrower_id: borrower.map(|u| u.id),
            })
            .await
            .expect("create copy")
    }

    pub async fn copy_by_id(&self, id: Uuid) -> BookInstance {
        self.repository()
            .book_instances
            .get_by_id(id)
            .await
            .expect("copy")
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body).expect("request")
}

pub async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Assert a `302 Found` and return its target
pub fn redirect_location(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::FOUND);
    response.headers()[header::LOCATION]
        .to_str()
        .expect("location")
        .to_string()
}
