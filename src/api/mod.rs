//! HTTP handlers and routing for the LocalLibrary server

pub mod accounts;
pub mod catalog;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::{header::AUTHORIZATION, header::LOCATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    forms::{FieldErrors, FormState},
    models::{Permission, UserClaims},
    AppState,
};

/// The caller of a request: anonymous, or authenticated by a bearer token.
///
/// A missing `Authorization` header yields an anonymous visitor; a header
/// that is present but unusable is rejected with 401.
pub struct Visitor {
    pub claims: Option<UserClaims>,
    login_redirect: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Visitor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Nested routers strip prefixes from `parts.uri`; the original URI keeps them
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let next = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        let login_redirect = login_redirect_url(&state.config.auth.login_url, &next);

        let claims = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => {
                let header = value.to_str().map_err(|_| {
                    AppError::Authentication("Invalid authorization header".to_string())
                })?;
                let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                    AppError::Authentication("Invalid authorization header format".to_string())
                })?;
                Some(state.services.users.authenticate_token(token.trim()).await?)
            }
        };

        Ok(Visitor {
            claims,
            login_redirect,
        })
    }
}

impl Visitor {
    /// Anonymous visitors are sent to the login page
    pub fn login_required(&self) -> AppResult<&UserClaims> {
        self.claims
            .as_ref()
            .ok_or_else(|| AppError::LoginRequired(self.login_redirect.clone()))
    }

    /// Anyone without `permission`, logged in or not, is sent to the login page
    pub fn permission_required(&self, permission: Permission) -> AppResult<&UserClaims> {
        match &self.claims {
            Some(claims) if claims.has_perm(permission) => Ok(claims),
            _ => Err(AppError::LoginRequired(self.login_redirect.clone())),
        }
    }

    /// Anonymous visitors are sent to the login page, users lacking `permission` get 403
    pub fn permission_or_forbidden(&self, permission: Permission) -> AppResult<&UserClaims> {
        let claims = self.login_required()?;
        claims.require_perm(permission)?;
        Ok(claims)
    }
}

/// Login page URL carrying the page to come back to
pub fn login_redirect_url(login_url: &str, next: &str) -> String {
    format!(
        "{}?next={}",
        login_url,
        urlencoding::encode(next).replace("%2F", "/")
    )
}

/// `302 Found` to `location`
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// A rejected form is answered with `200` so the client can show the errors
pub fn rejected_form<T>(initial: T, data: T, errors: FieldErrors) -> Response
where
    T: serde::Serialize + for<'a> utoipa::ToSchema<'a>,
{
    Json(FormState::rejected(initial, data, errors)).into_response()
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(catalog::root_redirect))
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Accounts
        .route("/accounts/login/", get(accounts::login_form).post(accounts::login))
        // Dashboard
        .route("/catalog/", get(catalog::index))
        // Books
        .route("/catalog/books/", get(catalog::list_books))
        .route(
            "/catalog/book/create/",
            get(catalog::book_create_form).post(catalog::create_book),
        )
        .route("/catalog/book/:id", get(catalog::book_detail))
        .route(
            "/catalog/book/:id/update/",
            get(catalog::book_update_form).post(catalog::update_book),
        )
        .route("/catalog/book/:id/copy/create/", post(catalog::create_copy))
        // Loans on a copy (`:id` is the copy UUID here)
        .route(
            "/catalog/book/:id/renew/",
            get(loans::renew_form).post(loans::renew),
        )
        .route("/catalog/book/:id/borrow/", post(loans::borrow))
        .route("/catalog/book/:id/return/", post(loans::mark_returned))
        .route("/catalog/mybooks/", get(loans::my_borrowed))
        .route("/catalog/borrowed/", get(loans::all_borrowed))
        // Authors
        .route("/catalog/authors/", get(catalog::list_authors))
        .route(
            "/catalog/author/create/",
            get(catalog::author_create_form).post(catalog::create_author),
        )
        .route("/catalog/author/:id", get(catalog::author_detail))
        .route(
            "/catalog/author/:id/update/",
            get(catalog::author_update_form).post(catalog::update_author),
        )
        // Genres and languages
        .route("/catalog/genres/", get(catalog::list_genres))
        .route("/catalog/genre/create/", post(catalog::create_genre))
        .route("/catalog/languages/", get(catalog::list_languages))
        .route("/catalog/language/create/", post(catalog::create_language))
        .with_state(state);

    app.merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
