//! Sign-in endpoints

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::rejected_form;
use crate::{
    error::AppResult,
    forms::{safe_next, FormState, LoginForm},
    AppState,
};

/// Page to continue at when none was requested
const DEFAULT_NEXT: &str = "/";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Bearer token issued by a successful sign-in
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    /// Where to continue
    pub next: String,
}

/// Empty login form, echoing `next`
#[utoipa::path(
    get,
    path = "/accounts/login/",
    tag = "accounts",
    params(LoginQuery),
    responses(
        (status = 200, description = "Login form", body = LoginFormState)
    )
)]
pub async fn login_form(Query(query): Query<LoginQuery>) -> Json<FormState<LoginForm>> {
    Json(FormState::unbound(LoginForm {
        next: safe_next(query.next.as_deref()).map(str::to_string),
        ..Default::default()
    }))
}

/// Exchange a username and password for a bearer token
#[utoipa::path(
    post,
    path = "/accounts/login/",
    tag = "accounts",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Signed in, or the rejected form", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    let (username, password) = match form.clean() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let initial = LoginForm {
                next: form.next.clone(),
                ..Default::default()
            };
            return Ok(rejected_form(initial, form, errors));
        }
    };

    let issued = state.services.users.authenticate(&username, &password).await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        next: form.next_or(DEFAULT_NEXT).to_string(),
    })
    .into_response())
}
