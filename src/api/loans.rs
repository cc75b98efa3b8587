//! Loan endpoints: borrowed lists, renewal, lending and returns

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::Form;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{found, Visitor};
use crate::{
    error::AppResult,
    forms::{push_error, today, BorrowForm, FieldErrors, FormState, RenewBookForm, INVALID_CHOICE},
    models::{BookInstance, BorrowedCopy, Permission},
    pagination::{Page, PageQuery},
    AppState,
};

/// Where librarians land after changing a loan
const ALL_BORROWED_URL: &str = "/catalog/borrowed/";

/// Copies on loan, with the requesting user
#[derive(Serialize, ToSchema)]
pub struct BorrowedResponse {
    /// Username of the caller
    pub user: String,
    #[serde(flatten)]
    pub page: Page<BorrowedCopy>,
}

/// Renewal form together with the copy being renewed
#[derive(Serialize, ToSchema)]
pub struct RenewResponse {
    pub book_instance: BookInstance,
    pub form: FormState<RenewBookForm>,
}

/// Lending form together with the copy being lent
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub book_instance: BookInstance,
    pub form: FormState<BorrowForm>,
}

/// Books on loan to the current user
#[utoipa::path(
    get,
    path = "/catalog/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's loans, soonest due first", body = BorrowedResponse),
        (status = 302, description = "Not logged in, redirects to the login page")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BorrowedResponse>> {
    let claims = visitor.login_required()?;

    let page = state
        .services
        .loans
        .borrowed_by(claims.user_id, query.page.as_deref())
        .await?;

    Ok(Json(BorrowedResponse {
        user: claims.username().to_string(),
        page,
    }))
}

/// All books on loan (librarians)
#[utoipa::path(
    get,
    path = "/catalog/borrowed/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Every loan, soonest due first", body = BorrowedResponse),
        (status = 302, description = "Not logged in"),
        (status = 403, description = "Missing catalog.can_mark_returned")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BorrowedResponse>> {
    let claims = visitor.permission_or_forbidden(Permission::CanMarkReturned)?;

    let page = state.services.loans.all_borrowed(query.page.as_deref()).await?;

    Ok(Json(BorrowedResponse {
        user: claims.username().to_string(),
        page,
    }))
}

/// Renewal form for a copy, pre-filled three weeks ahead
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewResponse),
        (status = 302, description = "Missing catalog.can_mark_returned, redirects to the login page"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew_form(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewResponse>> {
    visitor.permission_required(Permission::CanMarkReturned)?;
    let book_instance = state.services.loans.get_copy(id).await?;

    Ok(Json(RenewResponse {
        book_instance,
        form: FormState::unbound(RenewBookForm::initial(today())),
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body(content = RenewBookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Renewed, redirects to all borrowed books"),
        (status = 200, description = "Rejected form", body = RenewResponse),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
    Form(form): Form<RenewBookForm>,
) -> AppResult<Response> {
    visitor.permission_required(Permission::CanMarkReturned)?;
    let book_instance = state.services.loans.get_copy(id).await?;

    let today = today();
    match form.clean(today) {
        Ok(due_back) => {
            state.services.loans.renew(id, due_back).await?;
            Ok(found(ALL_BORROWED_URL))
        }
        Err(errors) => Ok(Json(RenewResponse {
            book_instance,
            form: FormState::rejected(RenewBookForm::initial(today), form, errors),
        })
        .into_response()),
    }
}

/// Lend an available copy to a user
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/borrow/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body(content = BorrowForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Lent, redirects to all borrowed books"),
        (status = 200, description = "Rejected form", body = BorrowResponse),
        (status = 404, description = "Book instance not found"),
        (status = 422, description = "Copy is not available")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
    Form(form): Form<BorrowForm>,
) -> AppResult<Response> {
    visitor.permission_required(Permission::CanMarkReturned)?;
    let book_instance = state.services.loans.get_copy(id).await?;

    let today = today();
    let mut errors = FieldErrors::new();
    let lending = match form.clean(today) {
        Ok(lending) => {
            if !state.services.loans.borrower_exists(lending.borrower_id).await? {
                push_error(&mut errors, "borrower", INVALID_CHOICE);
            }
            Some(lending)
        }
        Err(field_errors) => {
            errors = field_errors;
            None
        }
    };

    match lending {
        Some(lending) if errors.is_empty() => {
            state.services.loans.lend(id, lending).await?;
            Ok(found(ALL_BORROWED_URL))
        }
        _ => Ok(Json(BorrowResponse {
            book_instance,
            form: FormState::rejected(BorrowForm::initial(today), form, errors),
        })
        .into_response()),
    }
}

/// Mark a copy on loan as returned
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/return/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 302, description = "Returned, redirects to all borrowed books"),
        (status = 404, description = "Book instance not found"),
        (status = 422, description = "Copy is not on loan")
    )
)]
pub async fn mark_returned(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    visitor.permission_required(Permission::CanMarkReturned)?;
    state.services.loans.mark_returned(id).await?;
    Ok(found(ALL_BORROWED_URL))
}
