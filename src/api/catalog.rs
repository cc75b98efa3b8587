//! Catalog endpoints: home page, books, authors, genres and languages

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    Form,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{found, rejected_form, Visitor};
use crate::{
    error::AppResult,
    forms::{AuthorForm, BookForm, BookInstanceForm, FormState, NameForm},
    models::{
        author::author_url, book::book_url, AuthorDetail, AuthorSummary, BookDetail,
        BookListEntry, Genre, Language, Permission,
    },
    pagination::{Page, PageQuery},
    services::catalog::LibraryCounts,
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IndexQuery {
    /// Word to count in book titles instead of the configured one
    pub word: Option<String>,
}

/// Home page context
#[derive(Serialize, ToSchema)]
pub struct IndexResponse {
    #[serde(flatten)]
    pub counts: LibraryCounts,
    /// Visits of the home page in this session, this one included
    pub num_visits: i64,
}

/// Redirect the site root to the catalog
pub async fn root_redirect() -> Response {
    found("/catalog/")
}

/// Home page counts and visit counter
#[utoipa::path(
    get,
    path = "/catalog/",
    tag = "catalog",
    params(IndexQuery),
    responses(
        (status = 200, description = "Library counts", body = IndexResponse)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<IndexQuery>,
) -> AppResult<(CookieJar, Json<IndexResponse>)> {
    let sessions = &state.services.sessions;

    let (jar, session_id) = match jar.get(sessions.cookie_name()) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            (jar, id)
        }
        None => {
            let id = crate::services::sessions::SessionsService::new_session_id();
            let cookie = Cookie::build((sessions.cookie_name().to_string(), id.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), id)
        }
    };

    let counts = state.services.catalog.counts(query.word.as_deref()).await?;
    let num_visits = sessions.record_visit(&session_id).await?;

    Ok((jar, Json(IndexResponse { counts, num_visits })))
}

// =============================================================================
// BOOKS
// =============================================================================

/// List books, 10 per page
#[utoipa::path(
    get,
    path = "/catalog/books/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of books", body = BookPage),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BookListEntry>>> {
    let page = state.services.catalog.list_books(query.page.as_deref()).await?;
    Ok(Json(page))
}

/// Book detail with its copies
#[utoipa::path(
    get,
    path = "/catalog/book/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book detail", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetail>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

#[utoipa::path(
    get,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Empty book form", body = BookFormState),
        (status = 302, description = "Not logged in"),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn book_create_form(visitor: Visitor) -> AppResult<Json<FormState<BookForm>>> {
    visitor.permission_or_forbidden(Permission::AddBook)?;
    Ok(Json(FormState::unbound(BookForm::default())))
}

/// Create a book; genres are repeated `genre` fields
#[utoipa::path(
    post,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, redirects to the book"),
        (status = 200, description = "Rejected form", body = BookFormState),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::AddBook)?;

    let book = match form.clean() {
        Ok(book) => book,
        Err(errors) => return Ok(rejected_form(BookForm::default(), form, errors)),
    };
    let errors = state.services.catalog.check_book_references(&book).await?;
    if !errors.is_empty() {
        return Ok(rejected_form(BookForm::default(), form, errors));
    }

    let created = state.services.catalog.create_book(&book).await?;
    Ok(found(&created.url()))
}

#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book form with current values", body = BookFormState),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_update_form(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<i32>,
) -> AppResult<Json<FormState<BookForm>>> {
    visitor.permission_or_forbidden(Permission::ChangeBook)?;
    let detail = state.services.catalog.get_book(id).await?;
    Ok(Json(FormState::unbound(BookForm::from(&detail))))
}

#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Updated, redirects to the book"),
        (status = 200, description = "Rejected form", body = BookFormState),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<i32>,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::ChangeBook)?;
    let detail = state.services.catalog.get_book(id).await?;

    let book = match form.clean() {
        Ok(book) => book,
        Err(errors) => return Ok(rejected_form(BookForm::from(&detail), form, errors)),
    };
    let errors = state.services.catalog.check_book_references(&book).await?;
    if !errors.is_empty() {
        return Ok(rejected_form(BookForm::from(&detail), form, errors));
    }

    state.services.catalog.update_book(id, &book).await?;
    Ok(found(&book_url(id)))
}

/// Add a copy of a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/copy/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = BookInstanceForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, redirects to the book"),
        (status = 200, description = "Rejected form", body = BookInstanceFormState),
        (status = 403, description = "Missing catalog.add_bookinstance"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_copy(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<i32>,
    Form(form): Form<BookInstanceForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::AddBookInstance)?;
    let book = state.services.catalog.find_book(id).await?;

    let (imprint, status) = match form.clean() {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(rejected_form(BookInstanceForm::default(), form, errors)),
    };

    state.services.catalog.add_copy(&book, imprint, status).await?;
    Ok(found(&book_url(book.id)))
}

// =============================================================================
// AUTHORS
// =============================================================================

/// List authors, 10 per page
#[utoipa::path(
    get,
    path = "/catalog/authors/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of authors", body = AuthorPage),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<AuthorSummary>>> {
    let page = state.services.catalog.list_authors(query.page.as_deref()).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author with their books", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetail>> {
    let author = state.services.catalog.author_detail(id).await?;
    Ok(Json(author))
}

#[utoipa::path(
    get,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Empty author form", body = AuthorFormState),
        (status = 302, description = "Not logged in"),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn author_create_form(visitor: Visitor) -> AppResult<Json<FormState<AuthorForm>>> {
    visitor.permission_or_forbidden(Permission::AddAuthor)?;
    Ok(Json(FormState::unbound(AuthorForm::default())))
}

#[utoipa::path(
    post,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body(content = AuthorForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, redirects to the author"),
        (status = 200, description = "Rejected form", body = AuthorFormState),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<AuthorForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::AddAuthor)?;

    match form.clean() {
        Ok(author) => {
            let created = state.services.catalog.create_author(&author).await?;
            Ok(found(&created.url()))
        }
        Err(errors) => Ok(rejected_form(AuthorForm::default(), form, errors)),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author form with current values", body = AuthorFormState),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_update_form(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<i32>,
) -> AppResult<Json<FormState<AuthorForm>>> {
    visitor.permission_or_forbidden(Permission::ChangeAuthor)?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(FormState::unbound(AuthorForm::from(&author))))
}

#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body(content = AuthorForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Updated, redirects to the author"),
        (status = 200, description = "Rejected form", body = AuthorFormState),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<i32>,
    Form(form): Form<AuthorForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::ChangeAuthor)?;
    let current = state.services.catalog.get_author(id).await?;

    match form.clean() {
        Ok(author) => {
            state.services.catalog.update_author(id, &author).await?;
            Ok(found(&author_url(id)))
        }
        Err(errors) => Ok(rejected_form(AuthorForm::from(&current), form, errors)),
    }
}

// =============================================================================
// GENRES / LANGUAGES
// =============================================================================

#[utoipa::path(
    get,
    path = "/catalog/genres/",
    tag = "catalog",
    responses((status = 200, description = "All genres", body = Vec<Genre>))
)]
pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.services.catalog.list_genres().await?))
}

#[utoipa::path(
    post,
    path = "/catalog/genre/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body(content = NameForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, redirects to the genre list"),
        (status = 200, description = "Rejected form", body = NameFormState),
        (status = 403, description = "Missing catalog.add_genre"),
        (status = 409, description = "Genre already exists")
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<NameForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::AddGenre)?;

    match form.clean() {
        Ok(name) => {
            state.services.catalog.create_genre(&name).await?;
            Ok(found("/catalog/genres/"))
        }
        Err(errors) => Ok(rejected_form(NameForm::default(), form, errors)),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/languages/",
    tag = "catalog",
    responses((status = 200, description = "All languages", body = Vec<Language>))
)]
pub async fn list_languages(State(state): State<AppState>) -> AppResult<Json<Vec<Language>>> {
    Ok(Json(state.services.catalog.list_languages().await?))
}

#[utoipa::path(
    post,
    path = "/catalog/language/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body(content = NameForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created, redirects to the language list"),
        (status = 200, description = "Rejected form", body = NameFormState),
        (status = 403, description = "Missing catalog.add_language"),
        (status = 409, description = "Language already exists")
    )
)]
pub async fn create_language(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<NameForm>,
) -> AppResult<Response> {
    visitor.permission_or_forbidden(Permission::AddLanguage)?;

    match form.clean() {
        Ok(name) => {
            state.services.catalog.create_language(&name).await?;
            Ok(found("/catalog/languages/"))
        }
        Err(errors) => Ok(rejected_form(NameForm::default(), form, errors)),
    }
}
