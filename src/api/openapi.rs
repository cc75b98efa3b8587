//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{accounts, catalog, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LocalLibrary API",
        version = "0.1.0",
        description = "Library catalog, loans and loan renewal",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Accounts
        accounts::login_form,
        accounts::login,
        // Catalog
        catalog::index,
        catalog::list_books,
        catalog::book_detail,
        catalog::book_create_form,
        catalog::create_book,
        catalog::book_update_form,
        catalog::update_book,
        catalog::create_copy,
        catalog::list_authors,
        catalog::author_detail,
        catalog::author_create_form,
        catalog::create_author,
        catalog::author_update_form,
        catalog::update_author,
        catalog::list_genres,
        catalog::create_genre,
        catalog::list_languages,
        catalog::create_language,
        // Loans
        loans::my_borrowed,
        loans::all_borrowed,
        loans::renew_form,
        loans::renew,
        loans::borrow,
        loans::mark_returned,
    ),
    components(
        schemas(
            // Models
            crate::models::Author,
            crate::models::AuthorSummary,
            crate::models::AuthorDetail,
            crate::models::Book,
            crate::models::BookListEntry,
            crate::models::BookDetail,
            crate::models::BookInstance,
            crate::models::BorrowedCopy,
            crate::models::Genre,
            crate::models::Language,
            crate::models::LoanStatus,
            crate::models::Permission,
            // Pages
            crate::pagination::PageInfo,
            crate::pagination::BookPage,
            crate::pagination::AuthorPage,
            crate::pagination::BorrowedPage,
            // Forms
            crate::forms::AuthorForm,
            crate::forms::BookForm,
            crate::forms::BookInstanceForm,
            crate::forms::NameForm,
            crate::forms::RenewBookForm,
            crate::forms::BorrowForm,
            crate::forms::LoginForm,
            crate::forms::AuthorFormState,
            crate::forms::BookFormState,
            crate::forms::BookInstanceFormState,
            crate::forms::NameFormState,
            crate::forms::RenewFormState,
            crate::forms::BorrowFormState,
            crate::forms::LoginFormState,
            // Responses
            catalog::IndexResponse,
            crate::services::catalog::LibraryCounts,
            loans::BorrowedResponse,
            loans::RenewResponse,
            loans::BorrowResponse,
            accounts::LoginResponse,
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "accounts", description = "Sign-in"),
        (name = "catalog", description = "Books, authors, genres and languages"),
        (name = "loans", description = "Borrowed books and loan renewal")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
