//! Catalog service: dashboard counts, listings, details and editing

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::CatalogConfig,
    error::AppResult,
    forms::{push_error, FieldErrors, INVALID_CHOICE},
    models::{
        book::display_genre, Author, AuthorDetail, AuthorSummary, Book, BookDetail,
        BookInstance, BookListEntry, Genre, Language, LoanStatus, NewAuthor, NewBook,
        NewBookInstance,
    },
    pagination::{Page, Paginator},
    repository::Repository,
};

/// Library-wide counts shown on the home page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryCounts {
    pub num_books: i64,
    pub num_instances: i64,
    /// Copies with status `a`
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_genres: i64,
    /// Word matched against book titles
    pub search_word: String,
    pub num_books_with_word: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Counts for the home page; `word` falls back to the configured search word
    pub async fn counts(&self, word: Option<&str>) -> AppResult<LibraryCounts> {
        let search_word = word
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .unwrap_or(&self.config.index_search_word)
            .to_string();

        let (num_books, num_instances, num_instances_available, num_authors, num_genres, num_books_with_word) = tokio::try_join!(
            self.repository.books.count(),
            self.repository.book_instances.count(),
            self.repository.book_instances.count_by_status(LoanStatus::Available),
            self.repository.authors.count(),
            self.repository.genres.count(),
            self.repository.books.count_title_contains(&search_word),
        )?;

        Ok(LibraryCounts {
            num_books,
            num_instances,
            num_instances_available,
            num_authors,
            num_genres,
            search_word,
            num_books_with_word,
        })
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self, page: Option<&str>) -> AppResult<Page<BookListEntry>> {
        let count = self.repository.books.count().await?;
        let page = Paginator::new(count, self.config.paginate_by).page(page)?;
        let books = self.repository.books.list(page.limit(), page.offset()).await?;
        Ok(Page::new(books, page))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(id).await?;

        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => self.repository.languages.find(language_id).await?,
            None => None,
        };
        let genres = self.repository.books.genres(id).await?;
        let copies = self.repository.book_instances.list_for_book(id).await?;

        Ok(BookDetail {
            display_genre: display_genre(&genres),
            book,
            author,
            language,
            genres,
            copies,
        })
    }

    /// Rows a book form refers to that do not exist, as field errors
    pub async fn check_book_references(&self, book: &NewBook) -> AppResult<FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(author_id) = book.author_id {
            if !self.repository.authors.exists(author_id).await? {
                push_error(&mut errors, "author", INVALID_CHOICE);
            }
        }
        if let Some(language_id) = book.language_id {
            if self.repository.languages.find(language_id).await?.is_none() {
                push_error(&mut errors, "language", INVALID_CHOICE);
            }
        }
        for missing in self.repository.genres.missing(&book.genre_ids).await? {
            push_error(
                &mut errors,
                "genre",
                format!("Select a valid choice. {} is not one of the available choices.", missing),
            );
        }

        Ok(errors)
    }

    pub async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        let created = self.repository.books.create(book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: &NewBook) -> AppResult<Book> {
        let updated = self.repository.books.update(id, book).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    /// Bare book row, without author or copies
    pub async fn find_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Add a physical copy to an existing book
    pub async fn add_copy(
        &self,
        book: &Book,
        imprint: String,
        status: LoanStatus,
    ) -> AppResult<BookInstance> {
        let book_id = book.id;
        let copy = self
            .repository
            .book_instances
            .create(&NewBookInstance {
                book_id,
                imprint,
                status,
                due_back: None,
                borrower_id: None,
            })
            .await?;
        tracing::info!(book_id, copy_id = %copy.id, status = %copy.status, "Book instance created");
        Ok(copy)
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self, page: Option<&str>) -> AppResult<Page<AuthorSummary>> {
        let count = self.repository.authors.count().await?;
        let page = Paginator::new(count, self.config.paginate_by).page(page)?;
        let authors = self
            .repository
            .authors
            .list(page.limit(), page.offset())
            .await?;
        Ok(Page::new(authors, page).map(AuthorSummary::from))
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn author_detail(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.list_by_author(id).await?;
        Ok(AuthorDetail {
            name: author.display_name(),
            author,
            books,
        })
    }

    pub async fn create_author(&self, author: &NewAuthor) -> AppResult<Author> {
        let created = self.repository.authors.create(author).await?;
        tracing::info!(author_id = created.id, name = %created.display_name(), "Author created");
        Ok(created)
    }

    pub async fn update_author(&self, id: i32, author: &NewAuthor) -> AppResult<Author> {
        let updated = self.repository.authors.update(id, author).await?;
        tracing::info!(author_id = id, "Author updated");
        Ok(updated)
    }

    // =========================================================================
    // GENRES / LANGUAGES
    // =========================================================================

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn create_genre(&self, name: &str) -> AppResult<Genre> {
        let genre = self.repository.genres.create(name).await?;
        tracing::info!(genre_id = genre.id, name = %genre.name, "Genre created");
        Ok(genre)
    }

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn create_language(&self, name: &str) -> AppResult<Language> {
        let language = self.repository.languages.create(name).await?;
        tracing::info!(language_id = language.id, name = %language.name, "Language created");
        Ok(language)
    }
}
