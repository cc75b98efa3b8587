//! Data models for LocalLibrary

pub mod author;
pub mod book;
pub mod book_instance;
pub mod enums;
pub mod genre;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorSummary, NewAuthor};
pub use book::{Book, BookDetail, BookListEntry, NewBook};
pub use book_instance::{BookInstance, BorrowedCopy, NewBookInstance};
pub use enums::LoanStatus;
pub use genre::{Genre, Language};
pub use user::{NewUser, Permission, User, UserClaims};
