//! Book and book-copy forms

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{empty_as_none, optional_id, push_error, validate_fields, FieldErrors, INVALID_CHOICE};
use crate::models::{BookDetail, LoanStatus, NewBook};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub title: Option<String>,

    /// Author id
    #[serde(default, deserialize_with = "empty_as_none")]
    pub author: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 1000, message = "Ensure this value has at most 1000 characters.")
    )]
    pub summary: Option<String>,

    /// 13 character ISBN
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 13, message = "Ensure this value has at most 13 characters.")
    )]
    pub isbn: Option<String>,

    /// Genre ids, one repeated `genre` field per selection
    #[serde(default)]
    pub genre: Vec<String>,

    /// Language id
    #[serde(default, deserialize_with = "empty_as_none")]
    pub language: Option<String>,
}

impl From<&BookDetail> for BookForm {
    fn from(detail: &BookDetail) -> Self {
        Self {
            title: Some(detail.book.title.clone()),
            author: detail.book.author_id.map(|id| id.to_string()),
            summary: Some(detail.book.summary.clone()),
            isbn: Some(detail.book.isbn.clone()),
            genre: detail.genres.iter().map(|g| g.id.to_string()).collect(),
            language: detail.book.language_id.map(|id| id.to_string()),
        }
    }
}

impl BookForm {
    /// Field-level checks; references to other rows are checked by the catalog service
    pub fn clean(&self) -> Result<NewBook, FieldErrors> {
        let mut errors = validate_fields(self);

        let author_id = optional_id(&mut errors, "author", self.author.as_deref());
        let language_id = optional_id(&mut errors, "language", self.language.as_deref());

        let mut genre_ids = Vec::with_capacity(self.genre.len());
        for raw in self.genre.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
            match raw.parse::<i32>() {
                Ok(id) if !genre_ids.contains(&id) => genre_ids.push(id),
                Ok(_) => {}
                Err(_) => push_error(&mut errors, "genre", INVALID_CHOICE),
            }
        }

        match (&self.title, &self.summary, &self.isbn) {
            (Some(title), Some(summary), Some(isbn)) if errors.is_empty() => Ok(NewBook {
                title: title.clone(),
                author_id,
                summary: summary.clone(),
                isbn: isbn.clone(),
                language_id,
                genre_ids,
            }),
            _ => Err(errors),
        }
    }
}

/// New physical copy of a book
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookInstanceForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub imprint: Option<String>,

    /// `m`, `a` or `r`; copies are put on loan through lending only
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<String>,
}

impl BookInstanceForm {
    pub fn clean(&self) -> Result<(String, LoanStatus), FieldErrors> {
        let mut errors = validate_fields(self);

        let status = match self.status.as_deref() {
            None => LoanStatus::default(),
            Some(raw) => match raw.parse::<LoanStatus>() {
                Ok(LoanStatus::OnLoan) | Err(_) => {
                    push_error(&mut errors, "status", INVALID_CHOICE);
                    LoanStatus::default()
                }
                Ok(status) => status,
            },
        };

        match &self.imprint {
            Some(imprint) if errors.is_empty() => Ok((imprint.clone(), status)),
            _ => Err(errors),
        }
    }
}
