//! Form input parsing and validation
//!
//! Form endpoints accept `application/x-www-form-urlencoded` bodies. Every
//! field arrives as text; blank values are treated as missing. A rejected
//! submission is answered with the submitted data and per-field messages
//! instead of an error status, so a client can redisplay the form.

pub mod author;
pub mod book;
pub mod loan;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

pub use author::AuthorForm;
pub use book::{BookForm, BookInstanceForm};
pub use loan::{BorrowForm, RenewBookForm};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Field name to error messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// State of a form as returned to the client
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    AuthorFormState = FormState<AuthorForm>,
    BookFormState = FormState<BookForm>,
    BookInstanceFormState = FormState<BookInstanceForm>,
    NameFormState = FormState<NameForm>,
    RenewFormState = FormState<RenewBookForm>,
    BorrowFormState = FormState<BorrowForm>,
    LoginFormState = FormState<LoginForm>
)]
pub struct FormState<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Values the form starts with
    pub initial: T,
    /// What was submitted, absent on first display
    pub data: Option<T>,
    pub errors: FieldErrors,
}

impl<T> FormState<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn unbound(initial: T) -> Self {
        Self {
            initial,
            data: None,
            errors: FieldErrors::new(),
        }
    }

    pub fn rejected(initial: T, data: T, errors: FieldErrors) -> Self {
        Self {
            initial,
            data: Some(data),
            errors,
        }
    }
}

/// Add one message under `field`
pub fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Run derive-based rules and collect their messages per field
pub fn validate_fields<T: Validate>(form: &T) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => into_field_errors(errors),
    }
}

fn into_field_errors(errors: ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            push_error(&mut out, &field.to_string(), message);
        }
    }
    out
}

/// ISO `YYYY-MM-DD` date, the format HTML date inputs submit
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Optional date field: blank is `None`, garbage is an error
pub fn optional_date(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    let raw = raw?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        push_error(errors, field, INVALID_DATE);
    }
    parsed
}

/// Optional foreign key field: blank is `None`, garbage is an error
pub fn optional_id(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<i32> {
    let raw = raw?;
    let parsed = raw.trim().parse::<i32>().ok();
    if parsed.is_none() {
        push_error(errors, field, INVALID_CHOICE);
    }
    parsed
}

/// Serde helper mapping empty or whitespace-only strings to `None`
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Today in the server's local time zone
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Name-only form used for genres and languages
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NameForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub name: Option<String>,
}

impl NameForm {
    pub fn clean(&self) -> Result<String, FieldErrors> {
        let errors = validate_fields(self);
        match (&self.name, errors.is_empty()) {
            (Some(name), true) => Ok(name.clone()),
            _ => Err(errors),
        }
    }
}

/// Username and password sign-in
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(required(message = "This field is required."))]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field is required.")
    )]
    pub password: Option<String>,

    /// Page to continue at after signing in
    #[serde(default, deserialize_with = "empty_as_none")]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(String, String), FieldErrors> {
        let errors = validate_fields(self);
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if errors.is_empty() => {
                Ok((username.clone(), password.clone()))
            }
            _ => Err(errors),
        }
    }

    /// `next` when it points inside this site, `default` otherwise
    pub fn next_or<'a>(&'a self, default: &'a str) -> &'a str {
        safe_next(self.next.as_deref()).unwrap_or(default)
    }
}

/// Only site-relative paths are followed after login
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}
