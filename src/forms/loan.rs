//! Loan renewal and lending forms

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{empty_as_none, optional_id, parse_date, push_error, FieldErrors, INVALID_DATE, REQUIRED};

/// Suggested renewal length
pub const DEFAULT_LOAN_WEEKS: i64 = 3;
/// Furthest a due date may be set from today
pub const MAX_LOAN_WEEKS: i64 = 4;

pub const RENEWAL_IN_PAST: &str = "Invalid date - renewal in past";
pub const RENEWAL_TOO_FAR: &str = "Invalid date - renewal more than 4 weeks ahead";

/// Due date offered when a form is first displayed
pub fn default_due_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(DEFAULT_LOAN_WEEKS)
}

/// A due date must lie between today and four weeks from today, inclusive
pub fn check_due_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    if date < today {
        return Err(RENEWAL_IN_PAST);
    }
    if date > today + Duration::weeks(MAX_LOAN_WEEKS) {
        return Err(RENEWAL_TOO_FAR);
    }
    Ok(date)
}

fn due_date_field(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let Some(raw) = raw else {
        push_error(errors, field, REQUIRED);
        return None;
    };
    let Some(date) = parse_date(raw) else {
        push_error(errors, field, INVALID_DATE);
        return None;
    };
    match check_due_date(date, today) {
        Ok(date) => Some(date),
        Err(message) => {
            push_error(errors, field, message);
            None
        }
    }
}

/// Librarian renewal of a copy's due date
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RenewBookForm {
    /// Enter a date between now and 4 weeks (default 3)
    #[serde(default, deserialize_with = "empty_as_none")]
    pub renewal_date: Option<String>,
}

impl RenewBookForm {
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            renewal_date: Some(default_due_date(today).format("%Y-%m-%d").to_string()),
        }
    }

    pub fn clean(&self, today: NaiveDate) -> Result<NaiveDate, FieldErrors> {
        let mut errors = FieldErrors::new();
        match due_date_field(&mut errors, "renewal_date", self.renewal_date.as_deref(), today) {
            Some(date) => Ok(date),
            None => Err(errors),
        }
    }
}

/// Lending an available copy to a reader
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BorrowForm {
    /// Borrowing user id
    #[serde(default, deserialize_with = "empty_as_none")]
    pub borrower: Option<String>,
    /// Defaults to three weeks from today
    #[serde(default, deserialize_with = "empty_as_none")]
    pub due_back: Option<String>,
}

/// Validated lending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lending {
    pub borrower_id: i32,
    pub due_back: NaiveDate,
}

impl BorrowForm {
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            borrower: None,
            due_back: Some(default_due_date(today).format("%Y-%m-%d").to_string()),
        }
    }

    pub fn clean(&self, today: NaiveDate) -> Result<Lending, FieldErrors> {
        let mut errors = FieldErrors::new();

        let borrower_id = match self.borrower.as_deref() {
            None => {
                push_error(&mut errors, "borrower", REQUIRED);
                None
            }
            raw => optional_id(&mut errors, "borrower", raw),
        };

        let due_back = match self.due_back.as_deref() {
            None => Some(default_due_date(today)),
            raw => due_date_field(&mut errors, "due_back", raw, today),
        };

        match (borrower_id, due_back) {
            (Some(borrower_id), Some(due_back)) if errors.is_empty() => Ok(Lending {
                borrower_id,
                due_back,
            }),
            _ => Err(errors),
        }
    }
}
