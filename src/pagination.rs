//! Page-number pagination for list endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{AuthorSummary, BookListEntry, BorrowedCopy},
};

/// `?page=` query parameter: a 1-based number or `last`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Page position and neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageInfo {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    /// Total number of objects across all pages
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// One page of a list
#[derive(Serialize, ToSchema)]
#[aliases(
    BookPage = Page<BookListEntry>,
    AuthorPage = Page<AuthorSummary>,
    BorrowedPage = Page<BorrowedCopy>
)]
pub struct Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// True when the list spans more than one page
    pub is_paginated: bool,
    pub page: PageInfo,
}

impl<T> Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, page: PageInfo) -> Self {
        Self {
            items,
            is_paginated: page.num_pages > 1,
            page,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        U: for<'a> ToSchema<'a>,
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            is_paginated: self.is_paginated,
            page: self.page,
        }
    }
}

/// Splits `count` objects into pages of `per_page`
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    /// An empty list still has one (empty) page
    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve the requested page; anything not addressable is a 404
    pub fn page(&self, requested: Option<&str>) -> AppResult<PageInfo> {
        let num_pages = self.num_pages();
        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                AppError::NotFound("Page is not 'last', nor can it be converted to an int.".to_string())
            })?,
        };

        if number < 1 || number > num_pages {
            return Err(AppError::NotFound(format!("Invalid page ({})", number)));
        }

        Ok(PageInfo {
            number,
            num_pages,
            per_page: self.per_page,
            count: self.count,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }
}
