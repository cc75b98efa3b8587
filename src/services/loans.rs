//! Loans service: borrowed lists, renewal, lending and returns

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    config::CatalogConfig,
    error::AppResult,
    forms::{loan::Lending, today},
    models::{BookInstance, BorrowedCopy},
    pagination::{Page, Paginator},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: CatalogConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Copies on loan to `borrower_id`, soonest due first
    pub async fn borrowed_by(
        &self,
        borrower_id: i32,
        page: Option<&str>,
    ) -> AppResult<Page<BorrowedCopy>> {
        let count = self
            .repository
            .book_instances
            .count_on_loan_to(borrower_id)
            .await?;
        let page = Paginator::new(count, self.config.paginate_by).page(page)?;
        let copies = self
            .repository
            .book_instances
            .list_on_loan_to(borrower_id, page.limit(), page.offset())
            .await?;
        Ok(Page::new(checked_today(copies), page))
    }

    /// Every copy currently on loan, soonest due first
    pub async fn all_borrowed(&self, page: Option<&str>) -> AppResult<Page<BorrowedCopy>> {
        let count = self.repository.book_instances.count_on_loan().await?;
        let page = Paginator::new(count, self.config.paginate_by).page(page)?;
        let copies = self
            .repository
            .book_instances
            .list_on_loan(page.limit(), page.offset())
            .await?;
        Ok(Page::new(checked_today(copies), page))
    }

    pub async fn get_copy(&self, id: Uuid) -> AppResult<BookInstance> {
        self.repository.book_instances.get_by_id(id).await
    }

    /// Move the due date; status and borrower are left as they are
    pub async fn renew(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let copy = self
            .repository
            .book_instances
            .update_due_back(id, due_back)
            .await?;
        tracing::info!(copy_id = %id, due_back = %due_back, "Loan renewed");
        Ok(copy)
    }

    pub async fn borrower_exists(&self, user_id: i32) -> AppResult<bool> {
        self.repository.users.exists(user_id).await
    }

    /// Lend an available copy; anything else on the shelf is a business rule error
    pub async fn lend(&self, id: Uuid, lending: Lending) -> AppResult<BookInstance> {
        let copy = self
            .repository
            .book_instances
            .lend(id, lending.borrower_id, lending.due_back)
            .await?;
        tracing::info!(
            copy_id = %id,
            borrower_id = lending.borrower_id,
            due_back = %lending.due_back,
            "Copy lent"
        );
        Ok(copy)
    }

    /// Mark an on-loan copy as returned
    pub async fn mark_returned(&self, id: Uuid) -> AppResult<BookInstance> {
        let copy = self.repository.book_instances.mark_returned(id).await?;
        tracing::info!(copy_id = %id, "Copy returned");
        Ok(copy)
    }
}

/// Overdue flags follow the same calendar day as the renewal window
fn checked_today(copies: Vec<BorrowedCopy>) -> Vec<BorrowedCopy> {
    let today = today();
    copies.into_iter().map(|c| c.checked_on(today)).collect()
}
