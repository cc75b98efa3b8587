//! Book instances (copies) repository, including loan state changes

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BookInstance, BorrowedCopy, LoanStatus, NewBookInstance},
};

const COPY_COLUMNS: &str = "id, book_id, imprint, due_back, status, borrower_id";

const BORROWED_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, b.title, bi.imprint, bi.due_back, bi.status, bi.borrower_id,
           u.username AS borrower_username
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE id = $1",
            COPY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Copies of one book
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let copies = sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE book_id = $1 ORDER BY due_back NULLS LAST, id",
            COPY_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    pub async fn count_on_loan_to(&self, borrower_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_instances WHERE status = 'o' AND borrower_id = $1",
        )
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Copies on loan to one borrower, soonest due first
    pub async fn list_on_loan_to(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>> {
        let copies = sqlx::query_as::<_, BorrowedCopy>(&format!(
            r#"{}
            WHERE bi.status = 'o' AND bi.borrower_id = $1
            ORDER BY bi.due_back, bi.id
            LIMIT $2 OFFSET $3
            "#,
            BORROWED_SELECT
        ))
        .bind(borrower_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    pub async fn count_on_loan(&self) -> AppResult<i64> {
        self.count_by_status(LoanStatus::OnLoan).await
    }

    /// Every copy on loan, soonest due first
    pub async fn list_on_loan(&self, limit: i64, offset: i64) -> AppResult<Vec<BorrowedCopy>> {
        let copies = sqlx::query_as::<_, BorrowedCopy>(&format!(
            r#"{}
            WHERE bi.status = 'o'
            ORDER BY bi.due_back, bi.id
            LIMIT $1 OFFSET $2
            "#,
            BORROWED_SELECT
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    pub async fn create(&self, copy: &NewBookInstance) -> AppResult<BookInstance> {
        let created = sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COPY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(copy.book_id)
        .bind(&copy.imprint)
        .bind(copy.due_back)
        .bind(copy.status)
        .bind(copy.borrower_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Set a new due date, leaving status and borrower untouched
    pub async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            "UPDATE book_instances SET due_back = $1 WHERE id = $2 RETURNING {}",
            COPY_COLUMNS
        ))
        .bind(due_back)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// Put an available copy on loan in a single statement
    pub async fn lend(
        &self,
        id: Uuid,
        borrower_id: i32,
        due_back: NaiveDate,
    ) -> AppResult<BookInstance> {
        let lent = sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            UPDATE book_instances
            SET status = 'o', borrower_id = $1, due_back = $2
            WHERE id = $3 AND status = 'a'
            RETURNING {}
            "#,
            COPY_COLUMNS
        ))
        .bind(borrower_id)
        .bind(due_back)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match lent {
            Some(copy) => Ok(copy),
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::BusinessRule(format!(
                    "Book instance {} is not available ({})",
                    id, current.status
                )))
            }
        }
    }

    /// Bring an on-loan copy back to the shelf
    pub async fn mark_returned(&self, id: Uuid) -> AppResult<BookInstance> {
        let returned = sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            UPDATE book_instances
            SET status = 'a', borrower_id = NULL, due_back = NULL
            WHERE id = $1 AND status = 'o'
            RETURNING {}
            "#,
            COPY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match returned {
            Some(copy) => Ok(copy),
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::BusinessRule(format!(
                    "Book instance {} is not on loan ({})",
                    id, current.status
                )))
            }
        }
    }
}
