use axum::http::StatusCode;
use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use locallibrary_server::{
    forms::today,
    models::{LoanStatus, Permission, User},
};

use crate::common::{json, redirect_location, TestApp};

/// Two readers; only the second may mark books returned
async fn readers(app: &TestApp) -> (User, User) {
    let user1 = app.user("testuser1", "1X<ISRUkw+tuK", &[]).await;
    let user2 = app
        .user("testuser2", "2HJ1vRV0Z&3iD", &[Permission::CanMarkReturned])
        .await;
    (user1, user2)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn my_books_requires_login(pool: PgPool) {
    let app = TestApp::new(pool).await;

    let response = app.get("/catalog/mybooks/", None).await;
    assert_eq!(
        redirect_location(&response),
        "/accounts/login/?next=/catalog/mybooks/"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn my_books_lists_only_own_loans_by_due_date(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (user1, user2) = readers(&app).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;

    let token = app.token("testuser1", "1X<ISRUkw+tuK").await;
    let body = json(app.get("/catalog/mybooks/", Some(&token)).await).await;
    assert_eq!(body["user"], "testuser1");
    assert!(body["items"].as_array().unwrap().is_empty());

    // 30 copies alternating between the two readers, due on different days
    for n in 0..30i64 {
        let borrower = if n % 2 == 0 { &user1 } else { &user2 };
        let due_back = today() + Duration::days(n % 5);
        app.copy(&book, LoanStatus::OnLoan, Some(borrower), Some(due_back))
            .await;
    }
    // user1 also holds a copy that is not on loan
    app.copy(&book, LoanStatus::Maintenance, Some(&user1), None).await;

    let body = json(app.get("/catalog/mybooks/", Some(&token)).await).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 10);
    assert_eq!(body["page"]["count"], 15);
    for item in items {
        assert_eq!(item["borrower_id"], user1.id);
        assert_eq!(item["status"], "o");
    }

    let dates: Vec<&str> = items
        .iter()
        .map(|item| item["due_back"].as_str().unwrap())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    let body = json(app.get("/catalog/mybooks/?page=2", Some(&token)).await).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn all_borrowed_forbids_readers(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (user1, _) = readers(&app).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    app.copy(
        &book,
        LoanStatus::OnLoan,
        Some(&user1),
        Some(today() - Duration::days(1)),
    )
    .await;
    app.copy(&book, LoanStatus::OnLoan, Some(&user1), Some(today()))
        .await;

    let reader = app.token("testuser1", "1X<ISRUkw+tuK").await;
    let response = app.get("/catalog/borrowed/", Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let librarian = app.token("testuser2", "2HJ1vRV0Z&3iD").await;
    let body = json(app.get("/catalog/borrowed/", Some(&librarian)).await).await;
    assert_eq!(body["items"][0]["borrower_username"], "testuser1");
    assert_eq!(body["items"][0]["is_overdue"], true);
    // due today is not yet overdue
    assert_eq!(body["items"][1]["due_back"], today().format("%Y-%m-%d").to_string());
    assert_eq!(body["items"][1]["is_overdue"], false);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn renewal_requires_permission(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (user1, user2) = readers(&app).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    let due_back = Some(today() + Duration::days(5));
    let copy1 = app.copy(&book, LoanStatus::OnLoan, Some(&user1), due_back).await;
    let copy2 = app.copy(&book, LoanStatus::OnLoan, Some(&user2), due_back).await;

    let uri = format!("/catalog/book/{}/renew/", copy1.id);

    let response = app.get(&uri, None).await;
    assert!(redirect_location(&response).starts_with("/accounts/login/"));

    let reader = app.token("testuser1", "1X<ISRUkw+tuK").await;
    let response = app.get(&uri, Some(&reader)).await;
    assert!(redirect_location(&response).starts_with("/accounts/login/"));

    let librarian = app.token("testuser2", "2HJ1vRV0Z&3iD").await;
    let response = app.get(&uri, Some(&librarian)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // a librarian may renew their own loan too
    let response = app
        .get(&format!("/catalog/book/{}/renew/", copy2.id), Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get(&format!("/catalog/book/{}/renew/", Uuid::new_v4()), Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // unknown copies only surface after the permission check
    let response = app
        .get(&format!("/catalog/book/{}/renew/", Uuid::new_v4()), Some(&reader))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn renewal_form_validates_dates(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (user1, _) = readers(&app).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    let copy = app
        .copy(&book, LoanStatus::OnLoan, Some(&user1), Some(today() + Duration::days(5)))
        .await;
    let librarian = app.token("testuser2", "2HJ1vRV0Z&3iD").await;
    let uri = format!("/catalog/book/{}/renew/", copy.id);

    let body = json(app.get(&uri, Some(&librarian)).await).await;
    let three_weeks = (today() + Duration::weeks(3)).format("%Y-%m-%d").to_string();
    assert_eq!(body["form"]["initial"]["renewal_date"], three_weeks.as_str());
    assert_eq!(body["book_instance"]["id"], copy.id.to_string());

    let past = (today() - Duration::weeks(1)).format("%Y-%m-%d").to_string();
    let response = app
        .post_form(&uri, &format!("renewal_date={}", past), Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(
        body["form"]["errors"]["renewal_date"][0],
        "Invalid date - renewal in past"
    );

    let far = (today() + Duration::weeks(5)).format("%Y-%m-%d").to_string();
    let response = app
        .post_form(&uri, &format!("renewal_date={}", far), Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(
        body["form"]["errors"]["renewal_date"][0],
        "Invalid date - renewal more than 4 weeks ahead"
    );

    let two_weeks = today() + Duration::weeks(2);
    let response = app
        .post_form(
            &uri,
            &format!("renewal_date={}", two_weeks.format("%Y-%m-%d")),
            Some(&librarian),
        )
        .await;
    assert_eq!(redirect_location(&response), "/catalog/borrowed/");

    let renewed = app.copy_by_id(copy.id).await;
    assert_eq!(renewed.due_back, Some(two_weeks));
    assert_eq!(renewed.status, LoanStatus::OnLoan);
    assert_eq!(renewed.borrower_id, Some(user1.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn lend_and_return_a_copy(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (user1, _) = readers(&app).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    let copy = app.copy(&book, LoanStatus::Available, None, None).await;
    let librarian = app.token("testuser2", "2HJ1vRV0Z&3iD").await;

    let borrow = format!("/catalog/book/{}/borrow/", copy.id);
    let give_back = format!("/catalog/book/{}/return/", copy.id);

    let response = app
        .post_form(&borrow, "borrower=9999", Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["form"]["errors"]["borrower"].is_array());

    let response = app
        .post_form(&borrow, &format!("borrower={}", user1.id), Some(&librarian))
        .await;
    assert_eq!(redirect_location(&response), "/catalog/borrowed/");

    let lent = app.copy_by_id(copy.id).await;
    assert_eq!(lent.status, LoanStatus::OnLoan);
    assert_eq!(lent.borrower_id, Some(user1.id));
    assert_eq!(lent.due_back, Some(today() + Duration::weeks(3)));

    let response = app
        .post_form(&borrow, &format!("borrower={}", user1.id), Some(&librarian))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.post_form(&give_back, "", Some(&librarian)).await;
    assert_eq!(redirect_location(&response), "/catalog/borrowed/");

    let returned = app.copy_by_id(copy.id).await;
    assert_eq!(returned.status, LoanStatus::Available);
    assert_eq!(returned.borrower_id, None);
    assert_eq!(returned.due_back, None);

    let response = app.post_form(&give_back, "", Some(&librarian)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
