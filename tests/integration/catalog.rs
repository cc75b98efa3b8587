use axum::http::{header, Request, StatusCode};
use sqlx::PgPool;

use locallibrary_server::models::{LoanStatus, Permission};

use crate::common::{json, redirect_location, TestApp};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn author_list_paginates_by_ten(pool: PgPool) {
    let app = TestApp::new(pool).await;
    for n in 0..13 {
        app.author(&format!("Christian {}", n), &format!("Surname {}", n)).await;
    }

    let response = app.get("/catalog/authors/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["is_paginated"], true);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["page"]["num_pages"], 2);
    assert_eq!(body["page"]["has_next"], true);

    let body = json(app.get("/catalog/authors/?page=2", None).await).await;
    assert_eq!(body["is_paginated"], true);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["page"]["has_previous"], true);

    let body = json(app.get("/catalog/authors/?page=last", None).await).await;
    assert_eq!(body["page"]["number"], 2);

    for bad in ["3", "0", "two"] {
        let response = app.get(&format!("/catalog/authors/?page={}", bad), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "page={}", bad);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn empty_lists_have_one_page(pool: PgPool) {
    let app = TestApp::new(pool).await;

    let body = json(app.get("/catalog/books/", None).await).await;
    assert_eq!(body["is_paginated"], false);
    assert_eq!(body["page"]["number"], 1);
    assert_eq!(body["page"]["count"], 0);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn root_redirects_to_catalog(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let response = app.get("/", None).await;
    assert_eq!(redirect_location(&response), "/catalog/");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn index_counts_and_visits(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("The Book Title", &author).await;
    app.book("Second Volume", &author).await;
    app.copy(&book, LoanStatus::Available, None, None).await;
    app.copy(&book, LoanStatus::Maintenance, None, None).await;

    let response = app.get("/catalog/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sessionid="));

    let body = json(response).await;
    assert_eq!(body["num_books"], 2);
    assert_eq!(body["num_instances"], 2);
    assert_eq!(body["num_instances_available"], 1);
    assert_eq!(body["num_authors"], 1);
    assert_eq!(body["num_genres"], 0);
    assert_eq!(body["search_word"], "the");
    assert_eq!(body["num_books_with_word"], 1);
    assert_eq!(body["num_visits"], 1);

    let again = Request::builder()
        .uri("/catalog/?word=o")
        .header(header::COOKIE, &cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let body = json(app.send(again).await).await;
    assert_eq!(body["num_visits"], 2);
    assert_eq!(body["num_books_with_word"], 2);

    // a new session starts counting again
    let body = json(app.get("/catalog/", None).await).await;
    assert_eq!(body["num_visits"], 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn book_detail_lists_copies(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    app.copy(&book, LoanStatus::Available, None, None).await;

    let body = json(app.get(&format!("/catalog/book/{}", book.id), None).await).await;
    assert_eq!(body["book"]["title"], "Book Title");
    assert_eq!(body["author"]["last_name"], "Smith");
    assert_eq!(body["copies"].as_array().unwrap().len(), 1);
    assert_eq!(body["copies"][0]["status"], "a");

    let body = json(app.get(&format!("/catalog/author/{}", author.id), None).await).await;
    assert_eq!(body["name"], "Smith, John");
    assert_eq!(body["books"][0]["title"], "Book Title");

    let response = app.get("/catalog/book/9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/catalog/author/9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn author_create_requires_permission(pool: PgPool) {
    let app = TestApp::new(pool).await;
    app.user("testuser1", "1X<ISRUkw+tuK", &[]).await;
    app.user("testuser2", "2HJ1vRV0Z&3iD", &[Permission::AddAuthor]).await;

    let response = app.get("/catalog/author/create/", None).await;
    assert_eq!(
        redirect_location(&response),
        "/accounts/login/?next=/catalog/author/create/"
    );

    let reader = app.token("testuser1", "1X<ISRUkw+tuK").await;
    let response = app.get("/catalog/author/create/", Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = app
        .post_form("/catalog/author/create/", "first_name=A&last_name=B", Some(&reader))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let librarian = app.token("testuser2", "2HJ1vRV0Z&3iD").await;
    let response = app.get("/catalog/author/create/", Some(&librarian)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert!(body["data"].is_null());
    assert!(body["errors"].as_object().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn author_create_redirects_to_new_author(pool: PgPool) {
    let app = TestApp::new(pool).await;
    app.user("testuser2", "2HJ1vRV0Z&3iD", &[Permission::AddAuthor]).await;
    let token = app.token("testuser2", "2HJ1vRV0Z&3iD").await;
    let before = app.repository().authors.count().await.unwrap();

    let response = app
        .post_form(
            "/catalog/author/create/",
            "first_name=Christian&last_name=Surname&date_of_birth=1950-01-31",
            Some(&token),
        )
        .await;
    let location = redirect_location(&response);
    assert!(location.starts_with("/catalog/author/"));
    assert_eq!(app.repository().authors.count().await.unwrap(), before + 1);

    let body = json(app.get(&location, None).await).await;
    assert_eq!(body["author"]["first_name"], "Christian");
    assert_eq!(body["author"]["date_of_birth"], "1950-01-31");

    // invalid form: shown again, nothing saved
    let response = app
        .post_form(
            "/catalog/author/create/",
            "first_name=&last_name=Surname&date_of_birth=31/01/1950",
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["errors"]["first_name"][0], "This field is required.");
    assert_eq!(body["errors"]["date_of_birth"][0], "Enter a valid date.");
    assert_eq!(body["data"]["last_name"], "Surname");
    assert_eq!(app.repository().authors.count().await.unwrap(), before + 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn author_update_changes_fields(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let author = app.author("John", "Smith").await;
    app.user("editor", "editor-pass", &[Permission::ChangeAuthor]).await;
    let token = app.token("editor", "editor-pass").await;

    let uri = format!("/catalog/author/{}/update/", author.id);
    let body = json(app.get(&uri, Some(&token)).await).await;
    assert_eq!(body["initial"]["first_name"], "John");

    let response = app
        .post_form(&uri, "first_name=Jane&last_name=Smith&date_of_death=1990-05-05", Some(&token))
        .await;
    assert_eq!(redirect_location(&response), format!("/catalog/author/{}", author.id));

    let updated = app.repository().authors.get_by_id(author.id).await.unwrap();
    assert_eq!(updated.first_name, "Jane");

    let response = app
        .post_form("/catalog/author/9999/update/", "first_name=A&last_name=B", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn book_create_with_genres(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let author = app.author("John", "Smith").await;
    let fantasy = app.repository().genres.create("Fantasy").await.unwrap();
    let poetry = app.repository().genres.create("Poetry").await.unwrap();
    let english = app.repository().languages.create("English").await.unwrap();
    app.user("cataloguer", "cat-pass", &[Permission::AddBook]).await;
    let token = app.token("cataloguer", "cat-pass").await;

    let body = format!(
        "title=Book+Title&summary=My+book+summary&isbn=ABCDEFG&author={}&genre={}&genre={}&language={}",
        author.id, fantasy.id, poetry.id, english.id
    );
    let response = app.post_form("/catalog/book/create/", &body, Some(&token)).await;
    let location = redirect_location(&response);

    let detail = json(app.get(&location, None).await).await;
    assert_eq!(detail["display_genre"], "Fantasy, Poetry");
    assert_eq!(detail["language"]["name"], "English");

    // references to missing rows are form errors
    let body = "title=T&summary=S&isbn=1&author=9999&genre=9999";
    let response = app.post_form("/catalog/book/create/", body, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let errors = json(response).await["errors"].clone();
    assert!(errors["author"].is_array());
    assert!(errors["genre"].is_array());
    assert_eq!(app.repository().books.count().await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn copies_are_added_to_books(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let author = app.author("John", "Smith").await;
    let book = app.book("Book Title", &author).await;
    app.user("cataloguer", "cat-pass", &[Permission::AddBookInstance]).await;
    let token = app.token("cataloguer", "cat-pass").await;

    let uri = format!("/catalog/book/{}/copy/create/", book.id);
    let response = app
        .post_form(&uri, "imprint=Folio+Society&status=a", Some(&token))
        .await;
    assert_eq!(redirect_location(&response), format!("/catalog/book/{}", book.id));

    let response = app.post_form(&uri, "imprint=Folio&status=o", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form("/catalog/book/9999/copy/create/", "imprint=Folio", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // a missing book wins over a blank form
    let response = app
        .post_form("/catalog/book/9999/copy/create/", "imprint=", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        app.repository()
            .book_instances
            .count_by_status(LoanStatus::Available)
            .await
            .unwrap(),
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn duplicate_genre_conflicts(pool: PgPool) {
    let app = TestApp::new(pool).await;
    app.user("cataloguer", "cat-pass", &[Permission::AddGenre]).await;
    let token = app.token("cataloguer", "cat-pass").await;

    let response = app
        .post_form("/catalog/genre/create/", "name=Fantasy", Some(&token))
        .await;
    assert_eq!(redirect_location(&response), "/catalog/genres/");

    let response = app
        .post_form("/catalog/genre/create/", "name=Fantasy", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let genres = json(app.get("/catalog/genres/", None).await).await;
    assert_eq!(genres.as_array().unwrap().len(), 1);

    let response = app
        .post_form("/catalog/language/create/", "name=English", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
