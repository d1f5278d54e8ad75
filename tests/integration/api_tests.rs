//! API integration tests
//!
//! Drive the full router in-process over the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_lending_server::{
    api,
    config::AppConfig,
    events::LoggingPublisher,
    repository::Repository,
    services::{ManualClock, Services},
    AppState,
};

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));
        let services = Services::new(
            Repository::in_memory(),
            Arc::new(LoggingPublisher),
            clock.clone(),
            &config.lending,
        );
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };

        Self {
            router: api::create_router(state),
            clock,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(format!("/api/v1{}", uri));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None).await
    }

    async fn create_book(&self, isbn: &str, title: &str, copies: i32) -> Value {
        let (status, body) = self
            .post(
                "/books",
                json!({
                    "isbn": isbn,
                    "title": title,
                    "author": "Leila Slimani",
                    "publisher": "Gallimard",
                    "publicationYear": 2016,
                    "genre": "Novel",
                    "totalCopies": copies
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn register(&self, email: &str, membership_type: Value) -> Value {
        let (status, body) = self
            .post(
                "/members",
                json!({
                    "firstName": "Omar",
                    "lastName": "Tazi",
                    "email": email,
                    "phone": "+212712345678",
                    "address": "21 Boulevard Zerktouni, Casablanca",
                    "membershipType": membership_type
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn borrow(&self, book: &Value, member: &Value) -> (StatusCode, Value) {
        self.post(
            "/transactions/borrow",
            json!({ "bookId": book["id"], "memberId": member["id"] }),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_get_and_search_books() {
    let app = TestApp::new();
    let book = app.create_book("9782070468768", "Chanson douce", 2).await;

    assert_eq!(book["availableCopies"], 2);
    assert_eq!(book["status"], "Available");

    let (status, fetched) = app.get(&format!("/books/{}", book["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["isbn"], "9782070468768");

    app.create_book("9782070178582", "Dans le jardin de l'ogre", 1).await;

    let (status, found) = app.get("/books/search?search_term=CHANSON").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "Chanson douce");
    assert_eq!(found[0]["isAvailable"], true);

    let (_, all) = app.get("/books").await;
    let titles: Vec<&str> = all.as_array().unwrap().iter().map(|b| b["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Chanson douce", "Dans le jardin de l'ogre"]);
}

#[tokio::test]
async fn test_duplicate_isbn_conflict() {
    let app = TestApp::new();
    app.create_book("9782070468768", "Chanson douce", 2).await;

    let (status, body) = app
        .post(
            "/books",
            json!({
                "isbn": "9782070468768",
                "title": "Copy",
                "author": "Someone",
                "publisher": "Someone",
                "publicationYear": 2016,
                "genre": "Novel",
                "totalCopies": 1
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "Book.IsbnAlreadyExists");

    let (_, all) = app.get("/books").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_book_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/books",
            json!({
                "isbn": "not-an-isbn",
                "title": "",
                "author": "A",
                "publisher": "P",
                "publicationYear": 2016,
                "genre": "Novel",
                "totalCopies": 0
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "Request.Invalid");
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn test_short_isbn_rejected() {
    let app = TestApp::new();
    for isbn in ["1234", "1-2-3-4", "ISBN-13: 978-0-547-92822"] {
        let (status, body) = app
            .post(
                "/books",
                json!({
                    "isbn": isbn,
                    "title": "Chanson douce",
                    "author": "Leila Slimani",
                    "publisher": "Gallimard",
                    "publicationYear": 2016,
                    "genre": "Novel",
                    "totalCopies": 1
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", isbn);
        assert_eq!(body["code"], "Request.Invalid");
    }

    let book = app.create_book("ISBN-13: 978-2-07-046876-8", "Chanson douce", 1).await;
    assert_eq!(book["isbn"], "ISBN-13: 978-2-07-046876-8");

    let (_, all) = app.get("/books").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_book_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/books/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "Book.NotFound");
}

#[tokio::test]
async fn test_register_and_list_members() {
    let app = TestApp::new();
    let member = app.register("omar@example.com", json!("Student")).await;
    assert_eq!(member["membershipNumber"], "MEM20240001");
    assert_eq!(member["isActive"], true);

    let by_code = app.register("other@example.com", json!(3)).await;
    assert_eq!(by_code["membershipType"], "Staff");

    let (status, body) = app
        .post(
            "/members",
            json!({
                "firstName": "Omar",
                "lastName": "Tazi",
                "email": "OMAR@example.com",
                "phone": "0612345678",
                "address": "Rabat",
                "membershipType": "Adult"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "Member.EmailAlreadyExists");

    let (status, _) = app.post_empty(&format!("/members/{}/deactivate", by_code["id"])).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = app.get("/members").await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["borrowingLimit"], 3);
}

#[tokio::test]
async fn test_borrow_and_late_return_charges_fine() {
    let app = TestApp::new();
    let book = app.create_book("9782070468768", "Chanson douce", 1).await;
    let member = app.register("omar@example.com", json!("Adult")).await;

    let (status, loan) = app.borrow(&book, &member).await;
    assert_eq!(status, StatusCode::OK, "{}", loan);
    assert_eq!(loan["status"], "Active");

    let (_, shelf) = app.get(&format!("/books/{}", book["id"])).await;
    assert_eq!(shelf["status"], "AllBorrowed");

    app.clock.advance(Duration::days(21 + 5));
    let (status, returned) = app.post_empty(&format!("/transactions/return/{}", loan["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "Returned");
    assert_eq!(returned["fineAmount"], "10.00");

    let (status, again) = app.post_empty(&format!("/transactions/return/{}", loan["id"])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["code"], "BorrowingTransaction.NotActive");

    let (status, history) = app
        .get(&format!("/transactions/member/{}/history", member["id"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["bookTitle"], "Chanson douce");
    assert_eq!(history[0]["memberName"], "Omar Tazi");
    assert_eq!(history[0]["isOverdue"], false);
}

#[tokio::test]
async fn test_borrow_rejections_map_to_statuses() {
    let app = TestApp::new();
    let book = app.create_book("9782070468768", "Chanson douce", 1).await;
    let holder = app.register("holder@example.com", json!("Adult")).await;
    let other = app.register("other@example.com", json!("Adult")).await;

    let (status, _) = app.borrow(&book, &holder).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.borrow(&book, &holder).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BorrowingTransaction.AlreadyBorrowed");

    let (status, body) = app.borrow(&book, &other).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BorrowingTransaction.BookNotAvailable");

    app.post_empty(&format!("/members/{}/deactivate", other["id"])).await;
    let (status, body) = app.borrow(&book, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "Member.NotActive");

    let (status, body) = app
        .post("/transactions/borrow", json!({ "bookId": 999, "memberId": holder["id"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "Book.NotFound");

    let (status, _) = app
        .post("/transactions/borrow", json!({ "bookId": 0, "memberId": holder["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_of_unknown_member_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/transactions/member/42/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "Member.NotFound");
}
