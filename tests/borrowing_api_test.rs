mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use property_lending::entities::item::ItemStatus;
use serde_json::json;

fn borrow_body(item_id: &str, quantity: i32) -> serde_json::Value {
    json!({
        "itemId": item_id,
        "quantity": quantity,
        "purpose": "Science fair",
        "returnDate": "2030-06-01",
        "department": "Science",
        "borrowerName": "Jordan Lee"
    })
}

#[tokio::test]
async fn full_borrowing_flow_over_http() {
    let app = TestApp::new().await;
    app.seed_item("IT001", 5, ItemStatus::Available).await;

    let response = app
        .request(Method::POST, "/api/v1/borrowings", Some(borrow_body("IT001", 2)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Borrowing request submitted successfully");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["borrower_name"], "Jordan Lee");
    let record_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/borrowings/{}/approve", record_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "approved");

    let response = app.request(Method::GET, "/api/v1/items/IT001", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 3);

    let response = app
        .request(
            Method::POST,
            "/api/v1/borrowings/return",
            Some(json!({ "itemId": "IT001", "condition": "good" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Item returned successfully");
    assert_eq!(body["data"]["status"], "returned");
    assert_eq!(body["data"]["return_condition"], "good");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/borrowings/{}", record_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["item_name"], "Item IT001");
    assert_eq!(body["data"]["item_category"], "Electronics");

    assert_eq!(app.item("IT001").await.quantity, 5);
}

#[tokio::test]
async fn business_errors_carry_a_stable_code() {
    let app = TestApp::new().await;
    app.seed_item("IT002", 1, ItemStatus::Available).await;

    let response = app
        .request(Method::POST, "/api/v1/borrowings", Some(borrow_body("IT002", 2)))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["code"], "insufficient_quantity");
    assert!(body["request_id"].is_string());

    let response = app
        .request(Method::POST, "/api/v1/borrowings/42/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["code"], "not_found");

    let response = app
        .request(
            Method::POST,
            "/api/v1/borrowings/return",
            Some(json!({ "itemId": "IT002", "condition": "good" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["code"], "no_active_loan");
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let app = TestApp::new().await;
    app.seed_item("IT003", 3, ItemStatus::Available).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/borrowings",
            Some(json!({ "itemId": "IT003", "quantity": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "validation_error");

    let response = app
        .request(Method::POST, "/api/v1/borrowings", Some(borrow_body("IT003", 0)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "validation_error");

    assert_eq!(app.item("IT003").await.quantity, 3);
}

#[tokio::test]
async fn list_filters_accept_all_and_reject_unknown_statuses() {
    let app = TestApp::new().await;
    app.seed_item("IT004", 3, ItemStatus::Available).await;
    app.seed_item("IT005", 2, ItemStatus::Unavailable).await;

    let response = app
        .request(Method::GET, "/api/v1/items?status=all", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let response = app
        .request(Method::GET, "/api/v1/items?status=unavailable", None)
        .await;
    let body = response_json(response).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "IT005");

    let response = app
        .request(Method::GET, "/api/v1/items?search=IT004", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .request(Method::GET, "/api/v1/borrowings?status=lost", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_administration_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "name": "Microscope",
                "category": "Lab",
                "department": "Biology",
                "quantity": 2
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "available");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("BIO"));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{}", id),
            Some(json!({
                "name": "Microscope",
                "category": "Lab",
                "department": "Biology",
                "quantity": 4,
                "available": false
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 4);
    assert_eq!(body["data"]["status"], "unavailable");

    let response = app
        .request(Method::DELETE, &format!("/api/v1/items/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_reports_counts_and_activity() {
    let app = TestApp::new().await;
    app.seed_item("IT006", 1, ItemStatus::Available).await;
    app.seed_item("IT007", 4, ItemStatus::Available).await;

    app.request(Method::POST, "/api/v1/borrowings", Some(borrow_body("IT006", 1)))
        .await;
    app.request(Method::POST, "/api/v1/borrowings", Some(borrow_body("IT007", 1)))
        .await;

    let response = app
        .request(Method::GET, "/api/v1/dashboard/stats", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total_items"], 2);
    assert_eq!(body["data"]["available_items"], 1);
    assert_eq!(body["data"]["borrowed_items"], 1);
    assert_eq!(body["data"]["pending_requests"], 2);

    let response = app
        .request(Method::GET, "/api/v1/dashboard/activity?limit=1", None)
        .await;
    let body = response_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "Borrow Requested");
}

#[tokio::test]
async fn request_ids_are_echoed() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert_eq!(body["ready"], true);

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
