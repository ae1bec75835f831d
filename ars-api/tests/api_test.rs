use std::sync::Arc;

use ars_api::middleware::issue_token;
use ars_api::{app, AppState, AuthConfig};
use ars_booking::Stores;
use ars_core::{Flight, Schedule, User};
use ars_shared::Masked;
use ars_store::{BusinessRules, InMemoryStore};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

struct Fixture {
    router: Router,
    flight: Flight,
    date: NaiveDate,
    alice: Uuid,
    bob: Uuid,
}

fn user(first: &str, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        email: Masked::new(email.to_string()),
    }
}

async fn fixture(total_seats: i32) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let date = Utc::now().date_naive() + Duration::days(10);
    let departure = Utc::now() + Duration::days(10);
    let flight = Flight {
        id: Uuid::new_v4(),
        flight_number: "AR100".to_string(),
        origin_code: "HAN".to_string(),
        destination_code: "SGN".to_string(),
        departure_time: departure,
        arrival_time: departure + Duration::minutes(125),
        duration_minutes: 125,
        aircraft_type: "A321".to_string(),
        total_seats,
        base_fare_cents: 10000,
        seat_layout_id: None,
    };
    let alice = user("Alice", "alice@example.com");
    let bob = user("Bob", "bob@example.com");

    store.add_flight(flight.clone()).await;
    store.add_schedule(Schedule::new(flight.id, date)).await;
    store.add_user(alice.clone()).await;
    store.add_user(bob.clone()).await;

    let state = AppState::new(
        Stores::shared(store),
        BusinessRules::default(),
        AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
        "http://localhost:3000",
        None,
    );

    Fixture {
        router: app(state),
        flight,
        date,
        alice: alice.id,
        bob: bob.id,
    }
}

async fn call(router: &Router, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        let token = issue_token(SECRET, id, 3600).unwrap();
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn book(fx: &Fixture, user: Uuid, adults: i32) -> (StatusCode, Value) {
    let body = json!({
        "flight_id": fx.flight.id,
        "travel_date": fx.date,
        "adults": adults,
    });
    call(&fx.router, Method::POST, "/v1/reservations", Some(user), Some(body)).await
}

#[tokio::test]
async fn test_health() {
    let fx = fixture(10).await;
    let (status, body) = call(&fx.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_prices_and_counts_seats() {
    let fx = fixture(10).await;
    book(&fx, fx.alice, 2).await;

    let uri = format!("/v1/flights/search?origin=han&destination=SGN&date={}&adults=1", fx.date);
    let (status, body) = call(&fx.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let options = body.as_array().unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0]["flight_number"], "AR100");
    assert_eq!(options[0]["available_seats"], 8);
    assert_eq!(options[0]["total_price_cents"], 12000);
}

#[tokio::test]
async fn test_booking_requires_login() {
    let fx = fixture(10).await;
    let body = json!({ "flight_id": fx.flight.id, "travel_date": fx.date });
    let (status, body) = call(&fx.router, Method::POST, "/v1/reservations", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_create_and_confirm() {
    let fx = fixture(10).await;
    let (status, body) = book(&fx, fx.alice, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reservation"]["status"], "PENDING");
    assert_eq!(body["total_price_cents"], 24000);
    let id = body["reservation"]["id"].as_str().unwrap().to_string();

    let uri = format!("/v1/reservations/{}/confirm", id);
    let (status, first) = call(&fx.router, Method::POST, &uri, Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "CONFIRMED");
    assert!(first["confirmation_number"].is_string());

    // confirming twice keeps the number
    let (status, second) = call(&fx.router, Method::POST, &uri, Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["confirmation_number"], first["confirmation_number"]);

    let (status, list) = call(&fx.router, Method::GET, "/v1/reservations", Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, notes) = call(&fx.router, Method::GET, "/v1/notifications", Some(fx.alice), None).await;
    let subjects: Vec<&str> = notes
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["subject"].as_str())
        .collect();
    assert_eq!(subjects, vec!["Booking confirmed"]);
}

#[tokio::test]
async fn test_other_users_reservation_is_forbidden() {
    let fx = fixture(10).await;
    let (_, body) = book(&fx, fx.alice, 1).await;
    let id = body["reservation"]["id"].as_str().unwrap().to_string();

    let uri = format!("/v1/reservations/{}/cancel", id);
    let (status, body) = call(&fx.router, Method::POST, &uri, Some(fx.bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "FORBIDDEN");

    let uri = format!("/v1/reservations/{}", Uuid::new_v4());
    let (status, body) = call(&fx.router, Method::GET, &uri, Some(fx.bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_capacity_exceeded_is_bad_request() {
    let fx = fixture(3).await;
    let (status, _) = book(&fx, fx.alice, 2).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = book(&fx, fx.bob, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn test_confirm_cancelled_is_conflict() {
    let fx = fixture(10).await;
    let (_, body) = book(&fx, fx.alice, 1).await;
    let id = body["reservation"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&fx.router, Method::POST, &format!("/v1/reservations/{}/cancel", id), Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");

    let (status, body) = call(&fx.router, Method::POST, &format!("/v1/reservations/{}/confirm", id), Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn test_gateway_flow_confirms_once() {
    let fx = fixture(10).await;
    let (_, body) = book(&fx, fx.alice, 1).await;
    let reservation_id = body["reservation"]["id"].as_str().unwrap().to_string();

    let req = json!({ "reservation_id": reservation_id, "amount_cents": 12000 });
    let (status, session) = call(&fx.router, Method::POST, "/v1/payments/gateway/initiate", Some(fx.alice), Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);
    let success_url = session["success_url"].as_str().unwrap();
    assert!(success_url.starts_with("http://localhost:3000/v1/payments/gateway/callback?payment_id="));

    let callback = success_url.trim_start_matches("http://localhost:3000");
    let (status, outcome) = call(&fx.router, Method::GET, callback, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["payment"]["status"], "COMPLETED");
    assert_eq!(outcome["reservation"]["status"], "CONFIRMED");

    let (status, body) = call(&fx.router, Method::GET, callback, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");

    let uri = format!("/v1/reservations/{}/payments", reservation_id);
    let (_, payments) = call(&fx.router, Method::GET, &uri, Some(fx.alice), None).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_seat_map_without_layout() {
    let fx = fixture(12).await;
    book(&fx, fx.alice, 2).await;

    let uri = format!("/v1/flights/{}/seat-map?date={}", fx.flight.id, fx.date);
    let (status, body) = call(&fx.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 2);
    assert_eq!(body["seats_per_row"], 6);

    let free = body["rows_result"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row["seats"].as_array().unwrap().iter())
        .filter(|seat| seat["available"] == true)
        .count();
    assert_eq!(free, 10);
}

#[tokio::test]
async fn test_flight_details_and_airports() {
    let fx = fixture(10).await;
    book(&fx, fx.alice, 3).await;

    let uri = format!("/v1/flights/{}?date={}", fx.flight.id, fx.date);
    let (status, body) = call(&fx.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flight_number"], "AR100");
    assert_eq!(body["available_seats"], 7);

    let uri = format!("/v1/flights/{}?date={}", fx.flight.id, fx.date + Duration::days(1));
    let (status, body) = call(&fx.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");

    let (status, body) = call(&fx.router, Method::GET, "/v1/airports", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["HAN", "SGN"]));
}

#[tokio::test]
async fn test_price_calculation() {
    let fx = fixture(10).await;
    let uri = format!("/v1/flights/{}/price", fx.flight.id);

    let req = json!({ "date": fx.date, "adults": 2 });
    let (status, body) = call(&fx.router, Method::POST, &uri, None, Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_cents"], 24000);
    assert_eq!(body["days_before_departure"], 10);

    let req = json!({ "date": fx.date, "adults": 0 });
    let (status, body) = call(&fx.router, Method::POST, &uri, None, Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn test_status_update_goes_through_lifecycle() {
    let fx = fixture(10).await;
    let (_, body) = book(&fx, fx.alice, 1).await;
    let id = body["reservation"]["id"].as_str().unwrap().to_string();

    let uri = format!("/v1/reservations/{}/status?status=confirmed", id);
    let (status, _) = call(&fx.router, Method::POST, &uri, Some(fx.bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&fx.router, Method::POST, &uri, Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMED");
    assert!(body["confirmation_number"].is_string());

    let uri = format!("/v1/reservations/{}/status?status=pending", id);
    let (status, _) = call(&fx.router, Method::POST, &uri, Some(fx.alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_hold_is_bad_request() {
    let fx = fixture(10).await;
    let body = json!({
        "flight_id": fx.flight.id,
        "travel_date": fx.date,
        "hold_minutes": i64::MAX,
    });
    let (status, body) = call(&fx.router, Method::POST, "/v1/reservations/hold", Some(fx.alice), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn test_gateway_success_on_cancelled_reservation_is_conflict() {
    let fx = fixture(10).await;
    let (_, body) = book(&fx, fx.alice, 1).await;
    let reservation_id = body["reservation"]["id"].as_str().unwrap().to_string();

    let req = json!({ "reservation_id": reservation_id, "amount_cents": 12000 });
    let (_, session) = call(&fx.router, Method::POST, "/v1/payments/gateway/initiate", Some(fx.alice), Some(req)).await;
    let callback = session["success_url"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://localhost:3000")
        .to_string();

    let uri = format!("/v1/reservations/{}/cancel", reservation_id);
    call(&fx.router, Method::POST, &uri, Some(fx.alice), None).await;

    let (status, body) = call(&fx.router, Method::GET, &callback, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "INVALID_STATE");

    let uri = format!("/v1/reservations/{}/payments", reservation_id);
    let (_, payments) = call(&fx.router, Method::GET, &uri, Some(fx.alice), None).await;
    assert_eq!(payments[0]["status"], "FAILED");
}
