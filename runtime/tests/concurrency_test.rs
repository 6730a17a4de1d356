//! Concurrent bookings and flight creation must never oversell or exceed the daily cap.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use airline_booking_core::types::{
    BookingView, FareClassKey, FareClassTag, FlightId, FlightRequest, PassengerRequest, Principal,
    User,
};
use airline_booking_core::BookingError;
use airline_booking_runtime::{BookingEngine, EngineConfig};
use airline_booking_testing::{fixtures, InMemoryStorage};
use chrono::Duration;
use common::{create_flight, engine, engine_with, thy_staff};
use std::sync::Arc;
use tokio::sync::Barrier;

fn small_flight(seats: u32) -> FlightRequest {
    let mut request = fixtures::reference_request();
    request.fare_classes[0].seat_count = seats;
    request
}

/// Books one economy seat per customer from `customers` tasks released together.
///
/// Commits are delayed so every transaction reads the inventory before any of
/// them commits.
async fn race_single_seat_bookings(
    storage: &InMemoryStorage,
    engine: &Arc<BookingEngine<InMemoryStorage>>,
    flight_id: FlightId,
    customers: usize,
) -> Vec<Result<BookingView, BookingError>> {
    for n in 0..customers {
        storage.upsert_user(User::customer(format!("customer-{n}"))).unwrap();
    }
    storage.delay_commits(std::time::Duration::from_millis(50));

    let start = Arc::new(Barrier::new(customers));
    let handles: Vec<_> = (0..customers)
        .map(|n| {
            let engine = Arc::clone(engine);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                let principal = Principal::new(format!("customer-{n}"));
                let passengers = [PassengerRequest::new(
                    format!("Passenger{n}"),
                    "Doe",
                    format!("p{n}@example.com"),
                    FareClassTag::Economy,
                )];
                start.wait().await;
                engine.bookings.book_flight(&principal, flight_id, &passengers).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(customers);
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

fn is_sold_out(error: &BookingError) -> bool {
    matches!(
        error,
        BookingError::InsufficientInventory {
            requested: 1,
            available: 0,
            ..
        }
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_goes_to_exactly_one_booking() {
    let storage = fixtures::seeded_storage();
    let engine = Arc::new(engine(&storage));
    let flight = create_flight(&engine, &small_flight(4)).await;

    let results = race_single_seat_bookings(&storage, &engine, flight.id, 5).await;

    let confirmed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(confirmed, 4);
    let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(losers.len(), 1);
    assert!(losers.iter().all(|e| is_sold_out(e)), "{losers:?}");

    // The loser read 4 free seats and only lost at commit.
    assert!(storage.conflict_count() > 0);

    let economy = storage
        .fare_class(FareClassKey::new(flight.id, FareClassTag::Economy))
        .unwrap()
        .unwrap();
    assert_eq!(economy.available_seats, 0);
    assert_eq!(storage.bookings().unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_default_retry_turns_lost_races_into_sold_out() {
    const SEATS: u32 = 10;
    const CUSTOMERS: usize = 24;

    let storage = fixtures::seeded_storage();
    let engine = Arc::new(engine_with(&storage, &EngineConfig::default()));
    let flight = create_flight(&engine, &small_flight(SEATS)).await;

    let results = race_single_seat_bookings(&storage, &engine, flight.id, CUSTOMERS).await;

    let confirmed = results.iter().filter(|r| r.is_ok()).count();
    for error in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(is_sold_out(error), "unexpected error: {error}");
    }
    assert_eq!(confirmed, SEATS as usize);
    assert!(storage.conflict_count() > 0);

    let economy = storage
        .fare_class(FareClassKey::new(flight.id, FareClassTag::Economy))
        .unwrap()
        .unwrap();
    assert_eq!(economy.available_seats, 0);
    assert_eq!(storage.bookings().unwrap().len(), SEATS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_creation_respects_daily_cap() {
    let storage = fixtures::seeded_storage();
    let engine = Arc::new(engine(&storage));

    let handles: Vec<_> = (0..5i64)
        .map(|n| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let request = FlightRequest {
                    departure_time: fixtures::reference_departure() + Duration::minutes(30 * n),
                    ..fixtures::reference_request()
                };
                engine.flights.create_flight(&thy_staff(), &request).await
            })
        })
        .collect();

    let mut created = 0;
    let mut capped = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(error) => {
                assert!(
                    matches!(error, BookingError::LimitExceeded { .. }),
                    "unexpected error: {error}"
                );
                capped += 1;
            }
        }
    }

    assert_eq!((created, capped), (3, 2));
    assert_eq!(storage.flight_count().unwrap(), 3);
}
