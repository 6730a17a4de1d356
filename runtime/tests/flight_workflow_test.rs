//! Flight service tests: daily cap, authorization, resizing, search and statistics.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use airline_booking_core::inventory::SeatCounts;
use airline_booking_core::types::{
    FareClassKey, FareClassRequest, FareClassTag, FlightId, FlightRequest, Money, Principal,
};
use airline_booking_core::BookingError;
use airline_booking_runtime::FlightFilter;
use airline_booking_testing::fixtures;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use common::{create_flight, create_reference_flight, customer, engine, pgs_staff, thy_staff};

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, day, hour, minute, 0).unwrap()
}

fn departing(departure: DateTime<Utc>) -> FlightRequest {
    FlightRequest {
        departure_time: departure,
        ..fixtures::reference_request()
    }
}

// ============================================================================
// Daily flight cap
// ============================================================================

#[tokio::test]
async fn test_fourth_flight_on_same_local_day_is_rejected() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    // Istanbul is UTC+3: all of these are on 2025-12-25 local time.
    for departure in [at(25, 6, 0), at(25, 10, 0), at(25, 14, 0)] {
        create_flight(&engine, &departing(departure)).await;
    }

    let error = engine
        .flights
        .create_flight(&thy_staff(), &departing(at(25, 20, 59)))
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::LimitExceeded { limit: 3, .. }));
    assert_eq!(
        error.to_string(),
        "Cannot schedule the flight: the maximum of 3 daily flights for the route IST to CDG \
         by airline THY has been reached"
    );
    assert_eq!(storage.flight_count().unwrap(), 3);

    // 21:30 UTC is 00:30 on the 26th in Istanbul.
    create_flight(&engine, &departing(at(25, 21, 30))).await;
    assert_eq!(storage.flight_count().unwrap(), 4);
}

#[tokio::test]
async fn test_cap_is_per_route_and_airline() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    for hour in [6, 10, 14] {
        create_flight(&engine, &departing(at(25, hour, 0))).await;
    }

    let mut other_destination = departing(at(25, 16, 0));
    other_destination.destination = fixtures::airport("LHR");
    create_flight(&engine, &other_destination).await;

    let mut other_airline = departing(at(25, 16, 0));
    other_airline.airline = fixtures::airline("PGS");
    engine
        .flights
        .create_flight(&pgs_staff(), &other_airline)
        .await
        .unwrap();

    assert_eq!(storage.flight_count().unwrap(), 5);
}

#[tokio::test]
async fn test_cosmetic_update_skips_daily_limit() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    let first = create_flight(&engine, &departing(at(25, 6, 0))).await;
    create_flight(&engine, &departing(at(25, 10, 0))).await;
    create_flight(&engine, &departing(at(25, 14, 0))).await;

    let mut later = departing(at(25, 7, 15));
    later.duration_minutes = 240;
    let updated = engine
        .flights
        .update_flight(&thy_staff(), first.id, &later)
        .await
        .unwrap();

    assert_eq!(updated.departure_time, at(25, 7, 15));
    assert_eq!(updated.arrival_time, at(25, 11, 15));
}

#[tokio::test]
async fn test_seat_and_price_update_on_full_day_succeeds() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    create_flight(&engine, &departing(at(25, 6, 0))).await;
    let middle = create_flight(&engine, &departing(at(25, 10, 0))).await;
    create_flight(&engine, &departing(at(25, 14, 0))).await;

    let mut resized = departing(at(25, 10, 0));
    resized.fare_classes[0].seat_count = 120;
    resized.fare_classes[0].price = Money::from_cents(17_500);
    let updated = engine
        .flights
        .update_flight(&thy_staff(), middle.id, &resized)
        .await
        .unwrap();

    let economy = updated.fare_class(FareClassTag::Economy).unwrap();
    assert_eq!((economy.seat_count, economy.available_seats), (120, 120));
    assert_eq!(economy.price, Money::from_cents(17_500));
    assert_eq!(updated.departure_time, at(25, 10, 0));
    assert_eq!(storage.flight_count().unwrap(), 3);
}

#[tokio::test]
async fn test_moving_into_full_day_is_rejected() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    for hour in [6, 10, 14] {
        create_flight(&engine, &departing(at(25, hour, 0))).await;
    }
    let next_day = create_flight(&engine, &departing(at(26, 10, 0))).await;

    let error = engine
        .flights
        .update_flight(&thy_staff(), next_day.id, &departing(at(25, 18, 0)))
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::LimitExceeded { .. }));
    let unchanged = engine.flights.get_flight(next_day.id).await.unwrap();
    assert_eq!(unchanged.departure_time, at(26, 10, 0));
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_only_staff_of_owning_airline_may_mutate() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let request = fixtures::reference_request();

    for principal in [customer(), pgs_staff(), Principal::new("ghost")] {
        let error = engine.flights.create_flight(&principal, &request).await.unwrap_err();
        assert!(matches!(error, BookingError::Unauthorized { .. }), "{principal:?}");
    }
    assert_eq!(storage.flight_count().unwrap(), 0);

    let flight = create_reference_flight(&engine).await;

    assert!(matches!(
        engine.flights.update_flight(&pgs_staff(), flight.id, &request).await,
        Err(BookingError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.flights.delete_flight(&customer(), flight.id).await,
        Err(BookingError::Unauthorized { .. })
    ));
    assert!(engine.flights.get_flight(flight.id).await.is_ok());
}

#[tokio::test]
async fn test_airline_cannot_change_on_update() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let flight = create_reference_flight(&engine).await;

    let mut moved = fixtures::reference_request();
    moved.airline = fixtures::airline("PGS");
    let error = engine
        .flights
        .update_flight(&thy_staff(), flight.id, &moved)
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::Unauthorized { .. }));
    assert!(error.to_string().contains("cannot change airline"));
}

#[tokio::test]
async fn test_unknown_flight_is_not_found() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let missing = FlightId::new();

    assert!(matches!(
        engine.flights.get_flight(missing).await,
        Err(BookingError::NotFound { entity: "Flight", .. })
    ));
    assert!(matches!(
        engine
            .flights
            .update_flight(&thy_staff(), missing, &fixtures::reference_request())
            .await,
        Err(BookingError::NotFound { .. })
    ));
    assert!(matches!(
        engine.flights.delete_flight(&thy_staff(), missing).await,
        Err(BookingError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    let mut round_trip = fixtures::reference_request();
    round_trip.destination = round_trip.origin.clone();
    assert!(matches!(
        engine.flights.create_flight(&thy_staff(), &round_trip).await,
        Err(BookingError::Validation { .. })
    ));

    let mut instant = fixtures::reference_request();
    instant.duration_minutes = 0;
    assert!(matches!(
        engine.flights.create_flight(&thy_staff(), &instant).await,
        Err(BookingError::Validation { .. })
    ));

    let mut end_of_time = fixtures::reference_request();
    end_of_time.departure_time = DateTime::<Utc>::MAX_UTC - Duration::minutes(60);
    assert!(matches!(
        engine.flights.create_flight(&thy_staff(), &end_of_time).await,
        Err(BookingError::Validation { .. })
    ));
    assert_eq!(storage.flight_count().unwrap(), 0);
}

// ============================================================================
// Fare class resizing
// ============================================================================

#[tokio::test]
async fn test_resize_preserves_sold_seats() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let flight = create_reference_flight(&engine).await;
    let key = FareClassKey::new(flight.id, FareClassTag::Economy);

    engine
        .bookings
        .book_flight(&customer(), flight.id, &fixtures::passengers(2, FareClassTag::Economy))
        .await
        .unwrap();

    let mut smaller = fixtures::reference_request();
    smaller.fare_classes[0].seat_count = 10;
    engine
        .flights
        .update_flight(&thy_staff(), flight.id, &smaller)
        .await
        .unwrap();

    let economy = storage.fare_class(key).unwrap().unwrap();
    assert_eq!((economy.seat_count, economy.available_seats), (10, 8));

    let mut too_small = fixtures::reference_request();
    too_small.fare_classes[0].seat_count = 1;
    assert!(matches!(
        engine.flights.update_flight(&thy_staff(), flight.id, &too_small).await,
        Err(BookingError::Validation { .. })
    ));

    let economy = storage.fare_class(key).unwrap().unwrap();
    assert_eq!((economy.seat_count, economy.available_seats), (10, 8));
}

#[tokio::test]
async fn test_sold_class_cannot_be_removed() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let flight = create_reference_flight(&engine).await;

    engine
        .bookings
        .book_flight(&customer(), flight.id, &fixtures::passengers(1, FareClassTag::Economy))
        .await
        .unwrap();

    let mut business_only = fixtures::reference_request();
    business_only.fare_classes = vec![FareClassRequest {
        tag: FareClassTag::Business,
        seat_count: 8,
        price: Money::from_cents(60_000),
    }];
    let error = engine
        .flights
        .update_flight(&thy_staff(), flight.id, &business_only)
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::Validation { .. }));

    // The failed update is atomic: business was not added either.
    let reloaded = engine.flights.get_flight(flight.id).await.unwrap();
    assert_eq!(reloaded.fare_classes.len(), 1);
    assert_eq!(reloaded.fare_classes[0].tag, FareClassTag::Economy);
}

#[tokio::test]
async fn test_unsold_class_can_be_swapped() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let flight = create_reference_flight(&engine).await;

    let mut business_only = fixtures::reference_request();
    business_only.fare_classes = vec![FareClassRequest {
        tag: FareClassTag::Business,
        seat_count: 8,
        price: Money::from_cents(60_000),
    }];
    let updated = engine
        .flights
        .update_flight(&thy_staff(), flight.id, &business_only)
        .await
        .unwrap();

    assert_eq!(updated.fare_classes.len(), 1);
    let business = updated.fare_class(FareClassTag::Business).unwrap();
    assert_eq!((business.seat_count, business.available_seats), (8, 8));
}

// ============================================================================
// Search and statistics
// ============================================================================

#[tokio::test]
async fn test_search_filters() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    let reference = create_reference_flight(&engine).await;

    let mut london = departing(at(26, 9, 0));
    london.destination = fixtures::airport("LHR");
    let london = create_flight(&engine, &london).await;

    let mut pegasus = departing(at(27, 9, 0));
    pegasus.airline = fixtures::airline("PGS");
    let pegasus = engine.flights.create_flight(&pgs_staff(), &pegasus).await.unwrap();

    let mut past = fixtures::reference_request();
    past.departure_time = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    let past = create_flight(&engine, &past).await;

    let upcoming = engine.flights.search_flights(&FlightFilter::default()).await.unwrap();
    let ids: Vec<_> = upcoming.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![reference.id, london.id, pegasus.id]);

    let everything = engine
        .flights
        .search_flights(&FlightFilter {
            include_past: true,
            ..FlightFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(everything.first().map(|f| f.id), Some(past.id));
    assert_eq!(everything.len(), 4);

    let pgs_only = engine
        .flights
        .search_flights(&FlightFilter {
            airline: Some(fixtures::airline("PGS")),
            ..FlightFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pgs_only.iter().map(|f| f.id).collect::<Vec<_>>(), vec![pegasus.id]);

    let to_london = engine
        .flights
        .search_flights(&FlightFilter {
            destination: Some(fixtures::airport("LHR")),
            ..FlightFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(to_london.iter().map(|f| f.id).collect::<Vec<_>>(), vec![london.id]);

    let christmas = engine
        .flights
        .search_flights(&FlightFilter {
            departure_date: NaiveDate::from_ymd_opt(2025, 12, 25),
            ..FlightFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(christmas.iter().map(|f| f.id).collect::<Vec<_>>(), vec![reference.id]);
}

#[tokio::test]
async fn test_catalog_listing_reports_totals_and_cheapest_fare() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    let mut request = fixtures::reference_request();
    request.fare_classes.push(FareClassRequest {
        tag: FareClassTag::Business,
        seat_count: 12,
        price: Money::from_cents(60_000),
    });
    let flight = create_flight(&engine, &request).await;
    engine
        .bookings
        .book_flight(&customer(), flight.id, &fixtures::passengers(3, FareClassTag::Business))
        .await
        .unwrap();

    let listings = engine.flights.list_flights(&FlightFilter::default()).await.unwrap();

    assert_eq!(listings.len(), 1);
    let listing = &listings[0];
    assert_eq!(listing.flight.flight_id, flight.id);
    assert_eq!(listing.total_seats, 92);
    assert_eq!(listing.available_seats, 89);
    assert_eq!(listing.min_price, Some(Money::from_cents(15_000)));
}

#[tokio::test]
async fn test_search_by_minimum_available_seats() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);

    let busy = create_reference_flight(&engine).await;
    let quiet = create_flight(&engine, &departing(at(25, 14, 0))).await;
    engine
        .bookings
        .book_flight(&customer(), busy.id, &fixtures::passengers(2, FareClassTag::Economy))
        .await
        .unwrap();

    let filter = FlightFilter {
        min_seats: [(FareClassTag::Economy, 79)].into_iter().collect::<SeatCounts>(),
        ..FlightFilter::default()
    };
    let roomy = engine.flights.search_flights(&filter).await.unwrap();
    assert_eq!(roomy.iter().map(|f| f.id).collect::<Vec<_>>(), vec![quiet.id]);

    let business = FlightFilter {
        min_seats: [(FareClassTag::Business, 1)].into_iter().collect::<SeatCounts>(),
        ..FlightFilter::default()
    };
    assert!(engine.flights.search_flights(&business).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_flight_statistics() {
    let storage = fixtures::seeded_storage();
    let engine = engine(&storage);
    let thy = fixtures::airline("THY");

    let reference = create_reference_flight(&engine).await;
    let later = create_flight(&engine, &departing(at(28, 10, 0))).await;

    engine
        .bookings
        .book_flight(&customer(), reference.id, &fixtures::passengers(2, FareClassTag::Economy))
        .await
        .unwrap();
    engine
        .bookings
        .book_flight(&customer(), reference.id, &fixtures::passengers(1, FareClassTag::Economy))
        .await
        .unwrap();

    let report = engine
        .flights
        .flight_statistics(&thy_staff(), &thy, None, None)
        .await
        .unwrap();

    assert_eq!(report.flights.len(), 2);
    assert_eq!(report.flights[0].flight_id, reference.id);
    assert_eq!(report.flights[0].booking_count, 2);
    assert_eq!(report.flights[0].passenger_count, 3);
    assert_eq!(report.flights[0].revenue, Money::from_cents(45_000));
    assert_eq!(report.flights[1].flight_id, later.id);
    assert_eq!(report.flights[1].booking_count, 0);
    assert_eq!(report.overall_booking_count, 2);
    assert_eq!(report.overall_passenger_count, 3);
    assert_eq!(report.overall_revenue, Money::from_cents(45_000));

    let christmas_only = engine
        .flights
        .flight_statistics(
            &thy_staff(),
            &thy,
            NaiveDate::from_ymd_opt(2025, 12, 25),
            NaiveDate::from_ymd_opt(2025, 12, 25),
        )
        .await
        .unwrap();
    assert_eq!(christmas_only.flights.len(), 1);

    assert!(matches!(
        engine.flights.flight_statistics(&pgs_staff(), &thy, None, None).await,
        Err(BookingError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine
            .flights
            .flight_statistics(
                &thy_staff(),
                &thy,
                NaiveDate::from_ymd_opt(2025, 12, 26),
                NaiveDate::from_ymd_opt(2025, 12, 25),
            )
            .await,
        Err(BookingError::Validation { .. })
    ));
}
