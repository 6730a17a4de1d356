//! Shared setup for runtime integration tests.

#![allow(dead_code)] // Not every test binary uses every helper
#![allow(clippy::expect_used)]

use airline_booking_core::types::{Flight, FlightRequest, Principal};
use airline_booking_runtime::{BookingEngine, EngineConfig};
use airline_booking_testing::{fixtures, test_clock, InMemoryStorage};
use std::sync::Arc;

/// Engine over `storage` with default configuration and the 2025-01-01 test clock.
pub fn engine(storage: &InMemoryStorage) -> BookingEngine<InMemoryStorage> {
    engine_with(storage, &EngineConfig::default())
}

/// Engine over `storage` with `config`.
pub fn engine_with(storage: &InMemoryStorage, config: &EngineConfig) -> BookingEngine<InMemoryStorage> {
    BookingEngine::new(
        Arc::new(storage.clone()),
        Arc::new(test_clock()),
        Arc::new(fixtures::timezones()),
        config,
    )
}

pub fn thy_staff() -> Principal {
    Principal::new(fixtures::THY_STAFF)
}

pub fn pgs_staff() -> Principal {
    Principal::new(fixtures::PGS_STAFF)
}

pub fn customer() -> Principal {
    Principal::new(fixtures::CUSTOMER)
}

/// Creates the reference flight (THY IST→CDG, ECONOMY 80 @ 150.00).
pub async fn create_reference_flight(engine: &BookingEngine<InMemoryStorage>) -> Flight {
    engine
        .flights
        .create_flight(&thy_staff(), &fixtures::reference_request())
        .await
        .expect("reference flight should be created")
}

/// Creates a flight from `request` as THY staff.
pub async fn create_flight(engine: &BookingEngine<InMemoryStorage>, request: &FlightRequest) -> Flight {
    engine
        .flights
        .create_flight(&thy_staff(), request)
        .await
        .expect("flight should be created")
}
