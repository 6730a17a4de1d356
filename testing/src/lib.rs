//! # Airline Booking Testing
//!
//! Testing utilities for the airline booking engine.
//!
//! This crate provides:
//! - [`FixedClock`] for deterministic time
//! - [`InMemoryStorage`], an optimistic in-memory storage backend
//! - Fixtures for the reference scenario (THY IST→CDG on 2025-12-25)
//! - proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use airline_booking_core::storage::{Storage, Transaction};
//! use airline_booking_testing::fixtures;
//!
//! #[tokio::test]
//! async fn stores_reference_flight() {
//!     let storage = fixtures::seeded_storage();
//!     let mut tx = storage.begin().await.unwrap();
//!     tx.insert_flight(&fixtures::reference_flight()).await.unwrap();
//!     tx.commit().await.unwrap();
//!     assert_eq!(storage.flight_count().unwrap(), 1);
//! }
//! ```

use airline_booking_core::environment::Clock;
use chrono::{DateTime, Utc};

pub mod memory;

pub use memory::{InMemoryStorage, InMemoryTransaction};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::set`]. Clones share
    /// the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use airline_booking_testing::mocks::FixedClock;
    /// use airline_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Reference-scenario fixtures.
///
/// Hardcoded codes and timestamps are known valid; the helpers panic only if
/// that assumption is broken.
#[allow(clippy::expect_used, clippy::missing_panics_doc)]
pub mod fixtures {
    use crate::InMemoryStorage;
    use airline_booking_core::schedule::FixedOffsetTimezones;
    use airline_booking_core::types::{
        AirlineCode, AirportCode, FareClassRequest, FareClassTag, Flight, FlightId, FlightRequest,
        Money, PassengerRequest, User,
    };
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    /// Username of the THY staff member.
    pub const THY_STAFF: &str = "thy-staff";
    /// Username of the Pegasus staff member.
    pub const PGS_STAFF: &str = "pgs-staff";
    /// Username of the customer.
    pub const CUSTOMER: &str = "john";

    /// Airline code from a literal.
    #[must_use]
    pub fn airline(code: &str) -> AirlineCode {
        AirlineCode::new(code).expect("fixture airline code")
    }

    /// Airport code from a literal.
    #[must_use]
    pub fn airport(code: &str) -> AirportCode {
        AirportCode::new(code).expect("fixture airport code")
    }

    /// 2025-12-25 10:00 UTC.
    #[must_use]
    pub fn reference_departure() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 25, 10, 0, 0)
            .single()
            .expect("fixture departure")
    }

    /// THY IST→CDG, 210 minutes, ECONOMY 80 seats at 150.00.
    #[must_use]
    pub fn reference_request() -> FlightRequest {
        FlightRequest {
            airline: airline("THY"),
            origin: airport("IST"),
            destination: airport("CDG"),
            departure_time: reference_departure(),
            duration_minutes: 210,
            fare_classes: vec![FareClassRequest {
                tag: FareClassTag::Economy,
                seat_count: 80,
                price: Money::from_cents(15_000),
            }],
        }
    }

    /// The reference request as a stored flight with a fresh id.
    #[must_use]
    pub fn reference_flight() -> Flight {
        Flight::from_request(FlightId::new(), &reference_request())
    }

    /// Staff of THY.
    #[must_use]
    pub fn thy_staff() -> User {
        User::airline_staff(THY_STAFF, airline("THY"))
    }

    /// Staff of Pegasus.
    #[must_use]
    pub fn pgs_staff() -> User {
        User::airline_staff(PGS_STAFF, airline("PGS"))
    }

    /// A customer.
    #[must_use]
    pub fn customer() -> User {
        User::customer(CUSTOMER)
    }

    /// `count` distinct passengers in `class`.
    #[must_use]
    pub fn passengers(count: usize, class: FareClassTag) -> Vec<PassengerRequest> {
        (1..=count)
            .map(|n| {
                PassengerRequest::new(
                    format!("Passenger{n}"),
                    "Traveller",
                    format!("passenger{n}@example.com"),
                    class,
                )
            })
            .collect()
    }

    /// IST at UTC+3, CDG at UTC+1, everything else UTC.
    #[must_use]
    pub fn timezones() -> FixedOffsetTimezones {
        FixedOffsetTimezones::utc()
            .with_airport(
                airport("IST"),
                FixedOffset::east_opt(3 * 3600).expect("fixture offset"),
            )
            .with_airport(
                airport("CDG"),
                FixedOffset::east_opt(3600).expect("fixture offset"),
            )
    }

    /// Storage with the staff and customer users loaded.
    #[must_use]
    pub fn seeded_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        for user in [thy_staff(), pgs_staff(), customer()] {
            storage.upsert_user(user).expect("fresh storage");
        }
        storage
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use airline_booking_core::types::FareClassTag;
    use proptest::prelude::*;

    /// Any fare class tag.
    pub fn fare_class_tag() -> impl Strategy<Value = FareClassTag> {
        prop_oneof![
            Just(FareClassTag::Economy),
            Just(FareClassTag::Business),
            Just(FareClassTag::First),
        ]
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
