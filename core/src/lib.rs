//! # Airline Booking Core
//!
//! Domain types and consistency rules for an airline booking backend.
//!
//! This crate holds everything that does not depend on a concrete database or
//! runtime:
//!
//! - **Types**: flights, fare classes, bookings, users ([`types`])
//! - **Errors**: the [`BookingError`] taxonomy ([`error`])
//! - **Storage**: the [`Storage`](storage::Storage)/[`Transaction`](storage::Transaction)
//!   traits backends implement ([`storage`])
//! - **Seat Inventory Ledger**: availability checks and conditional
//!   decrements ([`inventory`])
//! - **Flight Scheduling Guard**: the daily flight cap per route ([`schedule`])
//! - **Authorization Guard**: airline staff checks ([`authz`])
//!
//! ## Invariants
//!
//! - `0 <= available_seats <= seat_count` for every fare class
//! - a booking's `total_price` equals the sum of its passengers' frozen fares
//! - at most [`MAX_DAILY_FLIGHTS`](schedule::MAX_DAILY_FLIGHTS) flights per
//!   airline, origin, destination and origin-local calendar day
//!
//! The workflows that tie these together live in `airline-booking-runtime`.

pub mod authz;
pub mod error;
pub mod inventory;
pub mod schedule;
pub mod storage;
pub mod types;

pub use error::{BookingError, Result, StorageError};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Environment module - injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use airline_booking_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
