//! Storage traits for the flight catalog, seat inventory and bookings.
//!
//! The engine never talks to a database directly. Every operation opens one
//! [`Transaction`] through [`Storage::begin`], performs its reads and writes
//! on it, and calls [`Transaction::commit`]. Dropping a transaction without
//! committing rolls it back.
//!
//! Two primitives carry the concurrency guarantees:
//!
//! - [`Transaction::decrement_seats`] is a *conditional* decrement: it never
//!   takes `available_seats` below zero and reports a refusal instead.
//! - [`Transaction::lock_route_day`] serializes all transactions that check or
//!   change the flight count of one route on one local day, until they end.
//!
//! Backends report lost races as [`StorageError::Conflict`]; the runtime
//! retries those.

use crate::error::StorageError;
use crate::schedule::{DayWindow, RouteDay};
use crate::types::{
    AirlineCode, AirportCode, Booking, BookingId, FareClassKey, Flight, FlightId, Money, Route,
    User, Username,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Outcome of a guarded change to a fare-class row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatAdjustment {
    /// The change was applied; `available` is the new seat count.
    Applied {
        /// Seats available after the change
        available: u32,
    },
    /// The guard refused the change; the row is untouched.
    Rejected {
        /// Seats available at the time of refusal
        available: u32,
    },
    /// No fare-class row exists for the key.
    Missing,
}

/// Catalog filter evaluated by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlightQuery {
    /// Restrict to one airline
    pub airline: Option<AirlineCode>,
    /// Restrict to one departure airport
    pub origin: Option<AirportCode>,
    /// Restrict to one arrival airport
    pub destination: Option<AirportCode>,
    /// Inclusive lower bound on departure
    pub departs_at_or_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on departure
    pub departs_before: Option<DateTime<Utc>>,
}

impl FlightQuery {
    /// Whether `flight` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, flight: &Flight) -> bool {
        self.airline.as_ref().is_none_or(|a| *a == flight.airline)
            && self.origin.as_ref().is_none_or(|o| *o == flight.origin)
            && self.destination.as_ref().is_none_or(|d| *d == flight.destination)
            && self
                .departs_at_or_after
                .is_none_or(|from| flight.departure_time >= from)
            && self
                .departs_before
                .is_none_or(|until| flight.departure_time < until)
    }
}

/// Factory for transactions.
pub trait Storage: Send + Sync {
    /// Transaction type produced by this backend.
    type Tx: Transaction;

    /// Open a new transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    fn begin(&self) -> impl Future<Output = StorageResult<Self::Tx>> + Send;
}

/// One unit of work against the catalog, inventory and booking tables.
///
/// Reads observe the transaction's own uncommitted writes.
pub trait Transaction: Send {
    // ═══════════════════════════════════════════════════════════════════════
    // Users
    // ═══════════════════════════════════════════════════════════════════════

    /// Look up a user by username.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_user(
        &mut self,
        username: &Username,
    ) -> impl Future<Output = StorageResult<Option<User>>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Flights
    // ═══════════════════════════════════════════════════════════════════════

    /// Load a flight with its fare classes.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_flight(
        &mut self,
        id: FlightId,
    ) -> impl Future<Output = StorageResult<Option<Flight>>> + Send;

    /// Flights matching `query`, ordered by departure time.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_flights(
        &mut self,
        query: &FlightQuery,
    ) -> impl Future<Output = StorageResult<Vec<Flight>>> + Send;

    /// Serialize on `key` until this transaction ends.
    ///
    /// # Errors
    ///
    /// Returns error if the lock cannot be acquired.
    fn lock_route_day(&mut self, key: &RouteDay) -> impl Future<Output = StorageResult<()>> + Send;

    /// Number of flights on `route` departing inside `window`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn count_flights_on_route_day(
        &mut self,
        route: &Route,
        window: DayWindow,
    ) -> impl Future<Output = StorageResult<u32>> + Send;

    /// Insert a flight and all of its fare classes.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails or the id is taken.
    fn insert_flight(&mut self, flight: &Flight) -> impl Future<Output = StorageResult<()>> + Send;

    /// Rewrite the schedule columns (airports, departure, duration, arrival)
    /// of `flight.id`. Fare classes are untouched.
    ///
    /// Returns `false` if the flight no longer exists.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn update_flight_schedule(
        &mut self,
        flight: &Flight,
    ) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Create a fare class, or resize and reprice an existing one.
    ///
    /// Resizing keeps the sold seats sold: `available` moves by the capacity
    /// delta. A resize below the number of seats sold is
    /// [`SeatAdjustment::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn upsert_fare_class(
        &mut self,
        key: FareClassKey,
        seat_count: u32,
        price: Money,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send;

    /// Remove a fare class that has no seats sold.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn remove_fare_class(
        &mut self,
        key: FareClassKey,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send;

    /// Delete a flight with its fare classes, bookings and passengers.
    ///
    /// Returns `false` if the flight did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn delete_flight(&mut self, id: FlightId) -> impl Future<Output = StorageResult<bool>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Seat inventory
    // ═══════════════════════════════════════════════════════════════════════

    /// Take `seats` from `key` only if at least that many are available.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn decrement_seats(
        &mut self,
        key: FareClassKey,
        seats: u32,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send;

    /// Return `seats` to `key`, never exceeding capacity.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn restock_seats(
        &mut self,
        key: FareClassKey,
        seats: u32,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Bookings
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a booking with its passengers.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails or the flight is gone.
    fn insert_booking(
        &mut self,
        booking: &Booking,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Load a booking with its passengers.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_booking(
        &mut self,
        id: BookingId,
    ) -> impl Future<Output = StorageResult<Option<Booking>>> + Send;

    /// Bookings made by `username`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn bookings_for_user(
        &mut self,
        username: &Username,
    ) -> impl Future<Output = StorageResult<Vec<Booking>>> + Send;

    /// Bookings on `flight_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn bookings_for_flight(
        &mut self,
        flight_id: FlightId,
    ) -> impl Future<Output = StorageResult<Vec<Booking>>> + Send;

    /// Delete a booking and its passengers, returning what was removed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    fn delete_booking(
        &mut self,
        id: BookingId,
    ) -> impl Future<Output = StorageResult<Option<Booking>>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Make every write of this transaction visible atomically.
    ///
    /// # Errors
    ///
    /// [`StorageError::Conflict`] if a concurrent transaction invalidated a
    /// staged write; nothing is applied in that case.
    fn commit(self) -> impl Future<Output = StorageResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{FareClassRequest, FareClassTag, FlightRequest};
    use chrono::TimeZone;

    fn flight(airline: &str, hour: u32) -> Flight {
        let request = FlightRequest {
            airline: AirlineCode::new(airline).unwrap(),
            origin: AirportCode::new("IST").unwrap(),
            destination: AirportCode::new("CDG").unwrap(),
            departure_time: Utc.with_ymd_and_hms(2025, 12, 25, hour, 0, 0).unwrap(),
            duration_minutes: 210,
            fare_classes: vec![FareClassRequest {
                tag: FareClassTag::Economy,
                seat_count: 10,
                price: Money::from_cents(100),
            }],
        };
        Flight::from_request(FlightId::new(), &request)
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(FlightQuery::default().matches(&flight("THY", 10)));
    }

    #[test]
    fn query_bounds_are_half_open() {
        let query = FlightQuery {
            airline: Some(AirlineCode::new("THY").unwrap()),
            departs_at_or_after: Some(Utc.with_ymd_and_hms(2025, 12, 25, 10, 0, 0).unwrap()),
            departs_before: Some(Utc.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap()),
            ..FlightQuery::default()
        };

        assert!(query.matches(&flight("THY", 10)));
        assert!(!query.matches(&flight("THY", 12)));
        assert!(!query.matches(&flight("PGS", 11)));
    }
}
