//! Business metrics for the booking engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_bookings_total{status}` - Booking attempts by outcome
//!   (`confirmed`, `rejected`, `failed`, `deleted`)
//! - `booking_seats_reserved_total` - Seats taken out of inventory
//! - `booking_seats_restocked_total` - Seats returned by booking deletes
//! - `booking_flights_total{status}` - Flight mutations by outcome
//!   (`created`, `updated`, `deleted`, `limit_exceeded`, `rejected`)
//! - `booking_conflict_retries_total` - Transactions re-run after a conflict
//! - `booking_storage_conflicts_total` - Serialization failures and deadlocks
//!   reported by the database

use airline_booking_core::BookingError;
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "booking_bookings_total",
        "Total number of booking attempts by status (confirmed, rejected, failed, deleted)"
    );
    describe_counter!(
        "booking_seats_reserved_total",
        "Total number of seats reserved by confirmed bookings"
    );
    describe_counter!(
        "booking_seats_restocked_total",
        "Total number of seats returned to inventory by booking deletes"
    );
    describe_counter!(
        "booking_flights_total",
        "Total number of flight mutations by status (created, updated, deleted, limit_exceeded, rejected)"
    );
    describe_counter!(
        "booking_conflict_retries_total",
        "Total number of transactions retried after a concurrency conflict"
    );
    describe_counter!(
        "booking_storage_conflicts_total",
        "Total number of serialization failures and deadlocks reported by storage"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a confirmed booking of `seats` seats.
pub fn record_booking_confirmed(seats: u64) {
    metrics::counter!("booking_bookings_total", "status" => "confirmed").increment(1);
    metrics::counter!("booking_seats_reserved_total").increment(seats);
}

/// Record a failed booking attempt.
///
/// User errors count as `rejected`, infrastructure errors as `failed`.
pub fn record_booking_failed(error: &BookingError) {
    let status = if error.is_user_error() { "rejected" } else { "failed" };
    metrics::counter!("booking_bookings_total", "status" => status, "reason" => error.kind())
        .increment(1);
}

/// Record a deleted booking that released `seats` seats.
pub fn record_booking_deleted(seats: u64) {
    metrics::counter!("booking_bookings_total", "status" => "deleted").increment(1);
    metrics::counter!("booking_seats_restocked_total").increment(seats);
}

/// Record a successful flight mutation (`created`, `updated`, `deleted`).
pub fn record_flight_mutation(status: &'static str) {
    metrics::counter!("booking_flights_total", "status" => status).increment(1);
}

/// Record a rejected flight mutation.
pub fn record_flight_rejected(error: &BookingError) {
    let status = match error {
        BookingError::LimitExceeded { .. } => "limit_exceeded",
        _ => "rejected",
    };
    metrics::counter!("booking_flights_total", "status" => status).increment(1);
}

/// Record one conflict retry.
pub fn record_conflict_retry() {
    metrics::counter!("booking_conflict_retries_total").increment(1);
}
