//! # Airline Booking Runtime
//!
//! Workflows of the airline booking engine over any
//! [`Storage`](airline_booking_core::storage::Storage) backend.
//!
//! ## Core Components
//!
//! - **[`FlightService`]**: create, update and delete flights under the daily
//!   cap and staff authorization; search and statistics
//! - **[`BookingService`]**: the booking orchestrator; reserve seats for
//!   passengers atomically, list and delete bookings
//! - **[`retry`]**: re-runs transactions that lost a concurrency race
//! - **[`metrics`]**: business counters
//!
//! ## Example
//!
//! ```ignore
//! use airline_booking_runtime::{BookingEngine, EngineConfig};
//!
//! let engine = BookingEngine::new(storage, clock, timezones, &EngineConfig::from_env());
//! let flight = engine.flights.create_flight(&staff, &request).await?;
//! let booking = engine.bookings.book_flight(&customer, flight.id, &passengers).await?;
//! ```

use airline_booking_core::environment::Clock;
use airline_booking_core::schedule::TimezoneLookup;
use airline_booking_core::storage::Storage;
use std::sync::Arc;

/// Flight mutation workflow and catalog reads
pub mod flights;

/// Booking orchestrator
pub mod bookings;

/// Retry of conflicting transactions
pub mod retry;

/// Engine configuration
pub mod config;

/// Business metrics
pub mod metrics;

pub use bookings::BookingService;
pub use config::EngineConfig;
pub use flights::{FlightFilter, FlightService};
pub use retry::RetryPolicy;

/// Flight and booking services sharing one storage backend.
pub struct BookingEngine<S: Storage> {
    /// Staff-side flight workflow
    pub flights: FlightService<S>,
    /// Customer-side booking workflow
    pub bookings: BookingService<S>,
}

impl<S: Storage> BookingEngine<S> {
    /// Wire both services onto `storage`.
    pub fn new(
        storage: Arc<S>,
        clock: Arc<dyn Clock>,
        timezones: Arc<dyn TimezoneLookup>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            flights: FlightService::new(Arc::clone(&storage), Arc::clone(&clock), timezones, config),
            bookings: BookingService::new(storage, clock, config),
        }
    }
}
