//! Error types for flight scheduling, seat inventory and booking operations.

use crate::types::{AirlineCode, AirportCode, FareClassTag, FlightId};
use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Failures reported by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend query or connection failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Concurrent modification detected; the transaction may be retried.
    #[error("Concurrency conflict: {0}")]
    Conflict(String),

    /// Backend invariant violated (corrupt row, poisoned state).
    #[error("Internal storage error: {0}")]
    Internal(String),
}

/// Error taxonomy for the booking engine.
///
/// Every operation stops at the first failing step and returns one of these;
/// the surrounding transaction is dropped, so nothing it staged is persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind (`Flight`, `User`, `Booking`, `FareClass`)
        entity: &'static str,
        /// Lookup key
        key: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or inconsistent input.
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Daily flight cap for the route would be exceeded.
    #[error(
        "Cannot schedule the flight: the maximum of {limit} daily flights for the route \
         {origin} to {destination} by airline {airline} has been reached"
    )]
    LimitExceeded {
        /// Configured cap
        limit: u32,
        /// Operating airline
        airline: AirlineCode,
        /// Departure airport
        origin: AirportCode,
        /// Arrival airport
        destination: AirportCode,
    },

    /// Not enough seats left in a fare class.
    #[error(
        "Not enough seats available for this flight with id: {flight_id} \
         ({class}: requested {requested}, available {available})"
    )]
    InsufficientInventory {
        /// Flight being booked
        flight_id: FlightId,
        /// Short cabin
        class: FareClassTag,
        /// Seats requested in that cabin
        requested: u32,
        /// Seats left in that cabin
        available: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller may not perform the operation.
    #[error("Unauthorized: {reason}")]
    Unauthorized {
        /// Why access was denied
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Infrastructure Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BookingError {
    /// `NotFound` for `entity` identified by `key`.
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// `Validation` with `message`.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// `Unauthorized` with `reason`.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Returns true if this error was caused by the caller's input or rights
    /// rather than by infrastructure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    /// Returns true if the operation lost a race and may succeed when retried.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Conflict(_)))
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::InsufficientInventory { .. } => "insufficient_inventory",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Storage(StorageError::Conflict(_)) => "conflict",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn limit_exceeded_names_route_and_cap() {
        let error = BookingError::LimitExceeded {
            limit: 3,
            airline: AirlineCode::new("THY").unwrap(),
            origin: AirportCode::new("IST").unwrap(),
            destination: AirportCode::new("CDG").unwrap(),
        };

        let message = error.to_string();
        assert!(message.contains("maximum of 3 daily flights"));
        assert!(message.contains("IST to CDG by airline THY"));
    }

    #[test]
    fn classification() {
        let conflict = BookingError::from(StorageError::Conflict("seat row changed".into()));
        assert!(conflict.is_conflict());
        assert!(!conflict.is_user_error());
        assert_eq!(conflict.kind(), "conflict");

        let missing = BookingError::not_found("Flight", FlightId::new());
        assert!(missing.is_user_error());
        assert!(!missing.is_conflict());

        let db = BookingError::from(StorageError::Database("connection reset".into()));
        assert!(!db.is_conflict());
        assert_eq!(db.kind(), "storage");
    }
}
