//! Seat Inventory Ledger.
//!
//! Availability is checked against a loaded [`Flight`] first, for a precise
//! error, and then enforced again by the store through conditional
//! decrements, which is what actually prevents overselling when two bookings
//! race for the last seats.

use crate::error::{BookingError, Result};
use crate::storage::{SeatAdjustment, Transaction};
use crate::types::{Booking, FareClassKey, FareClassTag, Flight, FlightId, PassengerRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seats requested per fare class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCounts(BTreeMap<FareClassTag, u32>);

impl SeatCounts {
    /// No seats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One seat per passenger, grouped by requested class.
    #[must_use]
    pub fn from_passengers(passengers: &[PassengerRequest]) -> Self {
        passengers.iter().map(|p| (p.fare_class, 1)).collect()
    }

    /// Seats held by an existing booking.
    #[must_use]
    pub fn from_booking(booking: &Booking) -> Self {
        booking.passengers.iter().map(|p| (p.fare_class, 1)).collect()
    }

    /// Add `seats` to `tag`.
    pub fn add(&mut self, tag: FareClassTag, seats: u32) {
        let entry = self.0.entry(tag).or_insert(0);
        *entry = entry.saturating_add(seats);
    }

    /// Seats requested for `tag`.
    #[must_use]
    pub fn get(&self, tag: FareClassTag) -> u32 {
        self.0.get(&tag).copied().unwrap_or(0)
    }

    /// Non-zero `(tag, seats)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (FareClassTag, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, seats)| **seats > 0)
            .map(|(tag, seats)| (*tag, *seats))
    }

    /// Seats over all classes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|seats| u64::from(*seats)).sum()
    }

    /// Whether no seats are requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<(FareClassTag, u32)> for SeatCounts {
    fn from_iter<I: IntoIterator<Item = (FareClassTag, u32)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (tag, seats) in iter {
            counts.add(tag, seats);
        }
        counts
    }
}

/// A class that cannot cover its request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shortfall {
    /// Short cabin
    pub class: FareClassTag,
    /// Seats requested
    pub requested: u32,
    /// Seats available
    pub available: u32,
}

impl Shortfall {
    /// Convert into the caller-facing error for `flight_id`.
    #[must_use]
    pub const fn into_error(self, flight_id: FlightId) -> BookingError {
        BookingError::InsufficientInventory {
            flight_id,
            class: self.class,
            requested: self.requested,
            available: self.available,
        }
    }
}

/// Checks that `flight` can seat every requested passenger.
///
/// A class the flight does not sell has zero seats. An empty request is
/// trivially satisfiable.
///
/// # Errors
///
/// The first [`Shortfall`] in class order.
pub fn check_availability(flight: &Flight, requested: &SeatCounts) -> std::result::Result<(), Shortfall> {
    for (class, seats) in requested.iter() {
        let available = flight.fare_class(class).map_or(0, |c| c.available_seats);
        if available < seats {
            return Err(Shortfall {
                class,
                requested: seats,
                available,
            });
        }
    }
    Ok(())
}

/// Takes `counts` seats out of `flight_id`'s inventory.
///
/// Each class is decremented conditionally by the store.
///
/// # Errors
///
/// - [`BookingError::NotFound`] if a class is not sold on the flight
/// - [`BookingError::InsufficientInventory`] if the store refuses a decrement
/// - [`BookingError::Storage`] on backend failure
pub async fn decrease_available_seats<T: Transaction>(
    tx: &mut T,
    flight_id: FlightId,
    counts: &SeatCounts,
) -> Result<()> {
    for (class, seats) in counts.iter() {
        let key = FareClassKey::new(flight_id, class);
        match tx.decrement_seats(key, seats).await? {
            SeatAdjustment::Applied { available } => {
                tracing::debug!(fare_class = %key, seats, available, "Seats reserved");
            }
            SeatAdjustment::Rejected { available } => {
                tracing::warn!(fare_class = %key, seats, available, "Seat decrement refused");
                return Err(BookingError::InsufficientInventory {
                    flight_id,
                    class,
                    requested: seats,
                    available,
                });
            }
            SeatAdjustment::Missing => return Err(BookingError::not_found("FareClass", key)),
        }
    }
    Ok(())
}

/// Returns `counts` seats to `flight_id`'s inventory, capped at capacity.
///
/// Classes that have since been removed are skipped.
///
/// # Errors
///
/// [`BookingError::Storage`] on backend failure.
pub async fn restock_seats<T: Transaction>(
    tx: &mut T,
    flight_id: FlightId,
    counts: &SeatCounts,
) -> Result<()> {
    for (class, seats) in counts.iter() {
        let key = FareClassKey::new(flight_id, class);
        match tx.restock_seats(key, seats).await? {
            SeatAdjustment::Applied { available } | SeatAdjustment::Rejected { available } => {
                tracing::debug!(fare_class = %key, seats, available, "Seats restocked");
            }
            SeatAdjustment::Missing => {
                tracing::debug!(fare_class = %key, seats, "Fare class gone, nothing to restock");
            }
        }
    }
    Ok(())
}
