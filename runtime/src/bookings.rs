//! Booking Orchestrator.
//!
//! `book_flight` is a linear sequence inside one transaction; the first
//! failing step aborts it and nothing is persisted:
//!
//! 1. Resolve the flight (`NotFound`)
//! 2. Resolve the caller's user record (`NotFound`)
//! 3. Require at least one passenger with complete details (`Validation`)
//! 4. Check availability per fare class (`InsufficientInventory`)
//! 5. Persist the booking with fares frozen from the current fare classes
//! 6. Conditionally decrement the seat counters
//! 7. Commit
//!
//! A seat race lost at step 6 or at commit is a conflict; the sequence is
//! re-run, and a genuine shortage then surfaces from step 4.

use crate::config::EngineConfig;
use crate::metrics;
use crate::retry::{RetryPolicy, retry_on_conflict};
use airline_booking_core::environment::Clock;
use airline_booking_core::error::{BookingError, Result};
use airline_booking_core::inventory::{self, SeatCounts, check_availability};
use airline_booking_core::storage::{Storage, Transaction};
use airline_booking_core::types::{
    Booking, BookingId, BookingPassenger, BookingView, FareClassKey, Flight, FlightId, Money,
    PassengerId, PassengerRequest, Principal, Username,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Booking workflow over a [`Storage`] backend.
pub struct BookingService<S: Storage> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    restock_on_delete: bool,
}

impl<S: Storage> BookingService<S> {
    /// Create a new booking service
    pub fn new(storage: Arc<S>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            storage,
            clock,
            retry: config.retry_policy(),
            restock_on_delete: config.restock_on_booking_delete,
        }
    }

    /// Book `passengers` on `flight_id` for the caller.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the flight or the caller's user record is missing
    /// - [`BookingError::Validation`] for an empty or incomplete passenger list
    /// - [`BookingError::InsufficientInventory`] if a class cannot seat its passengers
    #[tracing::instrument(
        skip_all,
        fields(principal = %principal.username, flight_id = %flight_id, passengers = passengers.len())
    )]
    pub async fn book_flight(
        &self,
        principal: &Principal,
        flight_id: FlightId,
        passengers: &[PassengerRequest],
    ) -> Result<BookingView> {
        let result =
            retry_on_conflict(&self.retry, || self.try_book_flight(principal, flight_id, passengers)).await;

        match &result {
            Ok(view) => {
                metrics::record_booking_confirmed(view.booking.passengers.len() as u64);
                tracing::info!(
                    booking_id = %view.booking.id,
                    total = %view.booking.total_price,
                    "Booking confirmed"
                );
            }
            Err(error) => {
                metrics::record_booking_failed(error);
                tracing::warn!(%error, "Booking rejected");
            }
        }
        result
    }

    async fn try_book_flight(
        &self,
        principal: &Principal,
        flight_id: FlightId,
        passengers: &[PassengerRequest],
    ) -> Result<BookingView> {
        let mut tx = self.storage.begin().await?;

        let flight = tx
            .find_flight(flight_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", flight_id))?;
        let user = tx
            .find_user(&principal.username)
            .await?
            .ok_or_else(|| BookingError::not_found("User", &principal.username))?;

        validate_passengers(passengers)?;

        let counts = SeatCounts::from_passengers(passengers);
        check_availability(&flight, &counts).map_err(|shortfall| shortfall.into_error(flight.id))?;

        let booking = price_booking(&flight, user.username, passengers, self.clock.as_ref())?;
        tx.insert_booking(&booking).await?;
        inventory::decrease_available_seats(&mut tx, flight.id, &counts).await?;
        tx.commit().await?;

        Ok(BookingView {
            booking,
            flight: flight.summary(),
        })
    }

    /// Load a booking with its flight.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the booking does not exist.
    pub async fn get_booking(&self, id: BookingId) -> Result<BookingView> {
        let mut tx = self.storage.begin().await?;
        let booking = tx
            .find_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))?;
        let flight = tx
            .find_flight(booking.flight_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", booking.flight_id))?;

        Ok(BookingView {
            booking,
            flight: flight.summary(),
        })
    }

    /// The caller's bookings, oldest first.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the caller has no user record.
    #[tracing::instrument(skip_all, fields(principal = %principal.username))]
    pub async fn my_bookings(&self, principal: &Principal) -> Result<Vec<BookingView>> {
        let mut tx = self.storage.begin().await?;
        let user = tx
            .find_user(&principal.username)
            .await?
            .ok_or_else(|| BookingError::not_found("User", &principal.username))?;

        let bookings = tx.bookings_for_user(&user.username).await?;
        let mut flights: HashMap<FlightId, Flight> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());

        for booking in bookings {
            if !flights.contains_key(&booking.flight_id) {
                let flight = tx
                    .find_flight(booking.flight_id)
                    .await?
                    .ok_or_else(|| BookingError::not_found("Flight", booking.flight_id))?;
                flights.insert(flight.id, flight);
            }
            if let Some(flight) = flights.get(&booking.flight_id) {
                views.push(BookingView {
                    booking,
                    flight: flight.summary(),
                });
            }
        }

        Ok(views)
    }

    /// Delete a booking, returning its seats to inventory when configured to.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the booking does not exist.
    #[tracing::instrument(skip_all, fields(booking_id = %id))]
    pub async fn delete_booking(&self, id: BookingId) -> Result<()> {
        let result = retry_on_conflict(&self.retry, || self.try_delete_booking(id)).await;

        match &result {
            Ok(released) => {
                metrics::record_booking_deleted(*released);
                tracing::info!(released, "Booking deleted");
            }
            Err(error) => tracing::warn!(%error, "Booking deletion rejected"),
        }
        result.map(|_| ())
    }

    async fn try_delete_booking(&self, id: BookingId) -> Result<u64> {
        let mut tx = self.storage.begin().await?;
        let booking = tx
            .delete_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))?;

        let released = if self.restock_on_delete {
            let counts = SeatCounts::from_booking(&booking);
            inventory::restock_seats(&mut tx, booking.flight_id, &counts).await?;
            counts.total()
        } else {
            0
        };

        tx.commit().await?;
        Ok(released)
    }
}

fn validate_passengers(passengers: &[PassengerRequest]) -> Result<()> {
    if passengers.is_empty() {
        return Err(BookingError::validation("Number of passengers must be at least 1"));
    }

    for (index, passenger) in passengers.iter().enumerate() {
        let position = index + 1;
        if passenger.first_name.trim().is_empty() || passenger.last_name.trim().is_empty() {
            return Err(BookingError::validation(format!(
                "Passenger {position} must have a first and last name"
            )));
        }
        if passenger.email.trim().is_empty() {
            return Err(BookingError::validation(format!(
                "Passenger {position} must have an email"
            )));
        }
    }
    Ok(())
}

/// Builds the booking with every fare taken from the flight's current prices.
fn price_booking(
    flight: &Flight,
    username: Username,
    passengers: &[PassengerRequest],
    clock: &dyn Clock,
) -> Result<Booking> {
    let booking_id = BookingId::new();

    let passengers = passengers
        .iter()
        .map(|request| {
            let class = flight.fare_class(request.fare_class).ok_or_else(|| {
                BookingError::not_found("FareClass", FareClassKey::new(flight.id, request.fare_class))
            })?;

            Ok(BookingPassenger {
                id: PassengerId::new(),
                booking_id,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                email: request.email.trim().to_string(),
                fare_class: request.fare_class,
                price_at_booking: class.price,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let total_price = Money::checked_sum(passengers.iter().map(|p| p.price_at_booking))
        .ok_or_else(|| BookingError::validation("Booking total overflows"))?;

    Ok(Booking {
        id: booking_id,
        flight_id: flight.id,
        username,
        passengers,
        total_price,
        booked_at: clock.now(),
    })
}
