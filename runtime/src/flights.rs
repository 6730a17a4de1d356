//! Flight Service: staff-side flight mutations and catalog reads.
//!
//! Every mutation runs in one storage transaction:
//!
//! 1. Validate the request
//! 2. Authorize the caller as staff of the owning airline
//! 3. Check the daily flight cap (creation, or an update that moves the
//!    flight to another route or local day)
//! 4. Write flight and fare classes, then commit
//!
//! A conflict at commit re-runs the whole sequence per the retry policy.

use crate::config::EngineConfig;
use crate::metrics;
use crate::retry::{RetryPolicy, retry_on_conflict};
use airline_booking_core::authz;
use airline_booking_core::environment::Clock;
use airline_booking_core::error::{BookingError, Result};
use airline_booking_core::inventory::{SeatCounts, check_availability};
use airline_booking_core::schedule::{FlightSchedulingGuard, TimezoneLookup};
use airline_booking_core::storage::{FlightQuery, SeatAdjustment, Storage, Transaction};
use airline_booking_core::types::{
    AirlineCode, AirportCode, FareClass, FareClassKey, Flight, FlightId, FlightListing,
    FlightRequest, FlightStatistics, Money, Principal, StatisticsReport,
};
use airline_booking_core::StorageError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Catalog search criteria.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightFilter {
    /// Only this airline
    pub airline: Option<AirlineCode>,
    /// Only from this airport
    pub origin: Option<AirportCode>,
    /// Only to this airport
    pub destination: Option<AirportCode>,
    /// Only departing on this date, local to the origin airport
    pub departure_date: Option<NaiveDate>,
    /// Minimum seats that must still be available, per class
    pub min_seats: SeatCounts,
    /// Also return flights that already departed
    pub include_past: bool,
}

/// Flight mutation workflow and catalog reads.
pub struct FlightService<S: Storage> {
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    guard: FlightSchedulingGuard,
    retry: RetryPolicy,
}

impl<S: Storage> FlightService<S> {
    /// Create a new flight service
    pub fn new(
        storage: Arc<S>,
        clock: Arc<dyn Clock>,
        timezones: Arc<dyn TimezoneLookup>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            guard: FlightSchedulingGuard::with_limit(timezones, config.max_daily_flights),
            retry: config.retry_policy(),
        }
    }

    /// Schedule a new flight with all seats available.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for an inconsistent request
    /// - [`BookingError::Unauthorized`] unless the caller is staff of the airline
    /// - [`BookingError::LimitExceeded`] if the route is full that day
    #[tracing::instrument(
        skip_all,
        fields(principal = %principal.username, airline = %request.airline, route = %request.route())
    )]
    pub async fn create_flight(&self, principal: &Principal, request: &FlightRequest) -> Result<Flight> {
        let result = retry_on_conflict(&self.retry, || self.try_create_flight(principal, request)).await;

        match &result {
            Ok(flight) => {
                metrics::record_flight_mutation("created");
                tracing::info!(flight_id = %flight.id, departure = %flight.departure_time, "Flight created");
            }
            Err(error) => {
                metrics::record_flight_rejected(error);
                tracing::warn!(%error, "Flight creation rejected");
            }
        }
        result
    }

    async fn try_create_flight(&self, principal: &Principal, request: &FlightRequest) -> Result<Flight> {
        request.validate()?;

        let mut tx = self.storage.begin().await?;
        authz::validate_airline_staff_authorization(&mut tx, principal, &request.airline).await?;
        self.guard
            .validate_flight_limit(&mut tx, &request.route(), request.departure_time)
            .await?;

        let flight = Flight::from_request(FlightId::new(), request);
        tx.insert_flight(&flight).await?;
        tx.commit().await?;

        Ok(flight)
    }

    /// Reschedule a flight and resize its fare classes.
    ///
    /// Sold seats stay sold: each class keeps `seat_count - available_seats`
    /// bookings and only the unsold remainder follows the new capacity. The
    /// daily cap is only re-checked when airline, airports or local departure
    /// date change.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the flight does not exist
    /// - [`BookingError::Unauthorized`] unless the caller is staff of the
    ///   flight's airline, or if the request changes the airline
    /// - [`BookingError::LimitExceeded`] if the new route/day is full
    /// - [`BookingError::Validation`] if a class would shrink below its sold
    ///   seats or a class with sold seats is dropped
    #[tracing::instrument(skip_all, fields(principal = %principal.username, flight_id = %id))]
    pub async fn update_flight(
        &self,
        principal: &Principal,
        id: FlightId,
        request: &FlightRequest,
    ) -> Result<Flight> {
        let result = retry_on_conflict(&self.retry, || self.try_update_flight(principal, id, request)).await;

        match &result {
            Ok(flight) => {
                metrics::record_flight_mutation("updated");
                tracing::info!(departure = %flight.departure_time, "Flight updated");
            }
            Err(error) => {
                metrics::record_flight_rejected(error);
                tracing::warn!(%error, "Flight update rejected");
            }
        }
        result
    }

    async fn try_update_flight(
        &self,
        principal: &Principal,
        id: FlightId,
        request: &FlightRequest,
    ) -> Result<Flight> {
        request.validate()?;

        let mut tx = self.storage.begin().await?;
        let existing = tx
            .find_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", id))?;

        authz::validate_airline_staff_authorization(&mut tx, principal, &existing.airline).await?;
        authz::ensure_same_airline(&existing.airline, &request.airline)?;

        if self.guard.has_flight_attr_changed(&existing, request) {
            self.guard
                .validate_flight_limit(&mut tx, &request.route(), request.departure_time)
                .await?;
        } else {
            tracing::debug!("Route and local day unchanged, skipping daily limit check");
        }

        if !tx.update_flight_schedule(&Flight::from_request(id, request)).await? {
            return Err(BookingError::not_found("Flight", id));
        }

        for class in &request.fare_classes {
            let key = FareClassKey::new(id, class.tag);
            match tx.upsert_fare_class(key, class.seat_count, class.price).await? {
                SeatAdjustment::Applied { .. } => {}
                SeatAdjustment::Rejected { .. } => {
                    let sold = existing.fare_class(class.tag).map_or(0, FareClass::seats_sold);
                    return Err(BookingError::validation(format!(
                        "Cannot resize {} to {} seats: {sold} seats already sold",
                        class.tag, class.seat_count
                    )));
                }
                SeatAdjustment::Missing => return Err(BookingError::not_found("Flight", id)),
            }
        }

        let dropped = existing
            .fare_classes
            .iter()
            .filter(|class| request.fare_classes.iter().all(|r| r.tag != class.tag));
        for class in dropped {
            if let SeatAdjustment::Rejected { .. } = tx.remove_fare_class(class.key()).await? {
                return Err(BookingError::validation(format!(
                    "Cannot remove fare class {}: seats already sold",
                    class.tag
                )));
            }
        }

        let flight = tx
            .find_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", id))?;
        tx.commit().await?;

        Ok(flight)
    }

    /// Delete a flight with its fare classes and bookings.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the flight does not exist
    /// - [`BookingError::Unauthorized`] unless the caller is staff of the airline
    #[tracing::instrument(skip_all, fields(principal = %principal.username, flight_id = %id))]
    pub async fn delete_flight(&self, principal: &Principal, id: FlightId) -> Result<()> {
        let result = retry_on_conflict(&self.retry, || self.try_delete_flight(principal, id)).await;

        match &result {
            Ok(()) => {
                metrics::record_flight_mutation("deleted");
                tracing::info!("Flight deleted");
            }
            Err(error) => {
                metrics::record_flight_rejected(error);
                tracing::warn!(%error, "Flight deletion rejected");
            }
        }
        result
    }

    async fn try_delete_flight(&self, principal: &Principal, id: FlightId) -> Result<()> {
        let mut tx = self.storage.begin().await?;
        let existing = tx
            .find_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", id))?;

        authz::validate_airline_staff_authorization(&mut tx, principal, &existing.airline).await?;

        if !tx.delete_flight(id).await? {
            return Err(BookingError::not_found("Flight", id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load a flight with its fare classes.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the flight does not exist.
    pub async fn get_flight(&self, id: FlightId) -> Result<Flight> {
        let mut tx = self.storage.begin().await?;
        tx.find_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Flight", id))
    }

    /// Flights matching `filter`, ordered by departure.
    ///
    /// # Errors
    ///
    /// Returns error on storage failure.
    #[tracing::instrument(skip_all)]
    pub async fn search_flights(&self, filter: &FlightFilter) -> Result<Vec<Flight>> {
        let query = FlightQuery {
            airline: filter.airline.clone(),
            origin: filter.origin.clone(),
            destination: filter.destination.clone(),
            departs_at_or_after: (!filter.include_past).then(|| self.clock.now()),
            departs_before: None,
        };

        let mut tx = self.storage.begin().await?;
        let flights = tx.find_flights(&query).await?;

        let matching: Vec<Flight> = flights
            .into_iter()
            .filter(|flight| {
                filter
                    .departure_date
                    .is_none_or(|date| self.guard.local_date(&flight.origin, flight.departure_time) == date)
            })
            .filter(|flight| check_availability(flight, &filter.min_seats).is_ok())
            .collect();

        tracing::debug!(results = matching.len(), "Flight search completed");
        Ok(matching)
    }

    /// Catalog view of [`Self::search_flights`]: one listing per flight with
    /// its cheapest fare and seat totals.
    ///
    /// # Errors
    ///
    /// Returns error on storage failure.
    pub async fn list_flights(&self, filter: &FlightFilter) -> Result<Vec<FlightListing>> {
        let flights = self.search_flights(filter).await?;
        Ok(flights.iter().map(Flight::listing).collect())
    }

    /// Sales figures for the airline's upcoming flights.
    ///
    /// `from` and `to` are inclusive UTC dates bounding the departure.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthorized`] unless the caller is staff of `airline`
    /// - [`BookingError::Validation`] if `from` is after `to`
    #[tracing::instrument(skip_all, fields(principal = %principal.username, airline = %airline))]
    pub async fn flight_statistics(
        &self,
        principal: &Principal,
        airline: &AirlineCode,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<StatisticsReport> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(BookingError::validation(format!(
                    "Statistics range start {from} is after end {to}"
                )));
            }
        }

        let mut tx = self.storage.begin().await?;
        authz::validate_airline_staff_authorization(&mut tx, principal, airline).await?;

        let now = self.clock.now();
        let query = FlightQuery {
            airline: Some(airline.clone()),
            departs_at_or_after: Some(from.map_or(now, |date| start_of_day(date).max(now))),
            departs_before: to.map(|date| start_of_day(date) + Duration::days(1)),
            ..FlightQuery::default()
        };

        let mut report = StatisticsReport::default();
        for flight in tx.find_flights(&query).await? {
            let bookings = tx.bookings_for_flight(flight.id).await?;
            let fares = bookings
                .iter()
                .flat_map(|b| b.passengers.iter().map(|p| p.price_at_booking));

            let row = FlightStatistics {
                flight_id: flight.id,
                departure_time: flight.departure_time,
                booking_count: bookings.len() as u64,
                passenger_count: bookings.iter().map(|b| b.passengers.len() as u64).sum(),
                revenue: Money::checked_sum(fares).ok_or_else(revenue_overflow)?,
            };

            report.overall_booking_count += row.booking_count;
            report.overall_passenger_count += row.passenger_count;
            report.overall_revenue = report
                .overall_revenue
                .checked_add(row.revenue)
                .ok_or_else(revenue_overflow)?;
            report.flights.push(row);
        }

        Ok(report)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn revenue_overflow() -> BookingError {
    BookingError::Storage(StorageError::Internal("revenue overflows u64 cents".to_string()))
}
