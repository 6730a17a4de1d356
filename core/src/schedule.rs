//! Flight Scheduling Guard.
//!
//! Caps how many flights one airline may operate on a route per calendar day.
//! The day is the departure date in the origin airport's local time, so a
//! 01:30 departure from Istanbul counts against that Istanbul day even though
//! it is still the previous day in UTC.

use crate::error::{BookingError, Result};
use crate::storage::Transaction;
use crate::types::{AirportCode, Flight, FlightRequest, Route};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum number of flights per (airline, origin, destination, local day).
pub const MAX_DAILY_FLIGHTS: u32 = 3;

/// Resolves an airport's UTC offset.
///
/// Live timezone data is an external concern; implementations are expected to
/// be cheap lookups.
pub trait TimezoneLookup: Send + Sync {
    /// Offset of `airport` from UTC.
    fn utc_offset(&self, airport: &AirportCode) -> FixedOffset;
}

/// Static airport→offset table with a fallback for unknown airports.
#[derive(Clone, Debug)]
pub struct FixedOffsetTimezones {
    offsets: HashMap<AirportCode, FixedOffset>,
    fallback: FixedOffset,
}

impl FixedOffsetTimezones {
    /// Empty table; every airport resolves to UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offsets: HashMap::new(),
            fallback: Utc.fix(),
        }
    }

    /// Register `airport` at `offset`.
    #[must_use]
    pub fn with_airport(mut self, airport: AirportCode, offset: FixedOffset) -> Self {
        self.offsets.insert(airport, offset);
        self
    }
}

impl Default for FixedOffsetTimezones {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimezoneLookup for FixedOffsetTimezones {
    fn utc_offset(&self, airport: &AirportCode) -> FixedOffset {
        self.offsets.get(airport).copied().unwrap_or(self.fallback)
    }
}

/// Half-open UTC interval `[start, end)` covering one local calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    /// Local midnight, in UTC
    pub start: DateTime<Utc>,
    /// Next local midnight, in UTC
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for `date` observed at `offset`.
    ///
    /// Clamped to chrono's representable range at either end.
    #[must_use]
    pub fn for_local_date(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
        let start = local_midnight
            .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            start,
            end: start
                .checked_add_signed(Duration::days(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// The serialization key of the daily cap: a route on one local day.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteDay {
    /// Airline and airports
    pub route: Route,
    /// Local departure date at the origin
    pub date: NaiveDate,
}

impl RouteDay {
    /// Stable string key, used for advisory locks.
    #[must_use]
    pub fn lock_key(&self) -> String {
        format!(
            "flight-cap:{}:{}:{}:{}",
            self.route.airline, self.route.origin, self.route.destination, self.date
        )
    }
}

impl fmt::Display for RouteDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.route, self.date)
    }
}

/// Local calendar date of `departure` at `offset`.
#[must_use]
pub fn local_departure_date(departure: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    departure.with_timezone(&offset).date_naive()
}

/// Enforces [`MAX_DAILY_FLIGHTS`].
#[derive(Clone)]
pub struct FlightSchedulingGuard {
    max_daily_flights: u32,
    timezones: Arc<dyn TimezoneLookup>,
}

impl FlightSchedulingGuard {
    /// Guard with the standard cap.
    #[must_use]
    pub fn new(timezones: Arc<dyn TimezoneLookup>) -> Self {
        Self::with_limit(timezones, MAX_DAILY_FLIGHTS)
    }

    /// Guard with a custom cap.
    #[must_use]
    pub fn with_limit(timezones: Arc<dyn TimezoneLookup>, max_daily_flights: u32) -> Self {
        Self {
            max_daily_flights,
            timezones,
        }
    }

    /// Configured cap.
    #[must_use]
    pub const fn max_daily_flights(&self) -> u32 {
        self.max_daily_flights
    }

    /// Local departure date at `origin`.
    #[must_use]
    pub fn local_date(&self, origin: &AirportCode, departure: DateTime<Utc>) -> NaiveDate {
        local_departure_date(departure, self.timezones.utc_offset(origin))
    }

    /// Lock key and UTC window for `route` departing at `departure`.
    #[must_use]
    pub fn route_day(&self, route: &Route, departure: DateTime<Utc>) -> (RouteDay, DayWindow) {
        let offset = self.timezones.utc_offset(&route.origin);
        let date = local_departure_date(departure, offset);
        (
            RouteDay {
                route: route.clone(),
                date,
            },
            DayWindow::for_local_date(date, offset),
        )
    }

    /// Whether an update moves the flight into a different route/day bucket.
    ///
    /// Compares airline, origin, destination and local departure date; time of
    /// day, duration and fares are cosmetic.
    #[must_use]
    pub fn has_flight_attr_changed(&self, existing: &Flight, request: &FlightRequest) -> bool {
        existing.airline != request.airline
            || existing.origin != request.origin
            || existing.destination != request.destination
            || self.local_date(&existing.origin, existing.departure_time)
                != self.local_date(&request.origin, request.departure_time)
    }

    /// Serialize on the route/day and fail if the cap is already reached.
    ///
    /// The lock taken here is held until `tx` ends, so the caller's insert or
    /// reschedule is counted by every later check for the same key.
    ///
    /// # Errors
    ///
    /// [`BookingError::LimitExceeded`] when the day is full, or a storage error.
    pub async fn validate_flight_limit<T: Transaction>(
        &self,
        tx: &mut T,
        route: &Route,
        departure: DateTime<Utc>,
    ) -> Result<()> {
        let (route_day, window) = self.route_day(route, departure);
        tx.lock_route_day(&route_day).await?;

        let scheduled = tx.count_flights_on_route_day(route, window).await?;
        if scheduled >= self.max_daily_flights {
            tracing::warn!(
                route_day = %route_day,
                scheduled,
                limit = self.max_daily_flights,
                "Daily flight limit reached"
            );
            return Err(BookingError::LimitExceeded {
                limit: self.max_daily_flights,
                airline: route.airline.clone(),
                origin: route.origin.clone(),
                destination: route.destination.clone(),
            });
        }

        tracing::debug!(route_day = %route_day, scheduled, "Daily flight limit check passed");
        Ok(())
    }
}

impl fmt::Debug for FlightSchedulingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightSchedulingGuard")
            .field("max_daily_flights", &self.max_daily_flights)
            .finish_non_exhaustive()
    }
}
