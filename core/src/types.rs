//! Domain types for the airline booking engine.
//!
//! Value objects (identifiers, codes, money), the flight/fare-class inventory
//! records, bookings with their passengers, and the request/response shapes
//! exchanged with the service layer.

use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a scheduled flight
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightId(Uuid);

impl FlightId {
    /// Creates a new random `FlightId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `FlightId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FlightId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a passenger row inside a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassengerId(Uuid);

impl PassengerId {
    /// Creates a new random `PassengerId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PassengerId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PassengerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login name of a user; the primary key of the user directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Creates a `Username` without validation (trusted input).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the raw username.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Reference codes
// ============================================================================

fn normalize_code(kind: &str, raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(BookingError::validation(format!("{kind} code must not be blank")));
    }
    if !(2..=4).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BookingError::validation(format!(
            "{kind} code '{code}' must be 2-4 ASCII letters or digits"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Airline designator (e.g. `THY`), always upper case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirlineCode(String);

impl AirlineCode {
    /// Parse and normalize an airline code.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the code is blank or malformed.
    pub fn new(raw: &str) -> Result<Self> {
        normalize_code("Airline", raw).map(Self)
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AirlineCode {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AirlineCode {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<AirlineCode> for String {
    fn from(code: AirlineCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirlineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Airport code (e.g. `IST`), always upper case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    /// Parse and normalize an airport code.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the code is blank or malformed.
    pub fn new(raw: &str) -> Result<Self> {
        normalize_code("Airport", raw).map(Self)
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AirportCode {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AirportCode {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Airline plus origin and destination: the scope of the daily flight cap.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Operating airline
    pub airline: AirlineCode,
    /// Departure airport
    pub origin: AirportCode,
    /// Arrival airport
    pub destination: AirportCode,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}->{}", self.airline, self.origin, self.destination)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Money amount in minor units (cents)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Sums an iterator of amounts, `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Fare classes
// ============================================================================

/// Priced seat category with independent capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FareClassTag {
    /// Economy cabin
    Economy,
    /// Business cabin
    Business,
    /// First class cabin
    First,
}

impl FareClassTag {
    /// Every tag, cheapest cabin first.
    pub const ALL: [Self; 3] = [Self::Economy, Self::Business, Self::First];

    /// Storage representation of the tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "ECONOMY",
            Self::Business => "BUSINESS",
            Self::First => "FIRST",
        }
    }
}

impl FromStr for FareClassTag {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECONOMY" => Ok(Self::Economy),
            "BUSINESS" => Ok(Self::Business),
            "FIRST" | "FIRST_CLASS" => Ok(Self::First),
            "" => Err(BookingError::validation("Fare class must not be blank")),
            other => Err(BookingError::validation(format!("Unknown fare class '{other}'"))),
        }
    }
}

impl fmt::Display for FareClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key of a fare-class row: `(flight, class tag)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FareClassKey {
    /// Owning flight
    pub flight_id: FlightId,
    /// Cabin
    pub tag: FareClassTag,
}

impl FareClassKey {
    /// Creates a key for `tag` on `flight_id`.
    #[must_use]
    pub const fn new(flight_id: FlightId, tag: FareClassTag) -> Self {
        Self { flight_id, tag }
    }
}

impl fmt::Display for FareClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.flight_id, self.tag)
    }
}

/// Seat inventory row for one cabin of one flight.
///
/// Invariant: `available_seats <= seat_count`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareClass {
    /// Owning flight
    pub flight_id: FlightId,
    /// Cabin
    pub tag: FareClassTag,
    /// Total capacity
    pub seat_count: u32,
    /// Remaining unbooked capacity
    pub available_seats: u32,
    /// Current fare per seat
    pub price: Money,
}

impl FareClass {
    /// Creates a fresh row with every seat available.
    #[must_use]
    pub const fn new(flight_id: FlightId, tag: FareClassTag, seat_count: u32, price: Money) -> Self {
        Self {
            flight_id,
            tag,
            seat_count,
            available_seats: seat_count,
            price,
        }
    }

    /// The row's composite key.
    #[must_use]
    pub const fn key(&self) -> FareClassKey {
        FareClassKey::new(self.flight_id, self.tag)
    }

    /// Seats already booked.
    #[must_use]
    pub const fn seats_sold(&self) -> u32 {
        self.seat_count.saturating_sub(self.available_seats)
    }

    /// Whether `available_seats` is within `0..=seat_count`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.available_seats <= self.seat_count
    }
}

// ============================================================================
// Flights
// ============================================================================

/// A scheduled flight with its fare-class inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Flight identifier
    pub id: FlightId,
    /// Operating airline
    pub airline: AirlineCode,
    /// Departure airport
    pub origin: AirportCode,
    /// Arrival airport
    pub destination: AirportCode,
    /// Departure instant (UTC)
    pub departure_time: DateTime<Utc>,
    /// Block time in minutes
    pub duration_minutes: u32,
    /// Arrival instant (UTC), `departure_time + duration_minutes`
    pub arrival_time: DateTime<Utc>,
    /// Inventory rows, at most one per tag
    pub fare_classes: Vec<FareClass>,
}

impl Flight {
    /// Builds a new flight from a validated request; every seat starts available.
    #[must_use]
    pub fn from_request(id: FlightId, request: &FlightRequest) -> Self {
        let fare_classes = request
            .fare_classes
            .iter()
            .map(|class| FareClass::new(id, class.tag, class.seat_count, class.price))
            .collect();

        Self {
            id,
            airline: request.airline.clone(),
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            departure_time: request.departure_time,
            duration_minutes: request.duration_minutes,
            arrival_time: request.arrival_time(),
            fare_classes,
        }
    }

    /// The `(airline, origin, destination)` triple.
    #[must_use]
    pub fn route(&self) -> Route {
        Route {
            airline: self.airline.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        }
    }

    /// Inventory row for `tag`, if the flight sells that cabin.
    #[must_use]
    pub fn fare_class(&self, tag: FareClassTag) -> Option<&FareClass> {
        self.fare_classes.iter().find(|class| class.tag == tag)
    }

    /// Total capacity over all cabins.
    #[must_use]
    pub fn total_seats(&self) -> u64 {
        self.fare_classes.iter().map(|c| u64::from(c.seat_count)).sum()
    }

    /// Remaining capacity over all cabins.
    #[must_use]
    pub fn available_seats(&self) -> u64 {
        self.fare_classes.iter().map(|c| u64::from(c.available_seats)).sum()
    }

    /// Cheapest fare on offer, if any cabin exists.
    #[must_use]
    pub fn min_price(&self) -> Option<Money> {
        self.fare_classes.iter().map(|c| c.price).min()
    }

    /// Catalog entry with capacity totals and the cheapest fare.
    #[must_use]
    pub fn listing(&self) -> FlightListing {
        FlightListing {
            flight: self.summary(),
            min_price: self.min_price(),
            total_seats: self.total_seats(),
            available_seats: self.available_seats(),
        }
    }

    /// Summary used inside booking responses.
    #[must_use]
    pub fn summary(&self) -> FlightSummary {
        FlightSummary {
            flight_id: self.id,
            airline: self.airline.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// Requested capacity and price for one cabin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareClassRequest {
    /// Cabin
    pub tag: FareClassTag,
    /// Capacity
    pub seat_count: u32,
    /// Fare per seat
    pub price: Money,
}

/// Staff request to create or update a flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRequest {
    /// Operating airline
    pub airline: AirlineCode,
    /// Departure airport
    pub origin: AirportCode,
    /// Arrival airport
    pub destination: AirportCode,
    /// Departure instant (UTC)
    pub departure_time: DateTime<Utc>,
    /// Block time in minutes
    pub duration_minutes: u32,
    /// Cabins to sell
    pub fare_classes: Vec<FareClassRequest>,
}

impl FlightRequest {
    /// Arrival instant implied by departure and duration.
    ///
    /// Saturates at the latest representable instant; [`Self::validate`]
    /// rejects requests that would.
    #[must_use]
    pub fn arrival_time(&self) -> DateTime<Utc> {
        self.checked_arrival_time().unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn checked_arrival_time(&self) -> Option<DateTime<Utc>> {
        self.departure_time
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
    }

    /// The `(airline, origin, destination)` triple.
    #[must_use]
    pub fn route(&self) -> Route {
        Route {
            airline: self.airline.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        }
    }

    /// Checks the request's internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when origin equals destination, the
    /// duration is zero or runs past the calendar, or a cabin appears more than
    /// once.
    pub fn validate(&self) -> Result<()> {
        if self.origin == self.destination {
            return Err(BookingError::validation(format!(
                "Origin and destination must differ (both {})",
                self.origin
            )));
        }

        if self.duration_minutes == 0 {
            return Err(BookingError::validation("Flight duration must be positive"));
        }

        if self.checked_arrival_time().is_none() {
            return Err(BookingError::validation(format!(
                "Arrival after {} plus {} minutes is out of range",
                self.departure_time, self.duration_minutes
            )));
        }

        for (index, class) in self.fare_classes.iter().enumerate() {
            if self.fare_classes[..index].iter().any(|c| c.tag == class.tag) {
                return Err(BookingError::validation(format!(
                    "Fare class {} listed more than once",
                    class.tag
                )));
            }
        }

        Ok(())
    }
}

/// Flight fields repeated in booking responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSummary {
    /// Flight identifier
    pub flight_id: FlightId,
    /// Operating airline
    pub airline: AirlineCode,
    /// Departure airport
    pub origin: AirportCode,
    /// Arrival airport
    pub destination: AirportCode,
    /// Departure instant (UTC)
    pub departure_time: DateTime<Utc>,
    /// Arrival instant (UTC)
    pub arrival_time: DateTime<Utc>,
    /// Block time in minutes
    pub duration_minutes: u32,
}

/// One row of the flight catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightListing {
    /// Schedule
    pub flight: FlightSummary,
    /// Cheapest fare over all cabins; `None` if nothing is on sale
    pub min_price: Option<Money>,
    /// Capacity over all cabins
    pub total_seats: u64,
    /// Unsold seats over all cabins
    pub available_seats: u64,
}

// ============================================================================
// Users
// ============================================================================

/// Role of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular customer
    Customer,
    /// Staff member of one airline
    AirlineStaff,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Storage representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::AirlineStaff => "AIRLINE_STAFF",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.strip_prefix("ROLE_").unwrap_or(normalized.as_str()) {
            "" => Err(BookingError::validation("Role must not be blank")),
            "CUSTOMER" | "USER" => Ok(Self::Customer),
            "AIRLINE_STAFF" => Ok(Self::AirlineStaff),
            "ADMIN" => Ok(Self::Admin),
            other => Err(BookingError::validation(format!("Unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name
    pub username: Username,
    /// Account role
    pub role: Role,
    /// Employing airline for staff accounts
    pub airline: Option<AirlineCode>,
}

impl User {
    /// A customer account.
    #[must_use]
    pub fn customer(username: impl Into<String>) -> Self {
        Self {
            username: Username::new(username),
            role: Role::Customer,
            airline: None,
        }
    }

    /// A staff account employed by `airline`.
    #[must_use]
    pub fn airline_staff(username: impl Into<String>, airline: AirlineCode) -> Self {
        Self {
            username: Username::new(username),
            role: Role::AirlineStaff,
            airline: Some(airline),
        }
    }
}

/// The authenticated caller, supplied by the (external) auth layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Authenticated username
    pub username: Username,
}

impl Principal {
    /// Creates a principal for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Username::new(username),
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Passenger details submitted with a booking request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Requested cabin
    pub fare_class: FareClassTag,
}

impl PassengerRequest {
    /// Convenience constructor.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        fare_class: FareClassTag,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            fare_class,
        }
    }
}

/// A booked passenger with the fare frozen at booking time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPassenger {
    /// Passenger row identifier
    pub id: PassengerId,
    /// Owning booking
    pub booking_id: BookingId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Booked cabin
    pub fare_class: FareClassTag,
    /// Fare snapshot; never rewritten after booking
    pub price_at_booking: Money,
}

/// A confirmed reservation for one or more passengers on one flight.
///
/// Invariant: `total_price` equals the sum of `price_at_booking`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Booked flight
    pub flight_id: FlightId,
    /// Requesting user
    pub username: Username,
    /// Passengers, in request order
    pub passengers: Vec<BookingPassenger>,
    /// Sum of frozen passenger fares
    pub total_price: Money,
    /// When the booking was made
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    /// Whether `total_price` matches the passenger fares.
    #[must_use]
    pub fn total_matches(&self) -> bool {
        Money::checked_sum(self.passengers.iter().map(|p| p.price_at_booking))
            == Some(self.total_price)
    }
}

/// Booking representation returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingView {
    /// The booking with its passengers
    pub booking: Booking,
    /// The booked flight
    pub flight: FlightSummary,
}

// ============================================================================
// Statistics
// ============================================================================

/// Sales figures for one flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightStatistics {
    /// Flight identifier
    pub flight_id: FlightId,
    /// Departure instant (UTC)
    pub departure_time: DateTime<Utc>,
    /// Number of bookings
    pub booking_count: u64,
    /// Number of booked passengers
    pub passenger_count: u64,
    /// Sum of frozen fares
    pub revenue: Money,
}

/// Per-airline sales report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Per-flight rows, by departure
    pub flights: Vec<FlightStatistics>,
    /// Total bookings
    pub overall_booking_count: u64,
    /// Total passengers
    pub overall_passenger_count: u64,
    /// Total revenue
    pub overall_revenue: Money,
}
