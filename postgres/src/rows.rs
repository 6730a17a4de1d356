//! Row shapes and their conversion into domain types.

use airline_booking_core::storage::StorageResult;
use airline_booking_core::types::{
    AirlineCode, AirportCode, Booking, BookingId, BookingPassenger, FareClass, FareClassTag,
    Flight, FlightId, Money, PassengerId, Role, User, Username,
};
use airline_booking_core::StorageError;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

fn corrupt(column: &str, error: impl fmt::Display) -> StorageError {
    StorageError::Internal(format!("Corrupt {column} column: {error}"))
}

pub(crate) fn seats_to_db(seats: u32) -> StorageResult<i32> {
    i32::try_from(seats).map_err(|e| StorageError::Internal(format!("Seat count {seats} out of range: {e}")))
}

pub(crate) fn minutes_to_db(minutes: u32) -> StorageResult<i32> {
    i32::try_from(minutes)
        .map_err(|e| StorageError::Internal(format!("Duration of {minutes} minutes out of range: {e}")))
}

pub(crate) fn money_to_db(amount: Money) -> StorageResult<i64> {
    i64::try_from(amount.cents())
        .map_err(|e| StorageError::Internal(format!("Amount {amount} out of range: {e}")))
}

pub(crate) fn seats_from_db(column: &str, seats: i32) -> StorageResult<u32> {
    u32::try_from(seats).map_err(|e| corrupt(column, e))
}

fn money_from_db(column: &str, cents: i64) -> StorageResult<Money> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|e| corrupt(column, e))
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    username: String,
    role: String,
    airline: Option<String>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> StorageResult<User> {
        let role: Role = self.role.parse().map_err(|e| corrupt("app_users.role", e))?;
        let airline = self
            .airline
            .as_deref()
            .map(AirlineCode::new)
            .transpose()
            .map_err(|e| corrupt("app_users.airline", e))?;

        Ok(User {
            username: Username::new(self.username),
            role,
            airline,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    pub(crate) id: Uuid,
    airline: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    duration_minutes: i32,
    arrival_time: DateTime<Utc>,
}

impl FlightRow {
    pub(crate) fn into_flight(self, mut fare_classes: Vec<FareClass>) -> StorageResult<Flight> {
        fare_classes.sort_by_key(|class| class.tag);

        Ok(Flight {
            id: FlightId::from_uuid(self.id),
            airline: AirlineCode::new(&self.airline).map_err(|e| corrupt("flights.airline", e))?,
            origin: AirportCode::new(&self.origin).map_err(|e| corrupt("flights.origin", e))?,
            destination: AirportCode::new(&self.destination)
                .map_err(|e| corrupt("flights.destination", e))?,
            departure_time: self.departure_time,
            duration_minutes: seats_from_db("flights.duration_minutes", self.duration_minutes)?,
            arrival_time: self.arrival_time,
            fare_classes,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FareClassRow {
    pub(crate) flight_id: Uuid,
    class: String,
    seat_count: i32,
    available_seats: i32,
    price_cents: i64,
}

impl FareClassRow {
    pub(crate) fn into_fare_class(self) -> StorageResult<FareClass> {
        Ok(FareClass {
            flight_id: FlightId::from_uuid(self.flight_id),
            tag: self
                .class
                .parse::<FareClassTag>()
                .map_err(|e| corrupt("fare_classes.class", e))?,
            seat_count: seats_from_db("fare_classes.seat_count", self.seat_count)?,
            available_seats: seats_from_db("fare_classes.available_seats", self.available_seats)?,
            price: money_from_db("fare_classes.price_cents", self.price_cents)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    pub(crate) id: Uuid,
    flight_id: Uuid,
    username: String,
    total_price_cents: i64,
    booked_at: DateTime<Utc>,
}

impl BookingRow {
    pub(crate) fn into_booking(self, passengers: Vec<BookingPassenger>) -> StorageResult<Booking> {
        Ok(Booking {
            id: BookingId::from_uuid(self.id),
            flight_id: FlightId::from_uuid(self.flight_id),
            username: Username::new(self.username),
            passengers,
            total_price: money_from_db("bookings.total_price_cents", self.total_price_cents)?,
            booked_at: self.booked_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PassengerRow {
    id: Uuid,
    pub(crate) booking_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    class: String,
    price_at_booking_cents: i64,
}

impl PassengerRow {
    pub(crate) fn into_passenger(self) -> StorageResult<BookingPassenger> {
        Ok(BookingPassenger {
            id: PassengerId::from_uuid(self.id),
            booking_id: BookingId::from_uuid(self.booking_id),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            fare_class: self
                .class
                .parse::<FareClassTag>()
                .map_err(|e| corrupt("booking_passengers.class", e))?,
            price_at_booking: money_from_db(
                "booking_passengers.price_at_booking_cents",
                self.price_at_booking_cents,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn negative_counters_are_reported_as_corruption() {
        let row = FareClassRow {
            flight_id: Uuid::new_v4(),
            class: "ECONOMY".to_string(),
            seat_count: 80,
            available_seats: -1,
            price_cents: 15_000,
        };

        assert!(matches!(row.into_fare_class(), Err(StorageError::Internal(_))));
    }

    #[test]
    fn legacy_role_names_are_accepted() {
        let row = UserRow {
            username: "thy-staff".to_string(),
            role: "ROLE_AIRLINE_STAFF".to_string(),
            airline: Some("thy".to_string()),
        };

        let user = row.into_user().unwrap();
        assert_eq!(user.role, Role::AirlineStaff);
        assert_eq!(user.airline.unwrap().as_str(), "THY");
    }

    #[test]
    fn out_of_range_amounts_are_refused() {
        assert!(money_to_db(Money::from_cents(u64::MAX)).is_err());
        assert_eq!(money_to_db(Money::from_cents(30_000)).unwrap(), 30_000);
    }

    #[test]
    fn duration_overflow_names_the_duration() {
        let error = minutes_to_db(u32::MAX).unwrap_err();
        assert!(error.to_string().contains("minutes"), "{error}");
        assert_eq!(minutes_to_db(210).unwrap(), 210);
    }
}
