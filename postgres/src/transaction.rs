//! [`Transaction`] over a sqlx `PostgreSQL` transaction.

use crate::rows::{
    BookingRow, FareClassRow, FlightRow, PassengerRow, UserRow, minutes_to_db, money_to_db,
    seats_from_db, seats_to_db,
};
use airline_booking_core::schedule::{DayWindow, RouteDay};
use airline_booking_core::storage::{FlightQuery, SeatAdjustment, StorageResult, Transaction};
use airline_booking_core::types::{
    Booking, BookingId, FareClass, FareClassKey, Flight, FlightId, Money, Route, User, Username,
};
use airline_booking_core::StorageError;
use sqlx::Postgres;
use std::collections::HashMap;
use uuid::Uuid;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATEs raised when a concurrent transaction changed the rows this one
/// depends on.
///
/// A foreign key violation means the parent flight was deleted after it was
/// read; a unique violation means another transaction inserted the same fare
/// class first. Both resolve on retry, which re-reads the committed state and
/// reports `NotFound` or applies the write as an update.
fn is_lost_race(code: &str) -> bool {
    matches!(
        code,
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED | FOREIGN_KEY_VIOLATION | UNIQUE_VIOLATION
    )
}

/// Maps a sqlx error, classifying lost races as [`StorageError::Conflict`].
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |error| {
        if let sqlx::Error::Database(db) = &error {
            if db.code().as_deref().is_some_and(is_lost_race) {
                metrics::counter!("booking_storage_conflicts_total").increment(1);
                return StorageError::Conflict(format!("{context}: {db}"));
            }
        }
        StorageError::Database(format!("Failed to {context}: {error}"))
    }
}

const FLIGHT_COLUMNS: &str =
    "id, airline, origin, destination, departure_time, duration_minutes, arrival_time";

/// One open `PostgreSQL` transaction. Dropping it rolls back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    pub(crate) const fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    async fn fare_classes_of(&mut self, flight_ids: Vec<Uuid>) -> StorageResult<HashMap<Uuid, Vec<FareClass>>> {
        let rows: Vec<FareClassRow> = sqlx::query_as(
            r"
            SELECT flight_id, class, seat_count, available_seats, price_cents
            FROM fare_classes
            WHERE flight_id = ANY($1)
            ",
        )
        .bind(flight_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("load fare classes"))?;

        let mut grouped: HashMap<Uuid, Vec<FareClass>> = HashMap::new();
        for row in rows {
            let flight_id = row.flight_id;
            grouped.entry(flight_id).or_default().push(row.into_fare_class()?);
        }
        Ok(grouped)
    }

    async fn with_fare_classes(&mut self, rows: Vec<FlightRow>) -> StorageResult<Vec<Flight>> {
        let mut classes = self.fare_classes_of(rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|row| {
                let fare_classes = classes.remove(&row.id).unwrap_or_default();
                row.into_flight(fare_classes)
            })
            .collect()
    }

    async fn with_passengers(&mut self, rows: Vec<BookingRow>) -> StorageResult<Vec<Booking>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let passenger_rows: Vec<PassengerRow> = sqlx::query_as(
            r"
            SELECT id, booking_id, first_name, last_name, email, class, price_at_booking_cents
            FROM booking_passengers
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, position
            ",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("load passengers"))?;

        let mut grouped: HashMap<Uuid, Vec<_>> = HashMap::new();
        for row in passenger_rows {
            let booking_id = row.booking_id;
            grouped.entry(booking_id).or_default().push(row.into_passenger()?);
        }

        rows.into_iter()
            .map(|row| {
                let passengers = grouped.remove(&row.id).unwrap_or_default();
                row.into_booking(passengers)
            })
            .collect()
    }

    async fn available_seats(&mut self, key: FareClassKey) -> StorageResult<Option<u32>> {
        let available: Option<i32> = sqlx::query_scalar(
            "SELECT available_seats FROM fare_classes WHERE flight_id = $1 AND class = $2",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("read fare class"))?;

        available
            .map(|seats| seats_from_db("fare_classes.available_seats", seats))
            .transpose()
    }

    /// Classify a guarded statement that touched no row.
    async fn refusal(&mut self, key: FareClassKey) -> StorageResult<SeatAdjustment> {
        Ok(match self.available_seats(key).await? {
            Some(available) => SeatAdjustment::Rejected { available },
            None => SeatAdjustment::Missing,
        })
    }

    async fn flight_exists(&mut self, id: FlightId) -> StorageResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM flights WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error("check flight"))
    }

    async fn insert_fare_class(&mut self, key: FareClassKey, seat_count: u32, price: Money) -> StorageResult<()> {
        let seats = seats_to_db(seat_count)?;
        sqlx::query(
            r"
            INSERT INTO fare_classes (flight_id, class, seat_count, available_seats, price_cents)
            VALUES ($1, $2, $3, $3, $4)
            ",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .bind(seats)
        .bind(money_to_db(price)?)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert fare class"))?;
        Ok(())
    }
}

fn applied(available: i32) -> StorageResult<SeatAdjustment> {
    Ok(SeatAdjustment::Applied {
        available: seats_from_db("fare_classes.available_seats", available)?,
    })
}

impl Transaction for PostgresTransaction {
    async fn find_user(&mut self, username: &Username) -> StorageResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT username, role, airline FROM app_users WHERE username = $1")
                .bind(username.as_str())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("load user"))?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_flight(&mut self, id: FlightId) -> StorageResult<Option<Flight>> {
        let row: Option<FlightRow> =
            sqlx::query_as(&format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_error("load flight"))?;

        match row {
            Some(row) => Ok(self.with_fare_classes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_flights(&mut self, query: &FlightQuery) -> StorageResult<Vec<Flight>> {
        let sql = format!(
            r"
            SELECT {FLIGHT_COLUMNS}
            FROM flights
            WHERE ($1::text IS NULL OR airline = $1)
              AND ($2::text IS NULL OR origin = $2)
              AND ($3::text IS NULL OR destination = $3)
              AND ($4::timestamptz IS NULL OR departure_time >= $4)
              AND ($5::timestamptz IS NULL OR departure_time < $5)
            ORDER BY departure_time, id
            "
        );
        let rows: Vec<FlightRow> = sqlx::query_as(&sql)
            .bind(query.airline.as_ref().map(|c| c.as_str().to_string()))
            .bind(query.origin.as_ref().map(|c| c.as_str().to_string()))
            .bind(query.destination.as_ref().map(|c| c.as_str().to_string()))
            .bind(query.departs_at_or_after)
            .bind(query.departs_before)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error("search flights"))?;

        self.with_fare_classes(rows).await
    }

    async fn lock_route_day(&mut self, key: &RouteDay) -> StorageResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key.lock_key())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("lock route day"))?;
        tracing::debug!(route_day = %key, "Acquired route-day lock");
        Ok(())
    }

    async fn count_flights_on_route_day(&mut self, route: &Route, window: DayWindow) -> StorageResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM flights
            WHERE airline = $1 AND origin = $2 AND destination = $3
              AND departure_time >= $4 AND departure_time < $5
            ",
        )
        .bind(route.airline.as_str())
        .bind(route.origin.as_str())
        .bind(route.destination.as_str())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("count flights"))?;

        u32::try_from(count).map_err(|e| StorageError::Internal(format!("Flight count {count}: {e}")))
    }

    async fn insert_flight(&mut self, flight: &Flight) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO flights
                (id, airline, origin, destination, departure_time, duration_minutes, arrival_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(flight.id.as_uuid())
        .bind(flight.airline.as_str())
        .bind(flight.origin.as_str())
        .bind(flight.destination.as_str())
        .bind(flight.departure_time)
        .bind(minutes_to_db(flight.duration_minutes)?)
        .bind(flight.arrival_time)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert flight"))?;

        for class in &flight.fare_classes {
            self.insert_fare_class(class.key(), class.seat_count, class.price).await?;
        }
        Ok(())
    }

    async fn update_flight_schedule(&mut self, flight: &Flight) -> StorageResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE flights
            SET origin = $2, destination = $3, departure_time = $4,
                duration_minutes = $5, arrival_time = $6
            WHERE id = $1
            ",
        )
        .bind(flight.id.as_uuid())
        .bind(flight.origin.as_str())
        .bind(flight.destination.as_str())
        .bind(flight.departure_time)
        .bind(minutes_to_db(flight.duration_minutes)?)
        .bind(flight.arrival_time)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update flight"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_fare_class(
        &mut self,
        key: FareClassKey,
        seat_count: u32,
        price: Money,
    ) -> StorageResult<SeatAdjustment> {
        let seats = seats_to_db(seat_count)?;
        let resized: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE fare_classes
            SET available_seats = $3 - (seat_count - available_seats),
                seat_count = $3,
                price_cents = $4
            WHERE flight_id = $1 AND class = $2
              AND $3 >= seat_count - available_seats
            RETURNING available_seats
            ",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .bind(seats)
        .bind(money_to_db(price)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("resize fare class"))?;

        if let Some(available) = resized {
            return applied(available);
        }
        if let Some(available) = self.available_seats(key).await? {
            return Ok(SeatAdjustment::Rejected { available });
        }
        if !self.flight_exists(key.flight_id).await? {
            return Ok(SeatAdjustment::Missing);
        }

        self.insert_fare_class(key, seat_count, price).await?;
        Ok(SeatAdjustment::Applied { available: seat_count })
    }

    async fn remove_fare_class(&mut self, key: FareClassKey) -> StorageResult<SeatAdjustment> {
        let removed: Option<i32> = sqlx::query_scalar(
            r"
            DELETE FROM fare_classes
            WHERE flight_id = $1 AND class = $2 AND available_seats = seat_count
            RETURNING available_seats
            ",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("remove fare class"))?;

        match removed {
            Some(available) => applied(available),
            None => self.refusal(key).await,
        }
    }

    async fn delete_flight(&mut self, id: FlightId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete flight"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn decrement_seats(&mut self, key: FareClassKey, seats: u32) -> StorageResult<SeatAdjustment> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE fare_classes
            SET available_seats = available_seats - $3
            WHERE flight_id = $1 AND class = $2 AND available_seats >= $3
            RETURNING available_seats
            ",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .bind(seats_to_db(seats)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("decrement seats"))?;

        match remaining {
            Some(available) => applied(available),
            None => self.refusal(key).await,
        }
    }

    async fn restock_seats(&mut self, key: FareClassKey, seats: u32) -> StorageResult<SeatAdjustment> {
        let available: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE fare_classes
            SET available_seats = LEAST(seat_count, available_seats + $3)
            WHERE flight_id = $1 AND class = $2
            RETURNING available_seats
            ",
        )
        .bind(key.flight_id.as_uuid())
        .bind(key.tag.as_str())
        .bind(seats_to_db(seats)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("restock seats"))?;

        match available {
            Some(available) => applied(available),
            None => Ok(SeatAdjustment::Missing),
        }
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO bookings (id, flight_id, username, total_price_cents, booked_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.flight_id.as_uuid())
        .bind(booking.username.as_str())
        .bind(money_to_db(booking.total_price)?)
        .bind(booking.booked_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert booking"))?;

        for (position, passenger) in (0_i32..).zip(&booking.passengers) {
            sqlx::query(
                r"
                INSERT INTO booking_passengers
                    (id, booking_id, position, first_name, last_name, email, class, price_at_booking_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(passenger.id.as_uuid())
            .bind(booking.id.as_uuid())
            .bind(position)
            .bind(&passenger.first_name)
            .bind(&passenger.last_name)
            .bind(&passenger.email)
            .bind(passenger.fare_class.as_str())
            .bind(money_to_db(passenger.price_at_booking)?)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("insert passenger"))?;
        }
        Ok(())
    }

    async fn find_booking(&mut self, id: BookingId) -> StorageResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, flight_id, username, total_price_cents, booked_at FROM bookings WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("load booking"))?;

        match row {
            Some(row) => Ok(self.with_passengers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn bookings_for_user(&mut self, username: &Username) -> StorageResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            r"
            SELECT id, flight_id, username, total_price_cents, booked_at
            FROM bookings
            WHERE username = $1
            ORDER BY booked_at, id
            ",
        )
        .bind(username.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("list user bookings"))?;

        self.with_passengers(rows).await
    }

    async fn bookings_for_flight(&mut self, flight_id: FlightId) -> StorageResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            r"
            SELECT id, flight_id, username, total_price_cents, booked_at
            FROM bookings
            WHERE flight_id = $1
            ORDER BY booked_at, id
            ",
        )
        .bind(flight_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("list flight bookings"))?;

        self.with_passengers(rows).await
    }

    async fn delete_booking(&mut self, id: BookingId) -> StorageResult<Option<Booking>> {
        let Some(booking) = self.find_booking(id).await? else {
            return Ok(None);
        };

        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("delete booking"))?;

        Ok((result.rows_affected() > 0).then_some(booking))
    }

    async fn commit(self) -> StorageResult<()> {
        self.tx.commit().await.map_err(db_error("commit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_races_are_classified_by_sqlstate() {
        for code in ["40001", "40P01", "23503", "23505"] {
            assert!(is_lost_race(code), "{code}");
        }
        for code in ["23514", "42P01", "08006"] {
            assert!(!is_lost_race(code), "{code}");
        }
    }
}
