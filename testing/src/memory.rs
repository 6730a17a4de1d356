//! In-memory storage backend.
//!
//! Each transaction works on a private copy of the tables and records the
//! writes it made. `commit` replays those writes against the latest committed
//! tables under the table lock, re-checking every guard (seat counts, row
//! existence). If a concurrent commit invalidated one of them, nothing is
//! applied and the commit fails with [`StorageError::Conflict`].
//!
//! Route/day locks are real async mutexes held until the transaction is
//! committed or dropped. Acquiring one rebases the private copy onto the
//! latest committed tables, so counts read under the lock are current.

use airline_booking_core::schedule::{DayWindow, RouteDay};
use airline_booking_core::storage::{
    FlightQuery, SeatAdjustment, Storage, StorageResult, Transaction,
};
use airline_booking_core::types::{
    Booking, BookingId, FareClass, FareClassKey, FareClassTag, Flight, FlightId, Money, Route,
    User, Username,
};
use airline_booking_core::StorageError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

#[derive(Clone, Debug, Default)]
struct Tables {
    users: HashMap<Username, User>,
    /// Flight headers; `fare_classes` is always empty here.
    flights: BTreeMap<FlightId, Flight>,
    fare_classes: BTreeMap<FareClassKey, FareClass>,
    bookings: BTreeMap<BookingId, Booking>,
}

impl Tables {
    fn fare_classes_of(&self, id: FlightId) -> impl Iterator<Item = &FareClass> {
        self.fare_classes
            .range(FareClassKey::new(id, FareClassTag::Economy)..=FareClassKey::new(id, FareClassTag::First))
            .map(|(_, class)| class)
    }

    fn flight(&self, id: FlightId) -> Option<Flight> {
        self.flights.get(&id).map(|header| {
            let mut flight = header.clone();
            flight.fare_classes = self.fare_classes_of(id).cloned().collect();
            flight
        })
    }

    fn insert_flight(&mut self, flight: &Flight) -> bool {
        if self.flights.contains_key(&flight.id) {
            return false;
        }
        for class in &flight.fare_classes {
            self.fare_classes.insert(class.key(), class.clone());
        }
        let mut header = flight.clone();
        header.fare_classes.clear();
        self.flights.insert(flight.id, header);
        true
    }

    fn update_schedule(&mut self, flight: &Flight) -> bool {
        let Some(header) = self.flights.get_mut(&flight.id) else {
            return false;
        };
        header.origin = flight.origin.clone();
        header.destination = flight.destination.clone();
        header.departure_time = flight.departure_time;
        header.duration_minutes = flight.duration_minutes;
        header.arrival_time = flight.arrival_time;
        true
    }

    fn upsert_fare_class(&mut self, key: FareClassKey, seat_count: u32, price: Money) -> SeatAdjustment {
        if !self.flights.contains_key(&key.flight_id) {
            return SeatAdjustment::Missing;
        }
        match self.fare_classes.get_mut(&key) {
            Some(class) => {
                let sold = class.seats_sold();
                if seat_count < sold {
                    return SeatAdjustment::Rejected {
                        available: class.available_seats,
                    };
                }
                class.seat_count = seat_count;
                class.available_seats = seat_count - sold;
                class.price = price;
                SeatAdjustment::Applied {
                    available: class.available_seats,
                }
            }
            None => {
                self.fare_classes
                    .insert(key, FareClass::new(key.flight_id, key.tag, seat_count, price));
                SeatAdjustment::Applied {
                    available: seat_count,
                }
            }
        }
    }

    fn remove_fare_class(&mut self, key: FareClassKey) -> SeatAdjustment {
        match self.fare_classes.get(&key) {
            None => SeatAdjustment::Missing,
            Some(class) if class.seats_sold() > 0 => SeatAdjustment::Rejected {
                available: class.available_seats,
            },
            Some(class) => {
                let available = class.available_seats;
                self.fare_classes.remove(&key);
                SeatAdjustment::Applied { available }
            }
        }
    }

    fn delete_flight(&mut self, id: FlightId) -> bool {
        if !self.flights.contains_key(&id) {
            return false;
        }
        self.bookings.retain(|_, booking| booking.flight_id != id);
        self.fare_classes.retain(|key, _| key.flight_id != id);
        self.flights.remove(&id);
        true
    }

    fn decrement(&mut self, key: FareClassKey, seats: u32) -> SeatAdjustment {
        match self.fare_classes.get_mut(&key) {
            None => SeatAdjustment::Missing,
            Some(class) => match class.available_seats.checked_sub(seats) {
                Some(remaining) => {
                    class.available_seats = remaining;
                    SeatAdjustment::Applied { available: remaining }
                }
                None => SeatAdjustment::Rejected {
                    available: class.available_seats,
                },
            },
        }
    }

    fn restock(&mut self, key: FareClassKey, seats: u32) -> SeatAdjustment {
        match self.fare_classes.get_mut(&key) {
            None => SeatAdjustment::Missing,
            Some(class) => {
                class.available_seats = class.available_seats.saturating_add(seats).min(class.seat_count);
                SeatAdjustment::Applied {
                    available: class.available_seats,
                }
            }
        }
    }

    fn insert_booking(&mut self, booking: &Booking) -> bool {
        if !self.flights.contains_key(&booking.flight_id) || self.bookings.contains_key(&booking.id) {
            return false;
        }
        self.bookings.insert(booking.id, booking.clone());
        true
    }

    fn sorted_bookings(&self, keep: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self.bookings.values().filter(|b| keep(b)).cloned().collect();
        bookings.sort_by_key(|b| (b.booked_at, b.id));
        bookings
    }

    /// Re-applies a staged write; `false` if its guard no longer holds.
    fn replay(&mut self, write: &StagedWrite) -> bool {
        match write {
            StagedWrite::InsertFlight(flight) => self.insert_flight(flight),
            StagedWrite::UpdateSchedule(flight) => self.update_schedule(flight),
            StagedWrite::UpsertFareClass {
                key,
                seat_count,
                price,
            } => matches!(
                self.upsert_fare_class(*key, *seat_count, *price),
                SeatAdjustment::Applied { .. }
            ),
            StagedWrite::RemoveFareClass(key) => {
                matches!(self.remove_fare_class(*key), SeatAdjustment::Applied { .. })
            }
            StagedWrite::DeleteFlight(id) => self.delete_flight(*id),
            StagedWrite::Decrement { key, seats } => {
                matches!(self.decrement(*key, *seats), SeatAdjustment::Applied { .. })
            }
            StagedWrite::Restock { key, seats } => {
                matches!(self.restock(*key, *seats), SeatAdjustment::Applied { .. })
            }
            StagedWrite::InsertBooking(booking) => self.insert_booking(booking),
            StagedWrite::DeleteBooking(id) => self.bookings.remove(id).is_some(),
        }
    }
}

#[derive(Clone, Debug)]
enum StagedWrite {
    InsertFlight(Flight),
    UpdateSchedule(Flight),
    UpsertFareClass {
        key: FareClassKey,
        seat_count: u32,
        price: Money,
    },
    RemoveFareClass(FareClassKey),
    DeleteFlight(FlightId),
    Decrement {
        key: FareClassKey,
        seats: u32,
    },
    Restock {
        key: FareClassKey,
        seats: u32,
    },
    InsertBooking(Booking),
    DeleteBooking(BookingId),
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    route_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    fail_next_commit: AtomicBool,
    commit_delay_ms: AtomicU64,
    conflicts: AtomicU64,
}

impl Shared {
    fn tables(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Internal("in-memory tables poisoned".to_string()))
    }
}

/// Thread-safe in-memory [`Storage`] with optimistic commits.
///
/// Cloning shares the underlying tables.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    shared: Arc<Shared>,
}

impl InMemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record (reference data is managed elsewhere).
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn upsert_user(&self, user: User) -> StorageResult<()> {
        self.shared.tables()?.users.insert(user.username.clone(), user);
        Ok(())
    }

    /// Make the next commit fail with a database error, applying nothing.
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Sleep this long at the start of every commit.
    ///
    /// Widens the window between a transaction's snapshot and its commit so
    /// concurrent transactions overlap.
    pub fn delay_commits(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.shared.commit_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of commits rejected with a conflict so far.
    #[must_use]
    pub fn conflict_count(&self) -> u64 {
        self.shared.conflicts.load(Ordering::SeqCst)
    }

    /// Committed flight with its fare classes.
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn flight(&self, id: FlightId) -> StorageResult<Option<Flight>> {
        Ok(self.shared.tables()?.flight(id))
    }

    /// Committed fare-class row.
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn fare_class(&self, key: FareClassKey) -> StorageResult<Option<FareClass>> {
        Ok(self.shared.tables()?.fare_classes.get(&key).cloned())
    }

    /// Every committed fare-class row.
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn fare_classes(&self) -> StorageResult<Vec<FareClass>> {
        Ok(self.shared.tables()?.fare_classes.values().cloned().collect())
    }

    /// Every committed booking, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn bookings(&self) -> StorageResult<Vec<Booking>> {
        Ok(self.shared.tables()?.sorted_bookings(|_| true))
    }

    /// Number of committed flights.
    ///
    /// # Errors
    ///
    /// Returns error if the tables are poisoned.
    pub fn flight_count(&self) -> StorageResult<usize> {
        Ok(self.shared.tables()?.flights.len())
    }
}

impl Storage for InMemoryStorage {
    type Tx = InMemoryTransaction;

    fn begin(&self) -> impl Future<Output = StorageResult<Self::Tx>> + Send {
        let shared = Arc::clone(&self.shared);

        async move {
            let working = shared.tables()?.clone();
            Ok(InMemoryTransaction {
                shared,
                working,
                staged: Vec::new(),
                held_locks: HashSet::new(),
                guards: Vec::new(),
            })
        }
    }
}

/// Transaction over [`InMemoryStorage`].
///
/// Dropping it discards every staged write and releases its route/day locks.
#[derive(Debug)]
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    working: Tables,
    staged: Vec<StagedWrite>,
    held_locks: HashSet<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl InMemoryTransaction {
    fn stage_if(&mut self, applied: bool, write: StagedWrite) -> bool {
        if applied {
            self.staged.push(write);
        }
        applied
    }

    fn stage_adjustment(&mut self, adjustment: SeatAdjustment, write: StagedWrite) -> SeatAdjustment {
        self.stage_if(matches!(adjustment, SeatAdjustment::Applied { .. }), write);
        adjustment
    }

    /// Replays this transaction's writes on top of the latest committed state.
    fn rebase(&mut self) -> StorageResult<()> {
        let mut fresh = self.shared.tables()?.clone();
        if self.staged.iter().all(|write| fresh.replay(write)) {
            self.working = fresh;
            Ok(())
        } else {
            Err(StorageError::Conflict(
                "staged writes no longer apply to committed state".to_string(),
            ))
        }
    }
}

impl Transaction for InMemoryTransaction {
    fn find_user(
        &mut self,
        username: &Username,
    ) -> impl Future<Output = StorageResult<Option<User>>> + Send {
        let user = self.working.users.get(username).cloned();
        async move { Ok(user) }
    }

    fn find_flight(
        &mut self,
        id: FlightId,
    ) -> impl Future<Output = StorageResult<Option<Flight>>> + Send {
        let flight = self.working.flight(id);
        async move { Ok(flight) }
    }

    fn find_flights(
        &mut self,
        query: &FlightQuery,
    ) -> impl Future<Output = StorageResult<Vec<Flight>>> + Send {
        let mut flights: Vec<Flight> = self
            .working
            .flights
            .values()
            .filter(|header| query.matches(header))
            .filter_map(|header| self.working.flight(header.id))
            .collect();
        flights.sort_by_key(|f| (f.departure_time, f.id));
        async move { Ok(flights) }
    }

    fn lock_route_day(&mut self, key: &RouteDay) -> impl Future<Output = StorageResult<()>> + Send {
        let lock_key = key.lock_key();

        async move {
            if self.held_locks.contains(&lock_key) {
                return Ok(());
            }

            let lock = {
                let mut locks = self
                    .shared
                    .route_locks
                    .lock()
                    .map_err(|_| StorageError::Internal("route locks poisoned".to_string()))?;
                Arc::clone(locks.entry(lock_key.clone()).or_default())
            };

            let guard = lock.lock_owned().await;
            self.guards.push(guard);
            self.held_locks.insert(lock_key);
            self.rebase()
        }
    }

    fn count_flights_on_route_day(
        &mut self,
        route: &Route,
        window: DayWindow,
    ) -> impl Future<Output = StorageResult<u32>> + Send {
        let count = self
            .working
            .flights
            .values()
            .filter(|f| {
                f.airline == route.airline
                    && f.origin == route.origin
                    && f.destination == route.destination
                    && window.contains(f.departure_time)
            })
            .count();
        let count = u32::try_from(count)
            .map_err(|_| StorageError::Internal(format!("flight count {count} overflows u32")));
        async move { count }
    }

    fn insert_flight(&mut self, flight: &Flight) -> impl Future<Output = StorageResult<()>> + Send {
        let inserted = self.working.insert_flight(flight);
        let result = if self.stage_if(inserted, StagedWrite::InsertFlight(flight.clone())) {
            Ok(())
        } else {
            Err(StorageError::Database(format!("flight {} already exists", flight.id)))
        };
        async move { result }
    }

    fn update_flight_schedule(
        &mut self,
        flight: &Flight,
    ) -> impl Future<Output = StorageResult<bool>> + Send {
        let updated = self.working.update_schedule(flight);
        let updated = self.stage_if(updated, StagedWrite::UpdateSchedule(flight.clone()));
        async move { Ok(updated) }
    }

    fn upsert_fare_class(
        &mut self,
        key: FareClassKey,
        seat_count: u32,
        price: Money,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send {
        let adjustment = self.working.upsert_fare_class(key, seat_count, price);
        let adjustment = self.stage_adjustment(
            adjustment,
            StagedWrite::UpsertFareClass {
                key,
                seat_count,
                price,
            },
        );
        async move { Ok(adjustment) }
    }

    fn remove_fare_class(
        &mut self,
        key: FareClassKey,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send {
        let adjustment = self.working.remove_fare_class(key);
        let adjustment = self.stage_adjustment(adjustment, StagedWrite::RemoveFareClass(key));
        async move { Ok(adjustment) }
    }

    fn delete_flight(&mut self, id: FlightId) -> impl Future<Output = StorageResult<bool>> + Send {
        let deleted = self.working.delete_flight(id);
        let deleted = self.stage_if(deleted, StagedWrite::DeleteFlight(id));
        async move { Ok(deleted) }
    }

    fn decrement_seats(
        &mut self,
        key: FareClassKey,
        seats: u32,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send {
        let adjustment = self.working.decrement(key, seats);
        let adjustment = self.stage_adjustment(adjustment, StagedWrite::Decrement { key, seats });
        async move { Ok(adjustment) }
    }

    fn restock_seats(
        &mut self,
        key: FareClassKey,
        seats: u32,
    ) -> impl Future<Output = StorageResult<SeatAdjustment>> + Send {
        let adjustment = self.working.restock(key, seats);
        let adjustment = self.stage_adjustment(adjustment, StagedWrite::Restock { key, seats });
        async move { Ok(adjustment) }
    }

    fn insert_booking(
        &mut self,
        booking: &Booking,
    ) -> impl Future<Output = StorageResult<()>> + Send {
        let inserted = self.working.insert_booking(booking);
        let result = if self.stage_if(inserted, StagedWrite::InsertBooking(booking.clone())) {
            Ok(())
        } else {
            Err(StorageError::Database(format!(
                "booking {} rejected: flight {} missing or id taken",
                booking.id, booking.flight_id
            )))
        };
        async move { result }
    }

    fn find_booking(
        &mut self,
        id: BookingId,
    ) -> impl Future<Output = StorageResult<Option<Booking>>> + Send {
        let booking = self.working.bookings.get(&id).cloned();
        async move { Ok(booking) }
    }

    fn bookings_for_user(
        &mut self,
        username: &Username,
    ) -> impl Future<Output = StorageResult<Vec<Booking>>> + Send {
        let bookings = self.working.sorted_bookings(|b| b.username == *username);
        async move { Ok(bookings) }
    }

    fn bookings_for_flight(
        &mut self,
        flight_id: FlightId,
    ) -> impl Future<Output = StorageResult<Vec<Booking>>> + Send {
        let bookings = self.working.sorted_bookings(|b| b.flight_id == flight_id);
        async move { Ok(bookings) }
    }

    fn delete_booking(
        &mut self,
        id: BookingId,
    ) -> impl Future<Output = StorageResult<Option<Booking>>> + Send {
        let removed = self.working.bookings.remove(&id);
        if removed.is_some() {
            self.staged.push(StagedWrite::DeleteBooking(id));
        }
        async move { Ok(removed) }
    }

    fn commit(self) -> impl Future<Output = StorageResult<()>> + Send {
        async move {
            let delay = self.shared.commit_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            if self.shared.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(StorageError::Database("injected commit failure".to_string()));
            }

            let mut tables = self.shared.tables()?;
            let mut next = tables.clone();
            if let Some(write) = self.staged.iter().find(|write| !next.replay(write)) {
                self.shared.conflicts.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(?write, "In-memory commit conflict");
                return Err(StorageError::Conflict(format!(
                    "concurrent commit invalidated staged write {write:?}"
                )));
            }
            *tables = next;
            drop(tables);

            // Route/day locks are released only after the writes are visible.
            drop(self.guards);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::fixtures::{reference_flight, thy_staff};

    #[tokio::test]
    async fn uncommitted_writes_are_invisible_and_dropped() {
        let storage = InMemoryStorage::new();
        let flight = reference_flight();

        let mut tx = storage.begin().await.unwrap();
        tx.insert_flight(&flight).await.unwrap();
        assert!(tx.find_flight(flight.id).await.unwrap().is_some());
        assert!(storage.flight(flight.id).unwrap().is_none());
        drop(tx);

        assert_eq!(storage.flight_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn racing_decrements_conflict_at_commit() {
        let storage = InMemoryStorage::new();
        let flight = reference_flight();
        let key = FareClassKey::new(flight.id, FareClassTag::Economy);

        let mut setup = storage.begin().await.unwrap();
        setup.insert_flight(&flight).await.unwrap();
        setup.upsert_fare_class(key, 1, Money::from_cents(15_000)).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = storage.begin().await.unwrap();
        let mut second = storage.begin().await.unwrap();
        assert_eq!(
            first.decrement_seats(key, 1).await.unwrap(),
            SeatAdjustment::Applied { available: 0 }
        );
        assert_eq!(
            second.decrement_seats(key, 1).await.unwrap(),
            SeatAdjustment::Applied { available: 0 }
        );

        first.commit().await.unwrap();
        let error = second.commit().await.unwrap_err();

        assert!(matches!(error, StorageError::Conflict(_)));
        assert_eq!(storage.conflict_count(), 1);
        assert_eq!(storage.fare_class(key).unwrap().unwrap().available_seats, 0);
    }

    #[tokio::test]
    async fn resize_keeps_sold_seats_sold() {
        let storage = InMemoryStorage::new();
        let flight = reference_flight();
        let key = FareClassKey::new(flight.id, FareClassTag::Economy);

        let mut tx = storage.begin().await.unwrap();
        tx.insert_flight(&flight).await.unwrap();
        tx.decrement_seats(key, 5).await.unwrap();
        assert_eq!(
            tx.upsert_fare_class(key, 100, Money::from_cents(15_000)).await.unwrap(),
            SeatAdjustment::Applied { available: 95 }
        );
        assert_eq!(
            tx.upsert_fare_class(key, 4, Money::from_cents(15_000)).await.unwrap(),
            SeatAdjustment::Rejected { available: 95 }
        );
        assert_eq!(tx.remove_fare_class(key).await.unwrap(), SeatAdjustment::Rejected { available: 95 });
        tx.commit().await.unwrap();

        let class = storage.fare_class(key).unwrap().unwrap();
        assert_eq!((class.seat_count, class.available_seats), (100, 95));
    }

    #[tokio::test]
    async fn injected_commit_failure_applies_nothing() {
        let storage = InMemoryStorage::new();
        storage.upsert_user(thy_staff()).unwrap();
        storage.fail_next_commit();

        let mut tx = storage.begin().await.unwrap();
        tx.insert_flight(&reference_flight()).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StorageError::Database(_))));

        assert_eq!(storage.flight_count().unwrap(), 0);
    }
}
