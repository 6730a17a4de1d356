//! The reference scenario, runnable on any storage backend.
//!
//! THY staff schedule IST→CDG with 80 economy seats at 150.00, a customer
//! books two passengers, an over-request and a fourth same-day flight are
//! refused, and deleting the flight removes its bookings.

use airline_booking_core::schedule::FixedOffsetTimezones;
use airline_booking_core::storage::Storage;
use airline_booking_core::types::{
    AirlineCode, AirportCode, FareClassRequest, FareClassTag, Flight, FlightRequest, Money,
    PassengerRequest, Principal, User,
};
use airline_booking_runtime::{BookingEngine, FlightFilter};
use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::{Value, json};

const STAFF: &str = "thy-staff";
const CUSTOMER: &str = "john";

/// Accounts the scenario acts as.
///
/// # Errors
///
/// Returns error if a built-in airline code is malformed.
pub fn users() -> anyhow::Result<Vec<User>> {
    Ok(vec![
        User::airline_staff(STAFF, AirlineCode::new("THY")?),
        User::customer(CUSTOMER),
    ])
}

/// Offsets for the airports the demo knows.
pub fn timezones() -> FixedOffsetTimezones {
    [("IST", 3), ("SAW", 3), ("CDG", 1), ("FRA", 1), ("LHR", 0), ("JFK", -5)]
        .into_iter()
        .filter_map(|(code, hours)| {
            let airport = AirportCode::new(code).ok()?;
            let offset = FixedOffset::east_opt(hours * 3600)?;
            Some((airport, offset))
        })
        .fold(FixedOffsetTimezones::utc(), |table, (airport, offset)| {
            table.with_airport(airport, offset)
        })
}

fn request(departure: DateTime<Utc>) -> anyhow::Result<FlightRequest> {
    Ok(FlightRequest {
        airline: AirlineCode::new("THY")?,
        origin: AirportCode::new("IST")?,
        destination: AirportCode::new("CDG")?,
        departure_time: departure,
        duration_minutes: 210,
        fare_classes: vec![FareClassRequest {
            tag: FareClassTag::Economy,
            seat_count: 80,
            price: Money::from_cents(15_000),
        }],
    })
}

fn passengers(count: usize) -> Vec<PassengerRequest> {
    (1..=count)
        .map(|n| {
            PassengerRequest::new(
                format!("Passenger{n}"),
                "Doe",
                format!("passenger{n}@example.com"),
                FareClassTag::Economy,
            )
        })
        .collect()
}

/// Run the scenario on `engine`, departing on `day` at 10:00 UTC.
///
/// Every flight the scenario schedules is deleted again, so repeated runs
/// against a persistent database do not trip the daily cap.
///
/// # Errors
///
/// Returns error if a step that should succeed fails, or a step that should
/// be refused is accepted.
pub async fn run<S: Storage>(engine: &BookingEngine<S>, day: DateTime<Utc>) -> anyhow::Result<Value> {
    let staff = Principal::new(STAFF);
    let customer = Principal::new(CUSTOMER);
    let departure = day
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .context("invalid departure time")?
        .and_utc();

    let flight = engine.flights.create_flight(&staff, &request(departure)?).await?;
    let mut scheduled: Vec<Flight> = vec![flight.clone()];

    let booking = engine
        .bookings
        .book_flight(&customer, flight.id, &passengers(2))
        .await?;
    let after_booking = engine.flights.get_flight(flight.id).await?;

    let over_request = match engine
        .bookings
        .book_flight(&customer, flight.id, &passengers(100))
        .await
    {
        Ok(_) => anyhow::bail!("a 100 passenger booking on 78 seats was accepted"),
        Err(error) => error.to_string(),
    };

    for hours in [3, 6] {
        let later = request(departure + Duration::hours(hours))?;
        scheduled.push(engine.flights.create_flight(&staff, &later).await?);
    }
    let fourth_flight = match engine
        .flights
        .create_flight(&staff, &request(departure + Duration::hours(9))?)
        .await
    {
        Ok(_) => anyhow::bail!("a fourth flight on the same day was accepted"),
        Err(error) => error.to_string(),
    };

    let catalog = engine
        .flights
        .list_flights(&FlightFilter {
            airline: Some(flight.airline.clone()),
            origin: Some(flight.origin.clone()),
            ..FlightFilter::default()
        })
        .await?;

    let statistics = engine
        .flights
        .flight_statistics(&staff, &flight.airline, None, None)
        .await?;

    for flight in &scheduled {
        engine.flights.delete_flight(&staff, flight.id).await?;
    }
    let booking_after_delete = engine
        .bookings
        .get_booking(booking.booking.id)
        .await
        .err()
        .map(|error| error.to_string());

    tracing::info!(flights = scheduled.len(), "Scenario completed");

    Ok(json!({
        "flight": flight,
        "booking": booking,
        "economy_available_after_booking": after_booking
            .fare_class(FareClassTag::Economy)
            .map(|class| class.available_seats),
        "over_request_rejected": over_request,
        "fourth_flight_rejected": fourth_flight,
        "catalog": catalog,
        "statistics": statistics,
        "booking_after_flight_delete": booking_after_delete,
    }))
}
