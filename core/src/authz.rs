//! Authorization Guard: only staff of the owning airline may mutate its flights.

use crate::error::{BookingError, Result};
use crate::storage::Transaction;
use crate::types::{AirlineCode, Principal, Role, User};

/// Checks that `user` is staff of `airline`.
///
/// # Errors
///
/// [`BookingError::Unauthorized`] for any other role or airline.
pub fn ensure_airline_staff(user: &User, airline: &AirlineCode) -> Result<()> {
    if user.role != Role::AirlineStaff {
        return Err(BookingError::unauthorized(format!(
            "User {} is not airline staff",
            user.username
        )));
    }

    match &user.airline {
        Some(assigned) if assigned == airline => Ok(()),
        Some(assigned) => Err(BookingError::unauthorized(format!(
            "User {} works for {assigned} and cannot manage flights of {airline}",
            user.username
        ))),
        None => Err(BookingError::unauthorized(format!(
            "User {} has no assigned airline",
            user.username
        ))),
    }
}

/// Loads the caller's user record and checks it is staff of `airline`.
///
/// # Errors
///
/// [`BookingError::Unauthorized`] if the principal has no user record or is
/// not staff of `airline`; [`BookingError::Storage`] on backend failure.
pub async fn validate_airline_staff_authorization<T: Transaction>(
    tx: &mut T,
    principal: &Principal,
    airline: &AirlineCode,
) -> Result<User> {
    let Some(user) = tx.find_user(&principal.username).await? else {
        tracing::warn!(username = %principal.username, "Unknown principal");
        return Err(BookingError::unauthorized(format!(
            "No user record for {}",
            principal.username
        )));
    };

    ensure_airline_staff(&user, airline).inspect_err(|error| {
        tracing::warn!(username = %principal.username, airline = %airline, %error, "Staff check failed");
    })?;

    Ok(user)
}

/// Rejects any attempt to move a flight to another airline.
///
/// # Errors
///
/// [`BookingError::Unauthorized`] if the codes differ.
pub fn ensure_same_airline(existing: &AirlineCode, requested: &AirlineCode) -> Result<()> {
    if existing == requested {
        Ok(())
    } else {
        Err(BookingError::unauthorized(format!(
            "You cannot change airline of a flight ({existing} to {requested})"
        )))
    }
}
