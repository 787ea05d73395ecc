//! Reservation coordinator: makes "check stock, then decrement stock"
//! atomic per product.
//!
//! The [`ReservationCoordinator`] serializes reserve and release calls
//! for the same product behind a keyed async mutex, so two concurrent
//! checkouts can never jointly oversell the last units. Reservations for
//! different products are independent and proceed fully in parallel.

mod coordinator;
mod error;

pub use coordinator::{Reservation, ReservationCoordinator};
pub use error::{ReservationError, Result};
