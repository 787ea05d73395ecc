//! External collaborator seams.
//!
//! Each trait gets an in-memory implementation suitable for tests and
//! demos; the write-path ones carry failure toggles so orchestrator
//! error handling can be exercised deterministically.

pub mod auth;
pub mod cart_store;
pub mod catalog;
pub mod order_store;
