//! Shared types used across the checkout system.
//!
//! Identifier newtypes keep product, order, user, and movement IDs from
//! being mixed up, and [`Money`] keeps all monetary arithmetic in integer
//! cents.

mod money;
mod types;

pub use money::Money;
pub use types::{MovementId, OrderId, ProductId, UserId};
