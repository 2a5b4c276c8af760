//! Resting order index
//!
//! One [`RestingIndex`] per (pair, side) orders the PENDING orders by
//! price-time priority. The index is a lookup structure only: order rows in
//! the store stay the source of truth and are re-checked under their row
//! lock before a match is settled.

pub mod price_level;
pub mod index;
pub mod cursor;

pub use price_level::PriceLevel;
pub use index::{PriorityKey, RestingIndex};
pub use cursor::{Candidate, OppositeCursor};
