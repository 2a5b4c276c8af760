//! Matching logic module
//!
//! Crossing rules and the pure fill computation. Nothing here touches the
//! store; the engine applies a [`Fill`] inside a transaction.

pub mod crossing;
pub mod fill;

pub use crossing::{can_match, incoming_can_match};
pub use fill::{apply_fill, Fill, SettledSide};
