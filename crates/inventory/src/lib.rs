//! Inventory data model: dealers, the cars they own, and car change events.
//!
//! This crate contains the business rules (required fields, rating range) as pure,
//! deterministic logic (no IO, no HTTP, no storage).

pub mod car;
pub mod dealer;
pub mod event;
pub mod text;

pub use car::{Car, CarInput};
pub use dealer::{Dealer, DealerInput, MAX_RATING, MIN_RATING, round_rating};
pub use event::{CarEvent, CarEventKind};
pub use text::MAX_TEXT_LEN;
