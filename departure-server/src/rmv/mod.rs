//! RMV (Rhein-Main-Verkehrsverbund) HAFAS departure-board client.
//!
//! The board is fetched as JSON and passed through untouched; the server
//! never interprets its shape.

mod client;
mod error;

pub use client::{DEFAULT_BASE_URL, RmvClient, RmvConfig};
pub use error::RmvError;
