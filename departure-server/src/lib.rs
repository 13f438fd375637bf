//! Next-departures server.
//!
//! Serves upcoming departures for one public-transit stop from the RMV
//! departure-board API, with a short-lived in-memory cache in front of
//! upstream and an allow-list CORS layer for browser clients.

pub mod cache;
pub mod config;
pub mod departures;
pub mod rmv;
pub mod web;

#[cfg(test)]
mod test_support;
