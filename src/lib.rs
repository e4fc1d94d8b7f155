//! Aggregation and publish debouncing for broadcast BLE thermometer readings.
//!
//! Readings may arrive several times for one broadcast (directly and through
//! relays) and in bursts; the [`engine::Engine`] merges them per device under a
//! keep-last-known-good policy and hands at most one status update per
//! configured period to a [`publish::StatusSink`].

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod publish;
pub mod runtime;
pub mod utils;
