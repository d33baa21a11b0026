//! # ECU Node Library
//!
//! Battery/mains energy monitoring node: samples voltage and current at a
//! fixed rate, decimates and buffers the readings, persists them compactly
//! to an append-only log, and opportunistically uploads them over a
//! wireless link to a collector service, tolerating link outages without
//! losing staged data.
//!
//! The pipeline runs in two concurrency domains: a dedicated sampling
//! thread producing into a lock-free ring buffer, and a cooperative
//! scheduler loop draining the ring through the persistent log to the
//! collector.

pub mod codec;
pub mod config;
pub mod error;
pub mod link;
pub mod ring;
pub mod sample;
pub mod sampler;
pub mod storage;
pub mod uplink;
