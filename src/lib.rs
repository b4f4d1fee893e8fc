#![forbid(unsafe_code)]

//! Apollo telemetry simulator (aplsim) — simulates a fleet of space-mission
//! telemetry devices.
//!
//! The repeating cycle:
//! 1. **Generate** — synthetic device-status records for a random mission
//! 2. **Aggregate** — four analyses over the full active record set
//! 3. **Persist** — a JSON snapshot per cycle plus a cumulative dashboard
//! 4. **Archive** — consumed records move to backup storage
//!
//! A background scheduler keeps the cycle running until cooperatively
//! stopped.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use apolo_telemetry::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use apolo_telemetry::core::config::Config;
//! use apolo_telemetry::sim::scheduler::SimulationScheduler;
//! ```

pub mod prelude;

pub mod analysis;
pub mod archive;
pub mod core;
pub mod logger;
pub mod report;
pub mod sim;
pub mod telemetry;
