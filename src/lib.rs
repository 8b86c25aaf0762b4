//! pi-reporter - Raspberry Pi host metrics agent library.
//!
//! Samples CPU, disk, memory, network and temperature metrics from `/proc`
//! and `/sys` on fixed intervals and hands them to a time-series sink.
//!
//! - [`collector`] - per-family collectors and the filesystem abstraction
//! - [`point`] - the publishable [`point::MetricPoint`]
//! - [`sink`] - InfluxDB, console and in-memory sinks
//! - [`reporter`] - one scheduling loop per collector
//! - [`config`] - validated runtime configuration

pub mod collector;
pub mod config;
pub mod identity;
pub mod point;
pub mod reporter;
pub mod shutdown;
pub mod sink;
