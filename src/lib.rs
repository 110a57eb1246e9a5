//! Ventilator controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod acquisition;
pub mod alarm;
pub mod api;
pub mod app;
pub mod config;
pub mod control;
pub mod datalog;
pub mod scheduler;
pub mod telemetry;

pub mod error;
pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod sensors;
