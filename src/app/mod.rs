//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the control-loop rules for the ventilator:
//! rate resolution, breathing-cycle orchestration, alarm handling, the
//! data log and operator commands.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod auth;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
