//! Ventilation control laws.
//!
//! [`rate`] maps oxygen saturation to a target breathing rate, [`breath`]
//! turns that rate into a smooth bellows trajectory.  Both are pure and
//! driven by caller-supplied timestamps.

pub mod breath;
pub mod rate;
