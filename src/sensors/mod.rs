//! Sensor drivers.
//!
//! Each driver implements its acquisition port directly and is owned by
//! the [`AcquisitionWorker`](crate::acquisition::AcquisitionWorker); no
//! sensor is ever touched from the control loop.

pub mod ds18b20;
pub mod max30100;
pub mod onewire;
pub mod pulse;
