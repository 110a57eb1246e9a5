//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                   |
//! |------------|--------------|-------------------------------|
//! | `hardware` | ActuatorPort | Servo PWM, buzzer GPIO        |
//! | `log_sink` | EventSink    | Serial log output             |
//! | `nvs`      | ConfigPort   | NVS / in-memory store         |
//! | `time`     | ClockPort    | ESP32 system timer            |
//! | `wifi`     | -            | ESP-IDF soft access point     |
//! | `http`     | -            | ESP-IDF httpd → RequestBridge |

pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
