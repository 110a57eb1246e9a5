//! GPIO / peripheral pin assignments for the ventilator board (ESP32 DevKit).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  The ESP-IDF binary takes the matching typed
//! pins from `Peripherals`; keep both in sync.

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Servo signal (LEDC PWM, 50 Hz).
pub const SERVO_GPIO: i32 = 18;
/// LEDC frame rate for a hobby servo.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC resolution for the servo channel.  14 bits gives ~1.2 µs steps.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// One PWM frame at 50 Hz.
pub const SERVO_FRAME_US: u16 = 20_000;

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// Piezo buzzer, active HIGH.
pub const BUZZER_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// I²C bus shared by the MAX30100 pulse oximeter.
pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard-mode I²C; the MAX30100 breakout is unreliable at 400 kHz.
pub const I2C_BAUD_HZ: u32 = 100_000;

/// DS18B20 1-Wire data line (open-drain, external 4.7 kΩ pull-up).
pub const DS18B20_GPIO: i32 = 4;
