//! Ventilator Firmware: Main Entry Point
//!
//! Two pinned execution contexts sharing one telemetry store.
//!
//! ```text
//! ┌──────────────────────────────┐            ┌──────────────────────────────────┐
//! │ core 0: acquisition worker   │            │ core 1: control loop             │
//! │                              │  publish   │                                  │
//! │  Max30100 (I2C)   ───┐       │ ─────────▶ │  SharedTelemetry::latest()       │
//! │  Ds18b20 (1-Wire) ───┴─▶ AcquisitionWorker │  VentilatorService::tick()       │
//! │                              │            │    ├─ ServoDriver  (LEDC 50 Hz)  │
//! └──────────────────────────────┘            │    └─ Buzzer       (GPIO)        │
//!                                             │  RequestBridge::serve_pending()  │
//! ┌──────────────────────────────┐  Exchange  │                                  │
//! │ httpd task (soft AP)         │ ─────────▶ │                                  │
//! └──────────────────────────────┘            └──────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution as LedcResolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use ventilator::acquisition::AcquisitionWorker;
use ventilator::adapters::hardware::HardwareAdapter;
use ventilator::adapters::http;
use ventilator::adapters::log_sink::LogEventSink;
use ventilator::adapters::nvs::NvsAdapter;
use ventilator::adapters::time::MonotonicClock;
use ventilator::adapters::wifi::{start_access_point, AccessPointCredentials};
use ventilator::api::{self, bridge::RequestBridge, bridge::DEFAULT_REPLY_TIMEOUT};
use ventilator::app::ports::{ClockPort, ConfigPort};
use ventilator::app::service::VentilatorService;
use ventilator::config::SystemConfig;
use ventilator::drivers::buzzer::Buzzer;
use ventilator::drivers::servo::ServoDriver;
use ventilator::drivers::task_pin::{spawn_on_core, Core, TaskSpec};
use ventilator::drivers::watchdog::{self, Watchdog, WATCHDOG_TIMEOUT_MS};
use ventilator::error::Error;
use ventilator::pins;
use ventilator::sensors::ds18b20::{Ds18b20, Resolution};
use ventilator::sensors::max30100::Max30100;
use ventilator::sensors::onewire::BitBangOneWire;
use ventilator::telemetry::SharedTelemetry;

const ACQUISITION_TASK: TaskSpec = TaskSpec {
    name: "acquire\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 8,
};

// The data log ring may be built on this stack before it is boxed.
const CONTROL_TASK: TaskSpec = TaskSpec {
    name: "control\0",
    core: Core::App,
    priority: 6,
    stack_kb: 32,
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Ventilator v{}                   ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new(nvs_partition.clone()) {
        Ok(mut nvs) => {
            let config = SystemConfig::load_or_default(&nvs);
            if !nvs.has_config() {
                if let Err(e) = nvs.save(&config) {
                    warn!("Could not seed NVS with defaults: {e}");
                }
            }
            config
        }
        Err(e) => {
            warn!("NVS init failed ({e}), running with defaults and no persistence");
            SystemConfig::default()
        }
    };

    // ── 3. Access point + request boundary ────────────────────
    let creds = AccessPointCredentials::new(&config.ap_ssid, &config.ap_password)?;
    let _wifi = start_access_point(peripherals.modem, sysloop, nvs_partition, &creds)?;

    let bridge = Arc::new(RequestBridge::new());
    let _server = http::start_server(Arc::clone(&bridge), DEFAULT_REPLY_TIMEOUT)?;

    // ── 4. Actuators (owned by the control loop) ──────────────
    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(Hertz(pins::SERVO_PWM_FREQ_HZ))
            .resolution(LedcResolution::Bits14),
    )?;
    let servo_pwm = LedcDriver::new(peripherals.ledc.channel0, servo_timer, peripherals.pins.gpio18)?;
    let servo = ServoDriver::new(servo_pwm, config.servo_min_pulse_us, config.servo_max_pulse_us);
    info!(
        "Servo on GPIO{} ({} Hz, {}-bit)",
        pins::SERVO_GPIO,
        pins::SERVO_PWM_FREQ_HZ,
        pins::SERVO_PWM_RESOLUTION_BITS
    );

    let buzzer = Buzzer::new(PinDriver::output(peripherals.pins.gpio25)?)
        .map_err(Error::from)
        .with_context(|| format!("buzzer on GPIO{}", pins::BUZZER_GPIO))?;
    let mut hw = HardwareAdapter::new(servo, buzzer);

    // ── 5. Sensors (owned by the acquisition worker) ──────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;
    let oximeter = Max30100::new(i2c);

    let onewire_pin = PinDriver::input_output_od(peripherals.pins.gpio4)?;
    let onewire = BitBangOneWire::new(onewire_pin, Ets)
        .map_err(Error::from)
        .with_context(|| format!("1-Wire on GPIO{}", pins::DS18B20_GPIO))?;
    let thermometer = Ds18b20::new(onewire, Resolution::Bits11);

    // ── 6. Shared state + tasks ───────────────────────────────
    watchdog::configure(WATCHDOG_TIMEOUT_MS);
    let shared = Arc::new(SharedTelemetry::new());

    let worker_shared = Arc::clone(&shared);
    let worker_config = config.clone();
    spawn_on_core(ACQUISITION_TASK, move || {
        let clock = MonotonicClock::new();
        let wdt = Watchdog::subscribe("acquire");
        let worker = AcquisitionWorker::new(oximeter, thermometer, &worker_config, clock.now_ms());
        let period = Duration::from_millis(u64::from(worker_config.worker_period_ms));
        worker.run(worker_shared, &clock, period, || wdt.feed());
    })?;

    let control = spawn_on_core(CONTROL_TASK, move || {
        let clock = MonotonicClock::new();
        let wdt = Watchdog::subscribe("control");
        let mut sink = LogEventSink::new();
        let mut service = VentilatorService::new(&config, clock.now_ms());
        let period = Duration::from_millis(u64::from(config.control_loop_period_ms));

        service.start(&mut hw, &mut sink);
        loop {
            let now = clock.now_ms();
            bridge.serve_pending(|request| api::dispatch(&mut service, request, now, &mut hw, &mut sink));
            service.tick(now, &shared, &mut hw, &mut sink);
            wdt.feed();
            std::thread::sleep(period);
        }
    })?;

    info!("Ventilator running, AP '{}'", creds.ssid());

    // The AP and HTTP server live on this stack; never return.
    if control.join().is_err() {
        error!("Control loop panicked");
    }
    Err(anyhow!("control loop exited"))
}
