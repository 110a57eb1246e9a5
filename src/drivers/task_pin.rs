//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` from the calling thread, so the
//! configure → spawn pair must not be interleaved with other thread
//! creation on the same thread.  On non-ESP targets core and priority are
//! ignored.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): WiFi/lwIP and the acquisition worker.
    Pro = 0,
    /// Core 1 (APP_CPU): the control loop.
    App = 1,
}

/// Placement and sizing of a spawned task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Null-terminated for FreeRTOS, e.g. `"acquire\0"`.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn `f` as a thread placed according to `spec`.
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    #[cfg(target_os = "espidf")]
    {
        // SAFETY: the config is copied by esp_pthread_set_cfg; `name`
        // is 'static and null-terminated.
        let ret = unsafe {
            let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
            cfg.pin_to_core = spec.core as i32;
            cfg.prio = i32::from(spec.priority);
            cfg.stack_size = (spec.stack_kb * 1024) as i32;
            cfg.thread_name = spec.name.as_ptr().cast();
            esp_idf_sys::esp_pthread_set_cfg(&cfg)
        };
        if ret != esp_idf_sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
