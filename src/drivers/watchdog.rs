//! Task Watchdog Timer (TWDT) subscription.
//!
//! Both execution contexts subscribe themselves and feed on every loop
//! iteration.  A context that stalls for longer than the timeout resets
//! the board, which parks the servo at rest and silences the buzzer.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Reset the board if a subscribed task goes this long without feeding.
pub const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

/// Configure the TWDT once at boot, before any task subscribes.
pub fn configure(timeout_ms: u32) {
    #[cfg(target_os = "espidf")]
    {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI call with a stack-allocated config.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            log::warn!("TWDT reconfigure returned {ret} (may already be configured)");
        } else {
            info!("TWDT: {timeout_ms} ms timeout, panic on trigger");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    info!("TWDT(sim): {timeout_ms} ms timeout (not enforced)");
}

/// The calling task's watchdog subscription.
pub struct Watchdog {
    task: &'static str,
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the *calling* task.  Must be called from the thread that
    /// will [`feed`](Self::feed).
    pub fn subscribe(task: &'static str) -> Self {
        #[cfg(target_os = "espidf")]
        let subscribed = {
            // SAFETY: a null handle subscribes the current FreeRTOS task.
            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            if ret != ESP_OK {
                log::warn!("Watchdog[{task}]: failed to subscribe ({ret})");
            }
            ret == ESP_OK
        };

        #[cfg(not(target_os = "espidf"))]
        let subscribed = false;

        if subscribed {
            info!("Watchdog[{task}]: subscribed");
        }
        Self { task, subscribed }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the current task's subscription only.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn task(&self) -> &'static str {
        self.task
    }
}
