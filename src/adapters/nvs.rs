//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] by storing [`SystemConfig`] as a single
//! `postcard` blob.
//!
//! - **`target_os = "espidf"`**: `EspNvs` on the default partition, in its
//!   own namespace.  The partition handle is shared with the Wi-Fi driver.
//! - **otherwise**: an in-memory map (dev/test only).

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

const CONFIG_NAMESPACE: &str = "ventilator";
const CONFIG_KEY: &str = "syscfg";
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
        let nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true).map_err(|e| {
            warn!("NvsAdapter: cannot open namespace: {e}");
            ConfigError::IoError
        })?;
        info!("NvsAdapter: namespace '{CONFIG_NAMESPACE}' open");
        Ok(Self { nvs })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, ConfigError> {
        info!("NvsAdapter: simulation backend");
        Ok(Self {
            store: HashMap::new(),
        })
    }

    /// Whether a config blob has been persisted.
    pub fn has_config(&self) -> bool {
        #[cfg(target_os = "espidf")]
        {
            matches!(self.nvs.blob_len(CONFIG_KEY), Ok(Some(_)))
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.contains_key(&Self::composite_key())
        }
    }

    /// Overwrite the stored blob with raw bytes.  Simulation only.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_raw(&mut self, bytes: &[u8]) {
        self.store.insert(Self::composite_key(), bytes.to_vec());
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{CONFIG_NAMESPACE}::{CONFIG_KEY}")
    }

    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            let mut buf = [0u8; MAX_BLOB_SIZE];
            match self.nvs.get_blob(CONFIG_KEY, &mut buf) {
                Ok(blob) => Ok(blob.map(<[u8]>::to_vec)),
                Err(e) => {
                    warn!("NvsAdapter: read error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            Ok(self.store.get(&Self::composite_key()).cloned())
        }
    }

    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            self.nvs.set_blob(CONFIG_KEY, bytes).map_err(|e| {
                warn!("NvsAdapter: write error {e}");
                ConfigError::IoError
            })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(Self::composite_key(), bytes.to_vec());
            Ok(())
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match self.read_blob()? {
            Some(bytes) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::IoError);
        }
        self.write_blob(&bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
