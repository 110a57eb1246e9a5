//! Soft access point.
//!
//! The ventilator hosts its own WPA2 network; the operator's phone or
//! laptop joins it and talks to the HTTP endpoints at the AP address.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi` in AP mode.
//! - **all other targets**: credential validation only.

use core::fmt;

pub const AP_CHANNEL: u8 = 1;
pub const AP_MAX_CONNECTIONS: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

impl std::error::Error for ConnectivityError {}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated SSID and passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl AccessPointCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        Ok(Self {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Bring the access point up and wait for its netif.
#[cfg(target_os = "espidf")]
pub fn start_access_point(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
    creds: &AccessPointCredentials,
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use anyhow::anyhow;
    use esp_idf_svc::wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi,
    };
    use log::info;

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

    let ap = AccessPointConfiguration {
        ssid: creds
            .ssid()
            .try_into()
            .map_err(|_| anyhow!(ConnectivityError::InvalidSsid))?,
        password: creds
            .password()
            .try_into()
            .map_err(|_| anyhow!(ConnectivityError::InvalidPassword))?,
        auth_method: if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        channel: AP_CHANNEL,
        max_connections: AP_MAX_CONNECTIONS,
        ..Default::default()
    };
    wifi.set_configuration(&Configuration::AccessPoint(ap))?;
    wifi.start()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().ap_netif().get_ip_info()?.ip;
    info!("WiFi: AP '{}' up at {ip}", creds.ssid());
    Ok(wifi)
}
