//! Station-mode WiFi for the MQTT reporter.
//!
//! ```ignore
//! let wifi_cfg = WifiConfig::default().with_ssid("plugs").with_password("hunter22");
//! let mut wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &wifi_cfg)?;
//!
//! // later, from the update loop
//! wifi.ensure_connected()?;
//! ```

use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::WifiConfig;

const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Joined access point, kept alive for the lifetime of the firmware.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    timeout: Duration,
}

impl<'a> Esp32Wifi<'a> {
    /// Bring the radio up and join `config.ssid`.
    ///
    /// An empty password selects an open network. Join attempts repeat
    /// until `connect_timeout_ms` has passed.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let client = ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("SSID longer than 32 bytes"))?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("WiFi password longer than 64 bytes"))?,
            auth_method: if config.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };

        let driver = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(driver, sysloop)?;
        wifi.set_configuration(&Configuration::Client(client))?;
        wifi.start()?;

        let mut this = Self {
            wifi,
            timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
        };
        log::info!("Joining '{}'", config.ssid);
        this.join()
            .with_context(|| format!("could not join '{}'", config.ssid))?;
        Ok(this)
    }

    fn join(&mut self) -> anyhow::Result<()> {
        let started = Instant::now();
        loop {
            match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                Ok(()) => break,
                Err(e) if started.elapsed() < self.timeout => {
                    log::warn!("WiFi join failed ({:?}), retrying", e);
                    thread::sleep(RETRY_PAUSE);
                }
                Err(e) => return Err(e.into()),
            }
        }
        if let Some(ip) = self.ip_addr() {
            log::info!("WiFi up, IP {}", ip);
        }
        Ok(())
    }

    /// Station address assigned by DHCP.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        let netif = self.wifi.wifi().sta_netif();
        netif.get_ip_info().ok().map(|info| info.ip)
    }

    /// Associated with the access point.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Rejoin if the access point dropped us. No-op while connected.
    pub fn ensure_connected(&mut self) -> anyhow::Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        log::warn!("WiFi lost, rejoining");
        self.join()
    }
}
