//! WiFi module for ESP32-C3 board
//!
//! Brings the station link up for a fetch and drops it afterwards, with the
//! IP configuration coming from embassy-net DHCP.

use crate::{BoardError, config};
use embassy_net::Stack;
use embassy_time::{Duration, Timer, with_timeout};
use esp_wifi::wifi::{AuthMethod, ClientConfiguration, Configuration, WifiController};

/// WiFi manager for one station interface
pub struct WiFiManager<'a> {
    controller: WifiController<'a>,
    stack: Stack<'a>,
    is_started: bool,
}

impl<'a> WiFiManager<'a> {
    /// Create a new WiFi manager instance
    pub fn new(controller: WifiController<'a>, stack: Stack<'a>) -> Self {
        Self {
            controller,
            stack,
            is_started: false,
        }
    }

    /// Connect to the access point and wait for a DHCP lease
    pub async fn connect(&mut self, ssid: &str, password: &str) -> Result<(), BoardError> {
        if !self.is_started {
            let client_config = ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| BoardError::WiFiError)?,
                password: password.try_into().map_err(|_| BoardError::WiFiError)?,
                auth_method: AuthMethod::WPA2Personal,
                ..Default::default()
            };

            self.controller
                .set_configuration(&Configuration::Client(client_config))
                .map_err(|_| BoardError::WiFiError)?;
            self.controller
                .start_async()
                .await
                .map_err(|_| BoardError::WiFiError)?;
            self.is_started = true;
        }

        log!("[WIFI] Connecting to WiFi network: {}", ssid);
        if let Err(e) = self.controller.connect_async().await {
            log!("[WIFI] Failed to connect to wifi: {:?}", e);
            return Err(BoardError::WiFiError);
        }

        if with_timeout(config::WIFI_CONNECT_TIMEOUT, self.stack.wait_config_up())
            .await
            .is_err()
        {
            log!("[WIFI] DHCP configuration not available in time");
            let _ = self.controller.disconnect_async().await;
            return Err(BoardError::WiFiError);
        }

        if let Some(config) = self.stack.config_v4() {
            log!("[WIFI] DHCP IP address: {}", config.address.address());
        }

        // Give the link a moment to settle before the first DNS query
        Timer::after(Duration::from_millis(1000)).await;
        Ok(())
    }

    /// Drop the link until the next cycle
    pub async fn disconnect(&mut self) {
        if self.is_connected() {
            match self.controller.disconnect_async().await {
                Ok(()) => log!("[WIFI] Disconnected"),
                Err(e) => log!("[WIFI] Disconnect failed: {:?}", e),
            }
        }
    }

    /// Check if WiFi is connected
    pub fn is_connected(&self) -> bool {
        self.controller.is_connected().unwrap_or(false)
    }
}
