#![cfg_attr(not(test), no_std)]

//! ESP32-C3 Weather Strip Library
//!
//! Fetches the OpenWeatherMap forecast over plain HTTP, pulls the current,
//! minimum and maximum temperature out of the streamed response and shows
//! them as lit positions on a WS2812 strip.
//!
//! Everything except the Wi-Fi and TCP glue is hardware independent and runs
//! on the host.

/// Tagged console output, `[TAG] message`
#[cfg(feature = "firmware")]
macro_rules! log {
    ($($arg:tt)*) => {
        esp_println::println!($($arg)*)
    };
}

#[cfg(not(feature = "firmware"))]
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(feature = "firmware")]
extern crate alloc;

pub mod extractor;
pub mod fetch;
pub mod led_control;
pub mod renderer;
pub mod request;
pub mod state_machine;
#[cfg(feature = "firmware")]
pub mod tcp;
#[cfg(feature = "firmware")]
pub mod wifi;
#[cfg(feature = "firmware")]
pub mod ws2812;

pub use extractor::{TemperatureExtractor, TemperatureSample};
pub use fetch::{ConnectionProvider, FetchReport, StreamEnd, run_fetch_cycle};
pub use led_control::{PixelSink, SmartLedStrip};
pub use request::forecast_request;
pub use renderer::{Positions, RangePolicy, RenderConfig, RenderTimings, StripLayout, TemperatureRenderer};
pub use state_machine::{Action, CycleConfig, CycleEvent, CycleState, CycleStateMachine, NoDataPolicy};

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    use embassy_time::Duration;

    /// Weather API server the forecast is fetched from
    pub const WEB_SERVER: &str = "eu-api.openweathermap.org";

    /// Plain HTTP port
    pub const WEB_PORT: u16 = 80;

    /// `Host:` header sent with the request
    pub const HOST_HEADER: &str = "api.openweathermap.org";

    /// `User-Agent:` header sent with the request
    pub const USER_AGENT: &str = "esp-idf/1.0 esp32";

    /// Number of 3-hour forecast slots requested (4 = the next 12 hours)
    pub const FORECAST_COUNT: u8 = 4;

    /// OpenWeatherMap settings
    /// Read from environment variables at compile time
    pub const OPENWEATHERMAP_API_KEY: &str = env!("OPENWEATHERMAP_API_KEY");
    pub const OPENWEATHERMAP_LOCATION: &str = env!("OPENWEATHERMAP_LOCATION");

    /// Bytes read from the socket per chunk
    pub const RECV_CHUNK_SIZE: usize = 63;

    /// Socket receive timeout
    pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Seconds to wait between two fetch cycles
    pub const REFRESH_COUNTDOWN_SECS: u32 = 60;

    /// Default LED data GPIO pin
    pub const LED_DATA_PIN: u8 = 10;

    /// Lowest temperature on the strip is -NEGATIVE_RANGE °C
    pub const NEGATIVE_RANGE: usize = 15;

    /// Highest temperature on the strip is POSITIVE_RANGE - 1 °C
    pub const POSITIVE_RANGE: usize = 35;

    /// Number of LEDs on the strip
    pub const STRIP_LEN: usize = NEGATIVE_RANGE + POSITIVE_RANGE;

    /// Strip index of 0 °C
    pub const ZERO_CELSIUS_POSITION: usize = NEGATIVE_RANGE;

    /// WiFi configuration
    /// Read from environment variables at compile time
    pub const WIFI_SSID: &str = env!("WIFI_SSID");
    pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

    /// Time allowed for association plus DHCP
    pub const WIFI_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Error types for the weather strip board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// WiFi connection error
    WiFiError,
    /// Host name lookup failed
    DnsError,
    /// TCP connect failed
    ConnectError,
    /// Request could not be sent (or built)
    SendError,
    /// No data within the receive timeout
    Timeout,
    /// Socket read failed
    ReadError,
    /// LED strip error
    DeviceError,
    /// Temperature does not fit on the strip
    OutOfRange,
}

impl BoardError {
    /// Network errors that a later cycle may not hit again
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            BoardError::WiFiError
                | BoardError::DnsError
                | BoardError::ConnectError
                | BoardError::SendError
                | BoardError::Timeout
                | BoardError::ReadError
        )
    }

    /// Delay before the whole cycle is retried
    pub fn backoff(self) -> embassy_time::Duration {
        match self {
            BoardError::WiFiError | BoardError::DnsError => embassy_time::Duration::from_secs(1),
            _ => embassy_time::Duration::from_secs(4),
        }
    }
}
