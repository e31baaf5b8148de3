//! HTTP/1.0 GET request for the forecast endpoint

use crate::{BoardError, config};
use core::fmt::Write;
use heapless::String;

/// Room for the request line, headers and a 32 character API key
pub const MAX_REQUEST_LEN: usize = 256;

/// Request buffer type
pub type Request = String<MAX_REQUEST_LEN>;

/// Request for the configured location and API key
pub fn forecast_request() -> Result<Request, BoardError> {
    build_request(
        config::OPENWEATHERMAP_LOCATION,
        config::OPENWEATHERMAP_API_KEY,
        config::FORECAST_COUNT,
    )
}

/// Build the GET for the 3-hourly forecast in metric units
///
/// A request that does not fit is a `SendError`, it is never cut short.
pub fn build_request(location: &str, api_key: &str, count: u8) -> Result<Request, BoardError> {
    let mut request = Request::new();
    write!(
        request,
        "GET /data/2.5/forecast?q={}&cnt={}&appid={}&units=metric HTTP/1.0\r\n\
         Host: {}\r\n\
         User-Agent: {}\r\n\
         \r\n",
        location,
        count,
        api_key,
        config::HOST_HEADER,
        config::USER_AGENT
    )
    .map_err(|_| BoardError::SendError)?;
    Ok(request)
}
