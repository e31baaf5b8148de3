//! One fetch of the forecast: connect, send the request, stream the
//! response through the extractor, disconnect.

use crate::config::RECV_CHUNK_SIZE;
use crate::extractor::{TemperatureExtractor, TemperatureSample};
use crate::BoardError;
use embassy_time::Duration;

/// Network connection used for one request
///
/// On the board this is a TCP socket on the embassy-net stack; tests use a
/// scripted connection.
#[allow(async_fn_in_trait)]
pub trait ConnectionProvider {
    /// Resolve the server and open the connection
    async fn connect(&mut self) -> Result<(), BoardError>;

    /// Send all of `data`
    async fn send(&mut self, data: &[u8]) -> Result<(), BoardError>;

    /// Read the next chunk into `buf`; `Ok(0)` is end of stream
    async fn receive_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoardError>;

    /// Close the connection
    async fn disconnect(&mut self);
}

/// How the response stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Server closed the connection
    Closed,
    /// A read failed or timed out; everything before it was used
    Failed(BoardError),
}

/// Result of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub sample: TemperatureSample,
    pub end: StreamEnd,
    /// Response bytes received
    pub received: usize,
}

/// Fetch the forecast once and extract the temperatures
///
/// Connect and send failures are returned as errors. A read failure only ends
/// the stream: the sample collected so far is still reported.
pub async fn run_fetch_cycle<C: ConnectionProvider>(
    connection: &mut C,
    request: &[u8],
    timeout: Duration,
) -> Result<FetchReport, BoardError> {
    connection.connect().await?;
    log!("[HTTP] ... connected");

    if let Err(e) = connection.send(request).await {
        log!("[HTTP] ... socket send failed");
        connection.disconnect().await;
        return Err(e);
    }
    log!("[HTTP] ... socket send success");

    let mut extractor = TemperatureExtractor::new();
    let mut buffer = [0u8; RECV_CHUNK_SIZE];
    let mut received = 0;

    let end = loop {
        match connection.receive_chunk(&mut buffer, timeout).await {
            Ok(0) => break StreamEnd::Closed,
            Ok(len) => {
                let len = len.min(buffer.len());
                received += len;
                extractor.feed(&buffer[..len]);
            }
            Err(e) => break StreamEnd::Failed(e),
        }
    };

    log!(
        "[HTTP] ... done reading from socket. {} bytes, end={:?}",
        received,
        end
    );
    connection.disconnect().await;

    Ok(FetchReport {
        sample: extractor.finalize(),
        end,
        received,
    })
}
