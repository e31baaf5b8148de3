//! TCP connection on the embassy-net stack
//!
//! Resolves the server with the stack's DNS client and keeps one socket that
//! is reopened for every fetch.

use crate::fetch::ConnectionProvider;
use crate::BoardError;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, with_timeout};

/// Give up on a connect after this long
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain TCP connection to one server
pub struct TcpConnection<'a> {
    stack: Stack<'a>,
    socket: TcpSocket<'a>,
    host: &'static str,
    port: u16,
}

impl<'a> TcpConnection<'a> {
    pub fn new(
        stack: Stack<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        host: &'static str,
        port: u16,
    ) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(CONNECT_TIMEOUT));
        Self {
            stack,
            socket,
            host,
            port,
        }
    }
}

impl ConnectionProvider for TcpConnection<'_> {
    async fn connect(&mut self) -> Result<(), BoardError> {
        let addresses = self
            .stack
            .dns_query(self.host, DnsQueryType::A)
            .await
            .map_err(|e| {
                log!("[HTTP] DNS lookup failed of {}:{} err={:?}", self.host, self.port, e);
                BoardError::DnsError
            })?;
        let address = *addresses.first().ok_or(BoardError::DnsError)?;
        log!("[HTTP] DNS lookup succeeded. IP={}", address);

        self.socket
            .connect(IpEndpoint::new(address, self.port))
            .await
            .map_err(|e| {
                log!("[HTTP] ... socket connect failed: {:?}", e);
                BoardError::ConnectError
            })
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), BoardError> {
        let mut sent = 0;
        while sent < data.len() {
            match self.socket.write(&data[sent..]).await {
                Ok(0) | Err(_) => return Err(BoardError::SendError),
                Ok(written) => sent += written,
            }
        }
        self.socket.flush().await.map_err(|_| BoardError::SendError)
    }

    async fn receive_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoardError> {
        match with_timeout(timeout, self.socket.read(buf)).await {
            Ok(Ok(len)) => Ok(len),
            Ok(Err(e)) => {
                log!("[HTTP] ... socket read failed: {:?}", e);
                Err(BoardError::ReadError)
            }
            Err(_) => Err(BoardError::Timeout),
        }
    }

    async fn disconnect(&mut self) {
        self.socket.close();
        self.socket.abort();
        // Wait for the RST to go out so the socket can connect again
        let _ = self.socket.flush().await;
    }
}
