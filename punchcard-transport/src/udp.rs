//! UDP transport
//!
//! Legacy terminals speak UDP on port 4370. Each datagram carries one
//! bare inner packet; there is no stream framing.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// UDP transport for legacy terminals
pub struct UdpTransport {
    addr: String,
    port: u16,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
}

impl UdpTransport {
    /// Create new UDP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket: None,
            remote_addr: None,
        }
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.remote_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        self.remote_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let remote = self.resolve_addr().await?;

        debug!("Connecting to {} via UDP...", remote);

        // Bind to any available local port
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(Error::Io)?;

        // Connect to remote address (sets default send/recv target)
        socket.connect(remote).await.map_err(Error::Io)?;

        debug!("Connected to {} via UDP", remote);

        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(_socket) = self.socket.take() {
            debug!("Disconnecting from {}...", self.remote_addr());
        }

        self.remote_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        trace!(
            "Sending {} bytes via UDP: {:02X?}",
            data.len(),
            &data[..data.len().min(32)]
        );

        socket.send(data).await.map_err(Error::Io)?;

        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<BytesMut> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        // One datagram = one inner packet
        let mut buf = BytesMut::with_capacity(65536);
        buf.resize(65536, 0);

        let n = timeout(read_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| {
                warn!("Read timeout after {:?}", read_timeout);
                Error::ReadTimeout
            })?
            .map_err(|e| {
                warn!("Read error: {}", e);
                Error::Io(e)
            })?;

        if n == 0 {
            warn!("Received 0 bytes");
            return Err(Error::ConnectionClosed);
        }

        buf.truncate(n);

        trace!("Received {} bytes via UDP: {:02X?}", n, &buf[..n.min(32)]);

        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}
