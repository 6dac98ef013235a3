//! High-level device interface
//!
//! `Device` owns the transport and the session and dispatches every
//! high-level operation onto codec round-trips. One outstanding request
//! per session: all operations take `&mut self`.

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, trace, warn};

use punchcard_core::{
    constants::{data_types, COMMKEY_TICKS},
    make_commkey, Command, DeviceProfile, Packet, Session, TransportKind,
};
use punchcard_transport::{TcpTransport, Transport, UdpTransport};
use punchcard_types::DeviceInfo;

use crate::cache::InfoCache;
use crate::endpoint::DeviceEndpoint;
use crate::error::{map_transport, Error, Result};
use crate::parser::{strip_size_prefix, AttendanceScan, UserScan};

/// An established session with one terminal
///
/// # Examples
///
/// ```no_run
/// use punchcard::{Device, DeviceEndpoint};
///
/// #[tokio::main]
/// async fn main() -> punchcard::Result<()> {
///     let endpoint = DeviceEndpoint::new("192.168.1.201");
///     let mut device = Device::connect(&endpoint).await?;
///
///     let info = device.get_device_info().await?;
///     println!("Device: {}", info);
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    transport: Box<dyn Transport>,
    session: Session,
    profile: DeviceProfile,
    kind: TransportKind,
    timeout: Duration,
    password: u32,
}

impl Device {
    /// Connect to the terminal described by `endpoint`
    ///
    /// Returns either a fully established session or an error; a failed
    /// handshake never leaks a half-open socket.
    pub async fn connect(endpoint: &DeviceEndpoint) -> Result<Self> {
        let transport: Box<dyn Transport> = match endpoint.transport {
            TransportKind::Tcp => Box::new(
                TcpTransport::new(endpoint.host.clone(), endpoint.port)
                    .with_connect_timeout(endpoint.timeout),
            ),
            TransportKind::Udp => Box::new(UdpTransport::new(endpoint.host.clone(), endpoint.port)),
        };

        Self::connect_with(transport, endpoint).await
    }

    /// Connect over a caller-supplied transport
    ///
    /// Used by tests to inject scripted transports; `connect` is the
    /// normal entry point.
    pub async fn connect_with(
        transport: Box<dyn Transport>,
        endpoint: &DeviceEndpoint,
    ) -> Result<Self> {
        let mut device = Self {
            transport,
            session: Session::new(),
            profile: endpoint.profile(),
            kind: endpoint.transport,
            timeout: endpoint.timeout,
            password: endpoint.password,
        };

        match device.handshake().await {
            Ok(()) => Ok(device),
            Err(e) => {
                // Guaranteed release: close whatever was opened
                let _ = device.transport.disconnect().await;
                device.session.close();
                Err(e)
            }
        }
    }

    /// Check if the session is established
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && self.transport.is_connected()
    }

    /// Terminal-assigned session ID
    pub fn session_id(&self) -> u16 {
        self.session.session_id()
    }

    /// The firmware profile this session was resolved with
    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub(crate) fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    async fn handshake(&mut self) -> Result<()> {
        self.session.begin()?;

        let after = self.timeout;
        self.transport
            .connect()
            .await
            .map_err(|e| map_transport(e, after))?;

        info!("Connecting to {}...", self.transport.remote_addr());

        let request = Packet::new(Command::Connect, 0, 0);
        let reply = self.exchange(&request).await?;

        match reply.command {
            Command::AckOk => {
                self.session.establish(reply.session_id)?;
                info!(session_id = reply.session_id, "Connected");
                Ok(())
            }
            Command::AckUnauth => self.authenticate(reply.session_id).await,
            Command::AckError => Err(Error::Connection("handshake rejected by terminal".into())),
            other => Err(Error::UnexpectedReply {
                sent: Command::Connect,
                got: other,
            }),
        }
    }

    async fn authenticate(&mut self, session_id: u16) -> Result<()> {
        info!(session_id, "Terminal requires authentication");

        let key = make_commkey(self.password, session_id, COMMKEY_TICKS);
        let request = Packet::with_payload(Command::Auth, session_id, 0, key);
        let reply = self.exchange(&request).await?;

        match reply.command {
            Command::AckOk => {
                self.session.establish(reply.session_id)?;
                info!(session_id = reply.session_id, "Authenticated");
                Ok(())
            }
            Command::AckError | Command::AckUnauth => Err(Error::Authentication),
            other => Err(Error::UnexpectedReply {
                sent: Command::Auth,
                got: other,
            }),
        }
    }

    /// Disconnect from the device
    ///
    /// Sends the exit command best-effort, then closes the socket
    /// unconditionally. Safe to call on an already-broken session.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.is_connected() {
            info!("Disconnecting from {}...", self.transport.remote_addr());

            if let Err(e) = self.try_exit().await {
                warn!("Exit command failed: {}", e);
            }
        }

        let closed = self.transport.disconnect().await;
        self.session.close();

        let after = self.timeout;
        closed.map_err(|e| map_transport(e, after))?;

        info!("Disconnected");
        Ok(())
    }

    async fn try_exit(&mut self) -> Result<()> {
        let request = Packet::new(
            Command::Exit,
            self.session.session_id(),
            self.session.next_reply_id(),
        );

        let encoded = request.encode(self.profile.checksum);
        let after = self.timeout;
        self.transport
            .send(&encoded)
            .await
            .map_err(|e| map_transport(e, after))?;

        // The ack is nice to have, nothing more
        let _ = self.receive_reply(request.reply_id).await;
        Ok(())
    }

    /// Get device information
    ///
    /// Aggregates the firmware version, the platform and serial number
    /// options, and the free-sizes counter block.
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        debug!("Reading device info");

        let firmware_version = self.read_version().await?;
        let platform = self.read_option("~Platform").await?;
        let serial_number = self.read_option("~SerialNumber").await?;

        let mut info = self.read_free_sizes().await?;
        info.firmware_version = firmware_version;
        info.platform = platform;
        info.serial_number = serial_number;

        debug!(%info, "Device info retrieved");
        Ok(info)
    }

    /// Get device information through a get-or-compute cache
    ///
    /// Device-info counters change slowly; collaborators polling for
    /// health checks memoize them under the endpoint address.
    pub async fn get_device_info_cached(
        &mut self,
        cache: &dyn InfoCache,
        ttl: Duration,
    ) -> Result<DeviceInfo> {
        let key = self.transport.remote_addr();

        if let Some(info) = cache.get(&key) {
            debug!(key, "Device info served from cache");
            return Ok(info);
        }

        let info = self.get_device_info().await?;
        cache.put(&key, info.clone(), ttl);
        Ok(info)
    }

    /// Read the enrolled user table
    ///
    /// Returns a lazy scan; records decode as the caller iterates.
    pub async fn get_users(&mut self) -> Result<UserScan> {
        debug!("Reading user table");

        let buf = self.read_bulk(Command::UserTempRrq, data_types::FCT_USER).await?;
        let buf = strip_size_prefix(buf);

        debug!(bytes = buf.len(), "User table read");
        Ok(UserScan::new(buf, self.profile))
    }

    /// Read the attendance log
    ///
    /// Returns a lazy scan; records decode as the caller iterates.
    pub async fn get_attendance(&mut self) -> Result<AttendanceScan> {
        debug!("Reading attendance log");

        let buf = self.read_bulk(Command::AttLogRrq, 0).await?;
        let buf = strip_size_prefix(buf);

        debug!(bytes = buf.len(), "Attendance log read");
        Ok(AttendanceScan::new(buf, self.profile))
    }

    async fn read_version(&mut self) -> Result<String> {
        let reply = self.send_command(Command::GetVersion, Bytes::new()).await?;

        if !reply.is_success() {
            return Err(Error::UnexpectedReply {
                sent: Command::GetVersion,
                got: reply.command,
            });
        }

        Ok(trim_nul(&reply.payload))
    }

    /// Query one key from the device option table; replies are
    /// `key=value` with a trailing NUL
    async fn read_option(&mut self, key: &str) -> Result<String> {
        let mut payload = BytesMut::with_capacity(key.len() + 1);
        payload.put_slice(key.as_bytes());
        payload.put_u8(0);

        let reply = self.send_command(Command::OptionsRrq, payload.freeze()).await?;

        if !reply.is_success() {
            return Err(Error::UnexpectedReply {
                sent: Command::OptionsRrq,
                got: reply.command,
            });
        }

        let text = trim_nul(&reply.payload);
        match text.split_once('=') {
            Some((_, value)) => Ok(value.to_string()),
            None => Err(Error::InvalidResponse(format!(
                "option reply without '=' for key {key}: {text:?}"
            ))),
        }
    }

    /// Read the 20-slot free-sizes counter block
    async fn read_free_sizes(&mut self) -> Result<DeviceInfo> {
        let reply = self.send_command(Command::GetFreeSizes, Bytes::new()).await?;

        if !reply.is_success() {
            return Err(Error::UnexpectedReply {
                sent: Command::GetFreeSizes,
                got: reply.command,
            });
        }

        let payload = &reply.payload;
        if payload.len() < 80 {
            return Err(Error::InvalidResponse(format!(
                "free-sizes block too short: {} bytes",
                payload.len()
            )));
        }

        let slot = |i: usize| LittleEndian::read_i32(&payload[i * 4..]).max(0) as u32;

        Ok(DeviceInfo {
            user_count: slot(4),
            finger_count: slot(6),
            record_count: slot(8),
            card_count: slot(12),
            finger_capacity: slot(14),
            user_capacity: slot(15),
            record_capacity: slot(16),
            fingers_available: slot(17),
            users_available: slot(18),
            records_available: slot(19),
            ..DeviceInfo::default()
        })
    }

    // Request/reply plumbing

    /// Issue one command within the established session
    pub(crate) async fn send_command(&mut self, command: Command, payload: Bytes) -> Result<Packet> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }

        let request = Packet::with_payload(
            command,
            self.session.session_id(),
            self.session.next_reply_id(),
            payload,
        );

        self.exchange(&request).await
    }

    /// One request, one matched reply, with a single checksum retry
    async fn exchange(&mut self, request: &Packet) -> Result<Packet> {
        let encoded = request.encode(self.profile.checksum);
        let after = self.timeout;

        trace!("-> {}", request);
        if let Err(e) = self.transport.send(&encoded).await {
            return Err(self.fatal(map_transport(e, after)));
        }

        let mut retried = false;
        loop {
            match self.receive_reply(request.reply_id).await {
                Ok(reply) => return Ok(reply),
                Err(Error::Protocol(punchcard_core::Error::ChecksumMismatch { .. }))
                    if !retried =>
                {
                    // Re-request the same reply_id exactly once
                    retried = true;
                    warn!(command = %request.command, "Checksum mismatch, re-requesting reply");
                    if let Err(e) = self.transport.send(&encoded).await {
                        return Err(self.fatal(map_transport(e, after)));
                    }
                }
                Err(e) => return Err(self.fatal(e)),
            }
        }
    }

    /// Connection-level failures and an exhausted checksum retry leave
    /// the session unusable; drop it so later calls fail fast
    fn fatal(&mut self, e: Error) -> Error {
        if matches!(
            e,
            Error::Connection(_)
                | Error::Protocol(punchcard_core::Error::ChecksumMismatch { .. })
        ) {
            self.session.close();
        }
        e
    }

    /// Receive the reply matching `expected_reply_id`
    ///
    /// Packets with a different reply_id are stale duplicates; they are
    /// discarded, not surfaced. Each read is bounded by the timeout.
    pub(crate) async fn receive_reply(&mut self, expected_reply_id: u16) -> Result<Packet> {
        let after = self.timeout;

        loop {
            let buf = self
                .transport
                .receive(after)
                .await
                .map_err(|e| map_transport(e, after))?;

            let reply = Packet::decode(buf, self.profile.checksum)?;

            if reply.reply_id != expected_reply_id {
                trace!(
                    got = reply.reply_id,
                    expected = expected_reply_id,
                    "Discarding stale reply"
                );
                continue;
            }

            trace!("<- {}", reply);
            return Ok(reply);
        }
    }
}

/// Take the bytes up to the first NUL as a trimmed string
fn trim_nul(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).trim().to_string()
}
