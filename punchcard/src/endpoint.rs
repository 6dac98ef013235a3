//! Device endpoint configuration

use std::time::Duration;

use punchcard_core::{constants::DEFAULT_TIMEOUT, DeviceProfile, TransportKind, DEFAULT_PORT};

/// Address and connection parameters for one terminal
///
/// Immutable per connection attempt. The profile is optional; when not
/// set, [`DeviceProfile::for_transport`] supplies the default for the
/// chosen transport kind at connect time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use punchcard::{DeviceEndpoint, TransportKind};
///
/// let endpoint = DeviceEndpoint::new("192.168.1.201")
///     .with_password(123456)
///     .with_transport(TransportKind::Udp)
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(endpoint.port, 4370);
/// ```
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    /// Hostname or IP address
    pub host: String,

    /// Device port (default 4370)
    pub port: u16,

    /// Commkey password (default 0)
    pub password: u32,

    /// Per-read timeout; not a cumulative budget for bulk transfers
    pub timeout: Duration,

    /// Transport kind
    pub transport: TransportKind,

    /// Explicit firmware profile, when known
    pub profile: Option<DeviceProfile>,
}

impl DeviceEndpoint {
    /// Create an endpoint with defaults (TCP, port 4370, password 0,
    /// 5 second timeout)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            password: 0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            transport: TransportKind::Tcp,
            profile: None,
        }
    }

    /// Set the device port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the commkey password
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Set the per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the transport kind
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Pin the firmware profile explicitly
    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Resolve the profile for this endpoint
    pub fn profile(&self) -> DeviceProfile {
        self.profile
            .unwrap_or_else(|| DeviceProfile::for_transport(self.transport))
    }
}
