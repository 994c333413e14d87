use std::net::SocketAddr;

use serde::Deserialize;

use crate::health::HealthConfig;

/// Default listen address, loopback only
pub const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::V4(std::net::SocketAddrV4::new(
    std::net::Ipv4Addr::LOCALHOST,
    8124,
));

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Path prefix reported by the index route when running behind a proxy
    #[serde(default)]
    pub root_path: String,
    #[serde(default)]
    pub health: HealthConfig,
}

impl ServerConfig {
    /// The configured listen address, or the loopback default
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address.unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }
}
