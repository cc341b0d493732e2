// src/network.rs
// Listener address formatting for the startup banner

use local_ip_address::local_ip;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddresses {
    pub local: String,
    pub network: Option<String>,
}

pub struct NetworkUtils;

impl NetworkUtils {
    /// The address other machines on the LAN can reach us on, if any.
    pub fn get_network_address() -> Option<IpAddr> {
        local_ip().ok()
    }

    /// Display URLs for a bound listener.
    pub fn create_server_addresses(bound: SocketAddr) -> ServerAddresses {
        let local = if bound.ip().is_unspecified() {
            format!("http://localhost:{}", bound.port())
        } else {
            format!("http://{}", bound)
        };

        let network = Self::get_network_address()
            .map(|ip| format!("http://{}", SocketAddr::new(ip, bound.port())));

        ServerAddresses { local, network }
    }
}
