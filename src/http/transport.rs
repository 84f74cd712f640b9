//! Binding registry settings to HTTP transports
//!
//! A client or server that already has a TLS transport keeps it; the
//! binder logs a warning and leaves it unmodified.

use super::{HttpClient, HttpServer};
use crate::tls::{ConfigRegistry, Result, Role, TlsConfig};

/// Give `client` a TLS transport built from the registry's client settings
///
/// Returns false when the client already had a transport.
pub fn bind_client_transport(client: &mut HttpClient, registry: &ConfigRegistry) -> Result<bool> {
    if client.transport().is_some() {
        log::warn!("HTTP client already has a TLS transport, leaving it unmodified");
        return Ok(false);
    }

    let config = TlsConfig::client(&registry.lookup(Role::Client))?;
    client.set_transport(config);
    Ok(true)
}

/// Give `server` a TLS transport built from the registry's server settings
///
/// Returns false when the server already had a transport.
pub fn bind_server_transport(server: &mut HttpServer, registry: &ConfigRegistry) -> Result<bool> {
    if server.transport().is_some() {
        log::warn!("HTTP server already has a TLS transport, leaving it unmodified");
        return Ok(false);
    }

    let config = TlsConfig::server(&registry.lookup(Role::Server))?;
    server.set_transport(config);
    Ok(true)
}
