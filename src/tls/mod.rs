//! TLS trust material
//!
//! This module forges ephemeral certificates and assembles trust pools for
//! TLS clients and servers.
//!
//! # Architecture
//!
//! 1. `KeyAlgorithm` resolves to one key-generation strategy per algorithm
//! 2. `forge` builds a self-signed certificate with a unique serial number
//! 3. `assemble` merges certificate sources into a `TrustPool`
//! 4. `TlsOption`s are applied in order to a `TlsSettings` working copy
//! 5. `ConfigRegistry` publishes the result per role; `TlsConfig` turns it
//!    into an OpenSSL context for `connect`/`accept`
//!
//! # Examples
//!
//! ## Server with an ephemeral certificate
//!
//! ```no_run
//! use tlsconf::tls::{ConfigRegistry, KeyAlgorithm, Role, TlsConfig};
//! use tlsconf::tls::options::use_ephemeral_certificate;
//! use std::net::TcpListener;
//! use std::time::Duration;
//!
//! let registry = ConfigRegistry::new();
//! let listener = TcpListener::bind("localhost:0").unwrap();
//! let address = listener.local_addr().unwrap().to_string();
//!
//! registry
//!     .set_options(Role::Server, vec![
//!         use_ephemeral_certificate(address, KeyAlgorithm::Default, Duration::from_secs(3600)),
//!     ])
//!     .unwrap();
//!
//! let config = TlsConfig::server(&registry.lookup(Role::Server)).unwrap();
//! let (tcp_stream, _) = listener.accept().unwrap();
//! let tls_session = config.accept(tcp_stream).unwrap();
//! ```
//!
//! ## Client trusting a server's live certificate
//!
//! ```no_run
//! use tlsconf::tls::{ConfigRegistry, Network, Role, TlsConfig};
//! use tlsconf::tls::options::{append_server_certificates, ignore_system_certs};
//! use std::net::TcpStream;
//!
//! let registry = ConfigRegistry::new();
//! registry
//!     .set_options(Role::Client, vec![
//!         ignore_system_certs(),
//!         append_server_certificates(Network::Tcp, "localhost:8443"),
//!     ])
//!     .unwrap();
//!
//! let config = TlsConfig::client(&registry.lookup(Role::Client)).unwrap();
//! let tcp_stream = TcpStream::connect("localhost:8443").unwrap();
//! let tls_session = config.connect("localhost", tcp_stream).unwrap();
//! ```

pub mod algorithm;
pub mod cert;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forge;
pub mod options;
pub mod persist;
pub mod pool;
pub mod registry;
pub mod serial;
pub mod session;

pub use algorithm::{KeyAlgorithm, KeyPair};
pub use cert::{decode_certificates, CertInfo};
pub use config::TlsConfig;
pub use error::TlsError;
pub use fetch::{fetch_peer_certificates, Network, PeerFetcher};
pub use forge::{forge, forge_with, CertifiedKey};
pub use options::{apply, TlsOption, TlsSettings};
pub use persist::{load_certificate, write_certificate};
pub use pool::{assemble, CertSource, TrustPool};
pub use registry::{ConfigRegistry, Role};
pub use serial::SerialNumberSource;
pub use session::TlsSessionOps;

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
