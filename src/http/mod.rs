//! Minimal HTTP/1.1 over plain TCP or TLS
//!
//! Just enough HTTP to exercise bound TLS settings end to end: a client
//! issuing GET requests and a server answering every request with a fixed
//! response.
//!
//! # Architecture
//!
//! The HTTP layer uses a session operations abstraction pattern that allows
//! seamless switching between plain TCP and TLS connections:
//!
//! - `SessionOps` trait defines operations (poll, read, write, close)
//! - `FdSessionOps` implements it for plain TCP, `TlsSessionOps` for TLS
//! - `HttpClient` and `HttpServer` hold an optional TLS transport that the
//!   binders in `transport` fill from a `ConfigRegistry`
//!
//! # Examples
//!
//! ```no_run
//! use tlsconf::http::{bind_client_transport, HttpClient};
//! use tlsconf::tls::ConfigRegistry;
//!
//! let mut client = HttpClient::new();
//! bind_client_transport(&mut client, ConfigRegistry::global()).unwrap();
//!
//! let response = client.get("localhost:8443", "/").unwrap();
//! assert_eq!(response.status, 200);
//! ```

pub mod client;
pub mod message;
pub mod server;
pub mod session;
pub mod transport;

pub use client::HttpClient;
pub use message::{RequestHead, Response};
pub use server::HttpServer;
pub use session::{FdSessionOps, HttpSession, PollEvents, SessionOps};
pub use transport::{bind_client_transport, bind_server_transport};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] crate::tls::TlsError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maximum size of a request or response head
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
