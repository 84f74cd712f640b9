//! HTTP client implementation
//!
//! One request per connection. When a TLS transport is set the connection
//! is wrapped before the request is written; the host part of the address
//! is used for SNI and certificate verification.

use super::message::Response;
use super::{FdSessionOps, HttpSession, Result, SessionOps, CRLF};
use crate::tls::forge::split_host;
use crate::tls::TlsConfig;
use std::net::TcpStream;
use std::time::Duration;

/// HTTP client
#[derive(Debug, Clone)]
pub struct HttpClient {
    transport: Option<TlsConfig>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a plain-TCP client
    pub fn new() -> Self {
        HttpClient {
            transport: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Create a client speaking TLS with `config`
    pub fn with_transport(config: TlsConfig) -> Self {
        HttpClient {
            transport: Some(config),
            ..HttpClient::new()
        }
    }

    /// TLS transport, if one is set
    pub fn transport(&self) -> Option<&TlsConfig> {
        self.transport.as_ref()
    }

    pub(crate) fn set_transport(&mut self, config: TlsConfig) {
        self.transport = Some(config);
    }

    /// Set the timeout for each read and write
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send `GET path` to `address` and read the response
    pub fn get(&self, address: &str, path: &str) -> Result<Response> {
        let stream = TcpStream::connect(address)?;

        match &self.transport {
            Some(config) => {
                let host = split_host(address)?;
                log::debug!("GET https://{}{}", address, path);
                let session = config.connect(host, stream)?;
                self.exchange(session, address, path)
            }
            None => {
                log::debug!("GET http://{}{}", address, path);
                self.exchange(FdSessionOps::new(stream), address, path)
            }
        }
    }

    fn exchange<S: SessionOps>(&self, ops: S, address: &str, path: &str) -> Result<Response> {
        let mut session = HttpSession::new(ops);
        session.set_timeout(Some(self.timeout));

        let request = format!(
            "GET {path} HTTP/1.1{CRLF}Host: {address}{CRLF}Connection: close{CRLF}{CRLF}"
        );
        session.write_all(request.as_bytes())?;

        let raw = session.read_to_end()?;
        let _ = session.close();

        Response::parse(&raw)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
