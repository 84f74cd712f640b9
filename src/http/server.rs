//! HTTP server implementation
//!
//! Answers every request with the same configured response and closes the
//! connection.

use super::message::{reason_phrase, RequestHead};
use super::{FdSessionOps, HttpSession, Result, SessionOps, CRLF};
use crate::tls::TlsConfig;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// HTTP server
#[derive(Debug, Clone)]
pub struct HttpServer {
    transport: Option<TlsConfig>,
    status: u16,
    body: Vec<u8>,
    timeout: Duration,
}

impl HttpServer {
    /// Create a plain-TCP server answering with `status` and `body`
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        HttpServer {
            transport: None,
            status,
            body: body.into(),
            timeout: Duration::from_secs(10),
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

    /// Accept one connection, answer its request and close it
    pub fn serve_once(&self, listener: &TcpListener) -> Result<RequestHead> {
        let (stream, peer) = listener.accept()?;
        log::debug!("accepted connection from {}", peer);

        match &self.transport {
            Some(config) => self.respond(config.accept(stream)?),
            None => self.respond(FdSessionOps::new(stream)),
        }
    }

    /// Serve `connections` connections on a background thread
    pub fn spawn(self, listener: TcpListener, connections: usize) -> JoinHandle<Result<Vec<RequestHead>>> {
        thread::spawn(move || {
            (0..connections)
                .map(|_| self.serve_once(&listener))
                .collect()
        })
    }

    fn respond<S: SessionOps>(&self, ops: S) -> Result<RequestHead> {
        let mut session = HttpSession::new(ops);
        session.set_timeout(Some(self.timeout));

        let request = RequestHead::parse(&session.read_head()?)?;
        log::debug!("{} {} -> {}", request.method, request.path, self.status);

        let mut response = format!(
            "HTTP/1.1 {} {}{CRLF}Content-Length: {}{CRLF}Connection: close{CRLF}{CRLF}",
            self.status,
            reason_phrase(self.status),
            self.body.len(),
        )
        .into_bytes();
        response.extend_from_slice(&self.body);
        session.write_all(&response)?;
        let _ = session.close();

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClient;

    #[test]
    fn test_serve_plain() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = HttpServer::new(404, "nothing here");
        assert!(server.transport().is_none());
        let handle = server.spawn(listener, 2);

        let client = HttpClient::new();
        let first = client.get(&addr, "/a").unwrap();
        assert_eq!(first.status, 404);
        assert_eq!(first.reason, "Not Found");
        assert_eq!(first.body, b"nothing here");
        client.get(&addr, "/b").unwrap();

        let requests = handle.join().unwrap().unwrap();
        assert_eq!(requests[0].path, "/a");
        assert_eq!(requests[1].path, "/b");
        assert_eq!(requests[1].method, "GET");
    }
}
