//! TLS session operations
//!
//! This module implements the SessionOps trait for TLS connections,
//! enabling transparent switching between plain TCP and TLS I/O.

use super::cert::CertInfo;
use super::config::TlsConfig;
use super::error::TlsError;
use crate::http::session::{PollEvents, SessionOps};
use crate::http::{Error, Result as HttpResult};
use openssl::ssl::{Ssl, SslStream};
use std::io::{Read, Write};
use std::net::{IpAddr, Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;

/// TLS session operations
///
/// Wraps an OpenSSL SslStream and provides poll/read/write/close operations.
pub struct TlsSessionOps {
    stream: SslStream<TcpStream>,
    _config: TlsConfig,
    failed: bool,
}

impl TlsSessionOps {
    /// Create a client TLS connection (perform handshake)
    ///
    /// `host` is sent as SNI and, when the config verifies peers, checked
    /// against the server certificate.
    pub fn connect(
        tcp_stream: TcpStream,
        host: &str,
        config: TlsConfig,
    ) -> std::result::Result<Self, TlsError> {
        let mut ssl = Ssl::new(&config.ctx)?;

        match host.parse::<IpAddr>() {
            Ok(ip) => {
                if config.verify_peer {
                    ssl.param_mut().set_ip(ip)?;
                }
            }
            Err(_) => {
                ssl.set_hostname(host)?;
                if config.verify_peer {
                    ssl.param_mut().set_host(host)?;
                }
            }
        }

        let stream = ssl
            .connect(tcp_stream)
            .map_err(|e| TlsError::Handshake(format!("Connection failed: {}", e)))?;

        Ok(TlsSessionOps {
            stream,
            _config: config,
            failed: false,
        })
    }

    /// Accept a client connection with TLS (perform handshake)
    pub fn accept(tcp_stream: TcpStream, config: TlsConfig) -> std::result::Result<Self, TlsError> {
        let ssl = Ssl::new(&config.ctx)?;

        let stream = ssl
            .accept(tcp_stream)
            .map_err(|e| TlsError::Handshake(format!("Accept failed: {}", e)))?;

        Ok(TlsSessionOps {
            stream,
            _config: config,
            failed: false,
        })
    }

    /// Negotiated protocol version (e.g. "TLSv1.3")
    pub fn version(&self) -> &'static str {
        self.stream.ssl().version_str()
    }

    /// Certificate chain presented by the peer, leaf first
    pub fn peer_chain(&self) -> Vec<CertInfo> {
        let ssl = self.stream.ssl();
        let mut chain = Vec::new();

        if let Some(peer_cert) = ssl.peer_certificate() {
            chain.push(CertInfo::from_x509(&peer_cert));
        }
        if let Some(cert_chain) = ssl.peer_cert_chain() {
            for cert in cert_chain {
                let info = CertInfo::from_x509(cert);
                if !chain.contains(&info) {
                    chain.push(info);
                }
            }
        }

        chain
    }

    /// Check if TLS I/O failed
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl SessionOps for TlsSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> HttpResult<bool> {
        use libc::{poll, pollfd, POLLIN, POLLOUT};

        // Buffered plaintext is readable without touching the socket
        if events == PollEvents::Read && self.stream.ssl().pending() > 0 {
            return Ok(true);
        }

        let mut pfd = pollfd {
            fd: self.stream.get_ref().as_raw_fd(),
            events: match events {
                PollEvents::Read => POLLIN,
                PollEvents::Write => POLLOUT,
            },
            revents: 0,
        };

        let timeout_ms = timeout.map(|d| d.as_millis() as i32).unwrap_or(-1);

        let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

        if result < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        Ok(result > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> HttpResult<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            // A peer that closes without close_notify ends the stream
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => {
                self.failed = true;
                Err(Error::Io(e))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> HttpResult<usize> {
        self.stream.write(buf).map_err(|e| {
            self.failed = true;
            Error::Io(e)
        })
    }

    fn close(&mut self) -> HttpResult<()> {
        if !self.failed {
            let _ = self.stream.shutdown();
        }

        self.stream
            .get_mut()
            .shutdown(Shutdown::Both)
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::algorithm::KeyAlgorithm;
    use crate::tls::options::{
        apply, append_certificates_from_bytes, ignore_system_certs, use_ephemeral_certificate,
        TlsSettings,
    };
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_tls_client_server_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_settings = apply(
            TlsSettings::default(),
            vec![use_ephemeral_certificate(addr.to_string(), KeyAlgorithm::Default, Duration::from_secs(60))],
        )
        .unwrap();
        let server_config = TlsConfig::server(&server_settings).unwrap();

        let pem = server_settings.certificates()[0].certificate().to_pem().unwrap();
        let client_settings = apply(
            TlsSettings::default(),
            vec![ignore_system_certs(), append_certificates_from_bytes(pem)],
        )
        .unwrap();
        let client_config = TlsConfig::client(&client_settings).unwrap();

        let server_handle = thread::spawn(move || {
            let (tcp_stream, _) = listener.accept().unwrap();
            let mut tls_session = server_config.accept(tcp_stream).unwrap();

            let mut buf = vec![0u8; 5];
            let n = tls_session.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"Hello");

            let n = tls_session.write(b"World").unwrap();
            assert_eq!(n, 5);

            let _ = tls_session.close();
        });

        let tcp_stream = TcpStream::connect(addr).unwrap();
        let mut tls_session = client_config.connect("127.0.0.1", tcp_stream).unwrap();

        assert!(!tls_session.failed());
        assert!(tls_session.version().contains("TLS"));
        let chain = tls_session.peer_chain();
        assert_eq!(chain[0].subject, "127.0.0.1");

        tls_session.write(b"Hello").unwrap();

        let mut buf = vec![0u8; 5];
        let n = tls_session.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"World");

        let _ = tls_session.close();
        server_handle.join().unwrap();
    }

    #[test]
    fn test_untrusted_server_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_settings = apply(
            TlsSettings::default(),
            vec![use_ephemeral_certificate(addr.to_string(), KeyAlgorithm::Ed25519, Duration::from_secs(60))],
        )
        .unwrap();
        let server_config = TlsConfig::server(&server_settings).unwrap();
        let client_settings = apply(TlsSettings::default(), vec![ignore_system_certs()]).unwrap();
        let client_config = TlsConfig::client(&client_settings).unwrap();

        let server_handle = thread::spawn(move || {
            let (tcp_stream, _) = listener.accept().unwrap();
            assert!(server_config.accept(tcp_stream).is_err());
        });

        let tcp_stream = TcpStream::connect(addr).unwrap();
        let result = client_config.connect("127.0.0.1", tcp_stream);
        assert!(matches!(result, Err(TlsError::Handshake(_))));

        server_handle.join().unwrap();
    }

    #[test]
    fn test_hostname_mismatch_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_settings = apply(
            TlsSettings::default(),
            vec![use_ephemeral_certificate("other.test", KeyAlgorithm::Default, Duration::from_secs(60))],
        )
        .unwrap();
        let server_config = TlsConfig::server(&server_settings).unwrap();
        let pem = server_settings.certificates()[0].certificate().to_pem().unwrap();
        let client_settings = apply(
            TlsSettings::default(),
            vec![ignore_system_certs(), append_certificates_from_bytes(pem)],
        )
        .unwrap();
        let client_config = TlsConfig::client(&client_settings).unwrap();

        let server_handle = thread::spawn(move || {
            let (tcp_stream, _) = listener.accept().unwrap();
            let _ = server_config.accept(tcp_stream);
        });

        let tcp_stream = TcpStream::connect(addr).unwrap();
        assert!(client_config.connect("127.0.0.1", tcp_stream).is_err());

        server_handle.join().unwrap();
    }
}
