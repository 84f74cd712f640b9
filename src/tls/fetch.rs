//! Peer certificate fetching
//!
//! Captures the certificate chain a TLS server presents without trusting it
//! first. The client handshake installs a verify callback that records every
//! offered certificate and then rejects, so the handshake always fails once
//! the chain has been seen. A failure carrying recorded certificates is the
//! successful outcome; a completed handshake is not.
//!
//! This is bootstrap tooling for tests and first contact. The fetched chain
//! has not been validated in any way.

use super::cert::decode_certificates;
use super::error::TlsError;
use super::forge::split_host;
use super::Result;
use openssl::ex_data::Index;
use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslRef, SslVerifyMode};
use openssl::x509::{X509Ref, X509StoreContext, X509StoreContextRef, X509};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Transport network to dial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    /// IPv4 or IPv6
    #[default]
    Tcp,
    /// IPv4 only
    Tcp4,
    /// IPv6 only
    Tcp6,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
        }
    }

    fn accepts(&self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            _ => Err(TlsError::InvalidConfig(format!("unsupported network: {}", s))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificates seen by the verify callback
#[derive(Default)]
struct Offered {
    invoked: bool,
    raw: Vec<Vec<u8>>,
}

impl Offered {
    /// Record the certificates the peer sent, in the order received
    fn record(&mut self, ctx: &X509StoreContextRef, ssl_idx: Index<X509StoreContext, SslRef>) {
        self.invoked = true;
        match ctx.ex_data(ssl_idx).and_then(|ssl| ssl.peer_cert_chain()) {
            Some(sent) => sent.iter().for_each(|cert| self.push(cert)),
            // Libraries that verify before storing the chain on the session
            None => {
                let built = ctx.chain().into_iter().flatten();
                for cert in built.chain(ctx.current_cert()) {
                    self.push(cert);
                }
            }
        }
    }

    fn push(&mut self, cert: &X509Ref) {
        if let Ok(der) = cert.to_der() {
            if !self.raw.contains(&der) {
                self.raw.push(der);
            }
        }
    }
}

/// Fetches the unverified certificate chain of a TLS peer
#[derive(Debug, Clone, Default)]
pub struct PeerFetcher {
    connect_timeout: Option<Duration>,
}

impl PeerFetcher {
    pub fn new() -> Self {
        PeerFetcher::default()
    }

    /// Bound the TCP connect phase
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Fetch the certificates presented by the peer at `address`
    ///
    /// Certificates are returned in the order the peer's chain was
    /// assembled, leaf first.
    pub fn fetch(&self, network: Network, address: &str) -> Result<Vec<X509>> {
        log::info!("fetching peer certificates from {}:{}", network, address);

        let host = split_host(address)?;
        let stream = self.dial(network, address)?;

        let offered = Arc::new(Mutex::new(Offered::default()));
        let sink = Arc::clone(&offered);

        let ssl_idx = X509StoreContext::ssl_idx()?;
        let mut builder = SslConnector::builder(SslMethod::tls_client())?;
        builder.set_verify_callback(SslVerifyMode::PEER, move |_preverified, ctx| {
            sink.lock().record(ctx, ssl_idx);
            false
        });
        let connector = builder.build();

        let outcome = connector
            .configure()?
            .verify_hostname(false)
            .connect(host, stream);

        match outcome {
            Ok(mut stream) => {
                let _ = stream.shutdown();
                Err(TlsError::UnexpectedHandshakeSuccess {
                    network: network.as_str(),
                    address: address.to_string(),
                })
            }
            Err(HandshakeError::Failure(_)) if offered.lock().invoked => {
                let offered = std::mem::take(&mut *offered.lock());
                let mut certs = Vec::with_capacity(offered.raw.len());
                for raw in &offered.raw {
                    // Undecodable entries are skipped; an empty result is reported below.
                    if let Ok(decoded) = decode_certificates(raw) {
                        certs.extend(decoded);
                    }
                }
                if certs.is_empty() {
                    return Err(TlsError::NoCertificatesReceived {
                        network: network.as_str(),
                        address: address.to_string(),
                    });
                }
                log::debug!(
                    "{} peer certificates received from {}:{}",
                    certs.len(),
                    network,
                    address
                );
                Ok(certs)
            }
            Err(e) => Err(TlsError::Handshake(format!(
                "{}:{}: {}",
                network, address, e
            ))),
        }
    }

    fn dial(&self, network: Network, address: &str) -> Result<TcpStream> {
        let connection_error = |source: io::Error| TlsError::Connection {
            network: network.as_str(),
            address: address.to_string(),
            source,
        };

        let addrs: Vec<SocketAddr> = address
            .to_socket_addrs()
            .map_err(connection_error)?
            .filter(|addr| network.accepts(addr))
            .collect();

        let mut last_error = None;
        for addr in addrs {
            let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
                .map_err(connection_error)?;
            let target = SockAddr::from(addr);
            let connected = match self.connect_timeout {
                Some(timeout) => socket.connect_timeout(&target, timeout),
                None => socket.connect(&target),
            };
            match connected {
                Ok(()) => return Ok(socket.into()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(connection_error(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no {} address found", network),
            )
        })))
    }
}

/// Fetch the certificates presented by the peer at `address`
pub fn fetch_peer_certificates(network: Network, address: &str) -> Result<Vec<X509>> {
    PeerFetcher::new().fetch(network, address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::algorithm::KeyAlgorithm;
    use crate::tls::forge::forge;
    use openssl::ssl::{SslAcceptor, SslMethod};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_network_parsing() {
        assert_eq!("tcp".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("tcp6".parse::<Network>().unwrap(), Network::Tcp6);
        assert!(matches!("udp".parse::<Network>(), Err(TlsError::InvalidConfig(_))));
        assert!(Network::Tcp4.accepts(&"127.0.0.1:1".parse().unwrap()));
        assert!(!Network::Tcp6.accepts(&"127.0.0.1:1".parse().unwrap()));
    }

    #[test]
    fn test_fetch_forged_server_certificate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let cert = forge(&addr.to_string(), KeyAlgorithm::Default, Duration::from_secs(60)).unwrap();

        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        acceptor.set_certificate(cert.certificate()).unwrap();
        acceptor.set_private_key(cert.private_key()).unwrap();
        let acceptor = acceptor.build();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            // The client aborts the handshake after recording the chain.
            assert!(acceptor.accept(stream).is_err());
        });

        let fetched = PeerFetcher::new()
            .connect_timeout(Duration::from_secs(5))
            .fetch(Network::Tcp, &addr.to_string())
            .unwrap();
        server.join().unwrap();

        assert_eq!(fetched.len(), 1);
        assert_eq!(
            fetched[0].to_der().unwrap(),
            cert.certificate().to_der().unwrap()
        );
    }

    #[test]
    fn test_fetch_returns_every_sent_certificate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let leaf = forge(&addr.to_string(), KeyAlgorithm::Default, Duration::from_secs(60)).unwrap();
        let extra = forge("unrelated.test", KeyAlgorithm::Ed25519, Duration::from_secs(60)).unwrap();

        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        acceptor.set_certificate(leaf.certificate()).unwrap();
        acceptor.set_private_key(leaf.private_key()).unwrap();
        acceptor
            .add_extra_chain_cert(extra.certificate().to_owned())
            .unwrap();
        let acceptor = acceptor.build();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            assert!(acceptor.accept(stream).is_err());
        });

        let fetched = fetch_peer_certificates(Network::Tcp4, &addr.to_string()).unwrap();
        server.join().unwrap();

        let fetched: Vec<_> = fetched.iter().map(|c| c.to_der().unwrap()).collect();
        assert_eq!(
            fetched,
            vec![
                leaf.certificate().to_der().unwrap(),
                extra.certificate().to_der().unwrap(),
            ]
        );
    }

    #[test]
    fn test_fetch_connection_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let err = fetch_peer_certificates(Network::Tcp, &addr.to_string()).unwrap_err();
        assert!(matches!(err, TlsError::Connection { .. }));
    }

    #[test]
    fn test_fetch_network_mismatch() {
        let err = fetch_peer_certificates(Network::Tcp6, "127.0.0.1:1").unwrap_err();
        assert!(matches!(
            err,
            TlsError::Connection { ref source, .. } if source.kind() == io::ErrorKind::AddrNotAvailable
        ));
    }

    #[test]
    fn test_fetch_from_plain_tcp_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let err = fetch_peer_certificates(Network::Tcp, &addr.to_string()).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, TlsError::Handshake(_)));
    }
}
