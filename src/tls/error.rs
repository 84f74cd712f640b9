//! TLS errors

use std::path::PathBuf;

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Unsupported certificate algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Failed to decode address {address:?}: {reason}")]
    AddressParse { address: String, reason: String },

    #[error("Failed to generate {algorithm} key: {source}")]
    KeyGeneration {
        algorithm: &'static str,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("Failed to encode certificate for {host:?}: {source}")]
    CertificateEncoding {
        host: String,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("Failed to connect to {network}:{address}: {source}")]
    Connection {
        network: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No peer certificates received from {network}:{address}")]
    NoCertificatesReceived {
        network: &'static str,
        address: String,
    },

    #[error("Failed to fetch peer certificates from {network}:{address}: handshake unexpectedly succeeded")]
    UnexpectedHandshakeSuccess {
        network: &'static str,
        address: String,
    },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Failed to decode certificates: {0}")]
    Decode(String),

    #[error("Failed to read {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load system certificates: {0}")]
    SystemTrustUnavailable(#[source] openssl::error::ErrorStack),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
