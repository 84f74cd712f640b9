//! TLS contexts built from settings
//!
//! [`TlsConfig`] turns bound [`TlsSettings`] into an immutable OpenSSL
//! context for one side of a connection.

use super::error::TlsError;
use super::options::TlsSettings;
use super::session::TlsSessionOps;
use super::Result;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};
use std::net::TcpStream;

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) is_server: bool,
    pub(crate) verify_peer: bool,
}

impl TlsConfig {
    /// Build a client context
    ///
    /// Without explicit roots the library's default trust store is used. The
    /// first identity certificate, if any, is offered as client certificate.
    pub fn client(settings: &TlsSettings) -> Result<TlsConfig> {
        let mut builder = SslContextBuilder::new(SslMethod::tls_client())?;

        let verify_peer = !settings.insecure_skip_verify();
        if verify_peer {
            builder.set_verify(SslVerifyMode::PEER);
            match settings.roots() {
                Some(pool) => builder.set_cert_store(pool.to_store()?),
                None => builder.set_default_verify_paths()?,
            }
        } else {
            builder.set_verify(SslVerifyMode::NONE);
        }

        if let Some(identity) = settings.certificates().first() {
            builder.set_certificate(identity.certificate())?;
            builder.set_private_key(identity.private_key())?;
            builder.check_private_key()?;
        }

        Ok(TlsConfig {
            ctx: builder.build(),
            is_server: false,
            verify_peer,
        })
    }

    /// Build a server context presenting the first identity certificate
    pub fn server(settings: &TlsSettings) -> Result<TlsConfig> {
        let mut builder = SslContextBuilder::new(SslMethod::tls_server())?;

        let identity = settings.certificates().first().ok_or_else(|| {
            TlsError::InvalidConfig("server settings carry no certificate".to_string())
        })?;
        if settings.certificates().len() > 1 {
            log::debug!(
                "server settings carry {} certificates, presenting the first",
                settings.certificates().len()
            );
        }
        builder.set_certificate(identity.certificate())?;
        builder.set_private_key(identity.private_key())?;
        builder.check_private_key()?;

        Ok(TlsConfig {
            ctx: builder.build(),
            is_server: true,
            verify_peer: false,
        })
    }

    /// Connect to `host` over `stream` (client-side)
    pub fn connect(&self, host: &str, stream: TcpStream) -> Result<TlsSessionOps> {
        if self.is_server {
            return Err(TlsError::InvalidConfig(
                "Cannot use server config for client connection".to_string(),
            ));
        }
        TlsSessionOps::connect(stream, host, self.clone())
    }

    /// Accept a client connection (server-side)
    pub fn accept(&self, stream: TcpStream) -> Result<TlsSessionOps> {
        if !self.is_server {
            return Err(TlsError::InvalidConfig(
                "Cannot use client config for server accept".to_string(),
            ));
        }
        TlsSessionOps::accept(stream, self.clone())
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("is_server", &self.is_server)
            .field("verify_peer", &self.verify_peer)
            .finish_non_exhaustive()
    }
}
