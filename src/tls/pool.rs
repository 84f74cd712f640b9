//! Trust pool assembly
//!
//! A [`TrustPool`] is the set of certificates a verifier accepts as roots.
//! It is a plain value that can be cloned into pipeline working copies and
//! is only turned into an OpenSSL [`X509Store`] when a context is built.

use super::cert::decode_certificates;
use super::error::TlsError;
use super::fetch::{Network, PeerFetcher};
use super::options::TlsSettings;
use super::persist::read_file;
use super::Result;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509Ref, X509StoreContext, X509};
use std::path::PathBuf;
use std::sync::Arc;

/// A set of trusted root certificates
#[derive(Clone, Default)]
pub struct TrustPool {
    system: bool,
    certificates: Vec<X509>,
}

impl TrustPool {
    /// An empty pool that trusts nothing
    pub fn empty() -> Self {
        TrustPool::default()
    }

    /// A pool seeded with the system trust store
    pub fn system() -> Result<Self> {
        // Load once to surface an unreadable store now rather than at connect time.
        let mut builder = X509StoreBuilder::new().map_err(TlsError::SystemTrustUnavailable)?;
        builder
            .set_default_paths()
            .map_err(TlsError::SystemTrustUnavailable)?;
        Ok(TrustPool {
            system: true,
            certificates: Vec::new(),
        })
    }

    /// Whether the system trust store is part of this pool
    pub fn includes_system(&self) -> bool {
        self.system
    }

    /// Certificates added explicitly
    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    pub fn is_empty(&self) -> bool {
        !self.system && self.certificates.is_empty()
    }

    /// Add a certificate; adding the same certificate twice has no effect
    pub fn add(&mut self, cert: &X509Ref) -> Result<()> {
        let der = cert.to_der()?;
        for existing in &self.certificates {
            if existing.to_der()? == der {
                return Ok(());
            }
        }
        self.certificates.push(cert.to_owned());
        Ok(())
    }

    /// Build an OpenSSL certificate store from this pool
    pub fn to_store(&self) -> Result<X509Store> {
        let mut builder = X509StoreBuilder::new()?;
        if self.system {
            builder
                .set_default_paths()
                .map_err(TlsError::SystemTrustUnavailable)?;
        }
        for cert in &self.certificates {
            builder.add_cert(cert.clone())?;
        }
        Ok(builder.build())
    }

    /// Check whether `cert` chains to a root in this pool
    ///
    /// Only the chain is checked; host names are not.
    pub fn verify(&self, cert: &X509Ref) -> Result<bool> {
        let store = self.to_store()?;
        let chain = Stack::<X509>::new()?;
        let mut ctx = X509StoreContext::new()?;
        Ok(ctx.init(&store, cert, &chain, |c| c.verify_cert())?)
    }
}

impl std::fmt::Debug for TrustPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustPool")
            .field("system", &self.system)
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// A source of trusted certificates
#[derive(Debug, Clone)]
pub enum CertSource {
    /// Replace the pool with an empty one
    Empty,
    /// PEM or DER encoded certificates
    Bytes(Vec<u8>),
    /// A file holding PEM or DER encoded certificates
    File(PathBuf),
    /// The chain presented by a live peer
    Peer {
        network: Network,
        address: String,
        fetcher: PeerFetcher,
    },
    /// Identity certificates of a sibling endpoint's bound settings
    Bound(Arc<TlsSettings>),
}

impl CertSource {
    pub fn peer(network: Network, address: impl Into<String>) -> Self {
        CertSource::Peer {
            network,
            address: address.into(),
            fetcher: PeerFetcher::new(),
        }
    }

    fn ingest(&self, pool: &mut TrustPool) -> Result<()> {
        match self {
            CertSource::Empty => {
                log::debug!("trust pool reset to empty");
                *pool = TrustPool::empty();
            }
            CertSource::Bytes(data) => {
                add_all(pool, &decode_certificates(data)?)?;
            }
            CertSource::File(path) => {
                log::debug!("adding certificates from {:?}", path);
                let data = read_file(path)?;
                let certs = decode_certificates(&data).map_err(|e| match e {
                    TlsError::Decode(reason) => TlsError::Decode(format!("{:?}: {}", path, reason)),
                    other => other,
                })?;
                add_all(pool, &certs)?;
            }
            CertSource::Peer {
                network,
                address,
                fetcher,
            } => {
                add_all(pool, &fetcher.fetch(*network, address)?)?;
            }
            CertSource::Bound(settings) => {
                for identity in settings.certificates() {
                    pool.add(identity.certificate())?;
                }
            }
        }
        Ok(())
    }
}

fn add_all(pool: &mut TrustPool, certs: &[X509]) -> Result<()> {
    for cert in certs {
        pool.add(cert)?;
    }
    Ok(())
}

/// Assemble a trust pool from `sources`, applied in order
///
/// Without an `existing` pool the system trust store is the seed. The first
/// failing source aborts assembly.
pub fn assemble(existing: Option<TrustPool>, sources: &[CertSource]) -> Result<TrustPool> {
    let mut pool = match existing {
        Some(pool) => pool,
        None => TrustPool::system()?,
    };
    for source in sources {
        source.ingest(&mut pool)?;
    }
    Ok(pool)
}
