//! TLS settings and the option pipeline
//!
//! [`TlsSettings`] is the working value that options mutate. [`apply`] runs
//! options in order against one working copy and stops at the first error;
//! the caller only ever sees a fully applied value or the error.

use super::algorithm::KeyAlgorithm;
use super::fetch::Network;
use super::forge::{forge, CertifiedKey};
use super::persist::load_certificate;
use super::pool::{assemble, CertSource, TrustPool};
use super::registry::{ConfigRegistry, Role};
use super::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one TLS endpoint
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    certificates: Vec<CertifiedKey>,
    roots: Option<TrustPool>,
    insecure_skip_verify: bool,
}

impl TlsSettings {
    /// Identity certificates (server certificates, or the client certificate)
    pub fn certificates(&self) -> &[CertifiedKey] {
        &self.certificates
    }

    pub fn set_certificates(&mut self, certificates: Vec<CertifiedKey>) {
        self.certificates = certificates;
    }

    pub fn add_certificate(&mut self, certificate: CertifiedKey) {
        self.certificates.push(certificate);
    }

    /// Verifier roots; `None` means the library's default trust store
    pub fn roots(&self) -> Option<&TrustPool> {
        self.roots.as_ref()
    }

    pub fn set_roots(&mut self, roots: TrustPool) {
        self.roots = Some(roots);
    }

    pub fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }

    pub fn set_insecure_skip_verify(&mut self, skip: bool) {
        self.insecure_skip_verify = skip;
    }
}

/// A configuration mutator applied by the option pipeline
pub struct TlsOption(Box<dyn FnOnce(&mut TlsSettings) -> Result<()> + Send>);

impl TlsOption {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut TlsSettings) -> Result<()> + Send + 'static,
    {
        TlsOption(Box::new(f))
    }

    fn apply_to(self, settings: &mut TlsSettings) -> Result<()> {
        (self.0)(settings)
    }
}

impl std::fmt::Debug for TlsOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TlsOption")
    }
}

/// Apply `options` in order to `settings`
///
/// The first failing option aborts the run; later options are not invoked
/// and the partially mutated settings are dropped.
pub fn apply<I>(mut settings: TlsSettings, options: I) -> Result<TlsSettings>
where
    I: IntoIterator<Item = TlsOption>,
{
    for option in options {
        option.apply_to(&mut settings)?;
    }
    Ok(settings)
}

/// Disable peer certificate verification
pub fn enable_insecure_skip_verify() -> TlsOption {
    TlsOption::new(|settings| {
        settings.set_insecure_skip_verify(true);
        Ok(())
    })
}

/// Replace the identity certificates with a freshly forged one
pub fn use_ephemeral_certificate(
    address: impl Into<String>,
    algorithm: KeyAlgorithm,
    lifetime: Duration,
) -> TlsOption {
    let address = address.into();
    TlsOption::new(move |settings| {
        let certificate = forge(&address, algorithm, lifetime)?;
        settings.set_certificates(vec![certificate]);
        Ok(())
    })
}

/// Add an identity certificate loaded from PEM files
pub fn use_certificate_files(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> TlsOption {
    let (cert, key) = (cert.into(), key.into());
    TlsOption::new(move |settings| {
        settings.add_certificate(load_certificate(&cert, &key)?);
        Ok(())
    })
}

/// Trust nothing but certificates appended by later options
pub fn ignore_system_certs() -> TlsOption {
    append_certificates(vec![CertSource::Empty])
}

/// Merge `sources` into the verifier roots
///
/// Settings without roots are seeded with the system trust store first.
pub fn append_certificates(sources: Vec<CertSource>) -> TlsOption {
    TlsOption::new(move |settings| {
        let roots = assemble(settings.roots.clone(), &sources)?;
        settings.set_roots(roots);
        Ok(())
    })
}

/// Trust the certificates found in a PEM or DER file
pub fn append_certificates_from_file(path: impl Into<PathBuf>) -> TlsOption {
    append_certificates(vec![CertSource::File(path.into())])
}

/// Trust PEM or DER encoded certificates
pub fn append_certificates_from_bytes(data: impl Into<Vec<u8>>) -> TlsOption {
    append_certificates(vec![CertSource::Bytes(data.into())])
}

/// Trust whatever certificates the server at `address` presents
pub fn append_server_certificates(network: Network, address: impl Into<String>) -> TlsOption {
    append_certificates(vec![CertSource::peer(network, address)])
}

/// Trust the identity certificates currently bound for the server role
pub fn append_bound_server_certificates(registry: &ConfigRegistry) -> TlsOption {
    let registry = registry.clone();
    TlsOption::new(move |settings| {
        let bound = registry.lookup(Role::Server);
        let roots = assemble(settings.roots.clone(), &[CertSource::Bound(bound)])?;
        settings.set_roots(roots);
        Ok(())
    })
}
