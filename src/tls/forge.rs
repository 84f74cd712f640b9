//! Ephemeral self-signed certificates
//!
//! [`forge`] builds a certificate for the host part of an address, signed
//! with a freshly generated key. The certificate is its own issuer and is
//! marked as a CA so that adding it to a trust pool is enough for a client
//! to accept a server presenting it.

use super::algorithm::KeyAlgorithm;
use super::error::TlsError;
use super::serial::SerialNumberSource;
use super::Result;
use openssl::asn1::{Asn1Time, Asn1Type};
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Name, X509Ref, X509};
use std::net::IpAddr;
use std::time::Duration;

const X509_VERSION_3: i32 = 2;

/// A certificate together with its private key
#[derive(Clone)]
pub struct CertifiedKey {
    certificate: X509,
    key: PKey<Private>,
}

impl CertifiedKey {
    /// Pair a certificate with its private key, checking that they belong together
    pub fn new(certificate: X509, key: PKey<Private>) -> Result<Self> {
        let public = certificate.public_key()?;
        if !public.public_eq(&key) {
            return Err(TlsError::InvalidConfig(
                "certificate and private key do not match".to_string(),
            ));
        }
        Ok(CertifiedKey { certificate, key })
    }

    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }

    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.key
    }

    /// Concrete algorithm of the certificate key
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        KeyAlgorithm::of_key(&self.key)
    }
}

impl std::fmt::Debug for CertifiedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertifiedKey")
            .field("certificate", &self.certificate)
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Forge a self-signed certificate for `address`
///
/// The address may be a bare host, `host:port`, `[ipv6]:port` or a bare IPv6
/// literal; the port is discarded. The certificate is valid from now for
/// `lifetime` and carries a serial number from the process-wide
/// [`SerialNumberSource`].
pub fn forge(address: &str, algorithm: KeyAlgorithm, lifetime: Duration) -> Result<CertifiedKey> {
    forge_with(SerialNumberSource::global(), address, algorithm, lifetime)
}

/// Forge a certificate drawing its serial number from `serials`
pub fn forge_with(
    serials: &SerialNumberSource,
    address: &str,
    algorithm: KeyAlgorithm,
    lifetime: Duration,
) -> Result<CertifiedKey> {
    log::info!(
        "generating ephemeral certificate address={} algorithm={}",
        address,
        algorithm
    );

    let host = split_host(address)?;
    let key = algorithm.generate()?.into_private_key();
    let certificate = build_certificate(serials, host, &key, algorithm, lifetime).map_err(
        |source| TlsError::CertificateEncoding {
            host: host.to_string(),
            source,
        },
    )?;

    Ok(CertifiedKey { certificate, key })
}

fn build_certificate(
    serials: &SerialNumberSource,
    host: &str,
    key: &PKeyRef<Private>,
    algorithm: KeyAlgorithm,
    lifetime: Duration,
) -> std::result::Result<X509, ErrorStack> {
    let mut builder = X509::builder()?;
    builder.set_version(X509_VERSION_3)?;

    let serial = BigNum::from_slice(&serials.next().to_be_bytes())?;
    let serial = serial.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;

    // UTF8String skips the 64 character limit of the CN string table
    let mut name = X509Name::builder()?;
    name.append_entry_by_nid_with_type(Nid::COMMONNAME, host, Asn1Type::UTF8STRING)?;
    let name = name.build();
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;

    // Both bounds come from OpenSSL's clock, the one verification uses
    let not_before = Asn1Time::days_from_now(0)?;
    let elapsed = Asn1Time::from_unix(0)?.diff(&not_before)?;
    let now = i64::from(elapsed.days) * 86_400 + i64::from(elapsed.secs);
    let not_after = Asn1Time::from_unix(now.saturating_add(lifetime_secs(lifetime)) as libc::time_t)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;

    builder.set_pubkey(key)?;

    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_cert_sign()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;

    let mut san = SubjectAlternativeName::new();
    if host.parse::<IpAddr>().is_ok() {
        san.ip(host);
    } else {
        san.dns(host);
    }
    let san = san.build(&builder.x509v3_context(None, None))?;
    builder.append_extension(san)?;

    let skid = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(skid)?;

    builder.sign(key, algorithm.signature_digest())?;
    Ok(builder.build())
}

/// Whole seconds covering `lifetime`, rounded up
fn lifetime_secs(lifetime: Duration) -> i64 {
    let secs = lifetime
        .as_secs()
        .saturating_add(u64::from(lifetime.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Strip an optional port from `address`
pub(crate) fn split_host(address: &str) -> Result<&str> {
    let invalid = |reason: &str| TlsError::AddressParse {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let host = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        match tail.strip_prefix(':') {
            None if tail.is_empty() => host,
            Some(port) if !port.contains(':') => host,
            _ => return Err(invalid("unexpected characters after ']'")),
        }
    } else {
        match address.matches(':').count() {
            0 => address,
            1 => address.split_once(':').map(|(host, _)| host).unwrap_or(address),
            _ if address.parse::<IpAddr>().is_ok() => address,
            _ => return Err(invalid("too many colons in address")),
        }
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok(host)
}
