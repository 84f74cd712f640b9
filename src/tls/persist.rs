//! Certificate file persistence
//!
//! A certified key is stored as two PEM files: `<name>.crt` holding the
//! certificate and `<name>.key` holding the PKCS#8 private key.

use super::error::TlsError;
use super::forge::CertifiedKey;
use super::Result;
use openssl::pkey::PKey;
use openssl::x509::X509;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Write `cert` below `dir`, returning the certificate and key file paths
pub fn write_certificate<P: AsRef<Path>>(
    cert: &CertifiedKey,
    dir: P,
    name: &str,
) -> Result<(PathBuf, PathBuf)> {
    let cert_path = dir.as_ref().join(format!("{}.crt", name));
    let key_path = dir.as_ref().join(format!("{}.key", name));

    let cert_pem = cert.certificate().to_pem()?;
    let key_pem = cert.private_key().private_key_to_pem_pkcs8()?;

    write_file(&cert_path, &cert_pem, 0o644)?;
    write_file(&key_path, &key_pem, 0o600)?;

    log::info!(
        "wrote certificate {:?} and key {:?}",
        cert_path,
        key_path
    );
    Ok((cert_path, key_path))
}

/// Load a certified key written by [`write_certificate`]
pub fn load_certificate<P: AsRef<Path>, Q: AsRef<Path>>(
    cert_path: P,
    key_path: Q,
) -> Result<CertifiedKey> {
    let cert_pem = read_file(cert_path.as_ref())?;
    let key_pem = read_file(key_path.as_ref())?;

    let cert = X509::from_pem(&cert_pem).map_err(|e| {
        TlsError::Decode(format!(
            "failed to load certificate {:?}: {}",
            cert_path.as_ref(),
            e
        ))
    })?;
    let key = PKey::private_key_from_pem(&key_pem).map_err(|e| {
        TlsError::Decode(format!(
            "failed to load private key {:?}: {}",
            key_path.as_ref(),
            e
        ))
    })?;

    CertifiedKey::new(cert, key)
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| TlsError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let wrap = |source: std::io::Error| TlsError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(wrap)?;
    file.write_all(data).map_err(wrap)
}
