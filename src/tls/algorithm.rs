//! Key algorithms for certificate key generation
//!
//! Every supported algorithm resolves to exactly one generation strategy
//! through a single exhaustive mapping. Unknown identifiers are rejected when
//! parsed; there is no fallback to the default algorithm.

use super::error::TlsError;
use super::Result;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use std::fmt;
use std::str::FromStr;

/// Supported key algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyAlgorithm {
    /// ECDSA over P-256
    #[default]
    Default,
    Rsa2048,
    Rsa3072,
    Rsa4096,
    Rsa8192,
    Ecdsa224,
    Ecdsa256,
    Ecdsa384,
    Ecdsa521,
    Ed25519,
}

/// How a key of a given algorithm is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStrategy {
    Rsa(u32),
    Ec(Nid),
    Ed25519,
}

impl KeyAlgorithm {
    /// All algorithms, the default alias included
    pub const ALL: [KeyAlgorithm; 10] = [
        KeyAlgorithm::Default,
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::Rsa3072,
        KeyAlgorithm::Rsa4096,
        KeyAlgorithm::Rsa8192,
        KeyAlgorithm::Ecdsa224,
        KeyAlgorithm::Ecdsa256,
        KeyAlgorithm::Ecdsa384,
        KeyAlgorithm::Ecdsa521,
        KeyAlgorithm::Ed25519,
    ];

    /// Get the algorithm identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Default => "default",
            KeyAlgorithm::Rsa2048 => "rsa2048",
            KeyAlgorithm::Rsa3072 => "rsa3072",
            KeyAlgorithm::Rsa4096 => "rsa4096",
            KeyAlgorithm::Rsa8192 => "rsa8192",
            KeyAlgorithm::Ecdsa224 => "ecdsa224",
            KeyAlgorithm::Ecdsa256 => "ecdsa256",
            KeyAlgorithm::Ecdsa384 => "ecdsa384",
            KeyAlgorithm::Ecdsa521 => "ecdsa521",
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }

    /// Resolve the default alias to its concrete algorithm
    pub fn resolve(self) -> KeyAlgorithm {
        match self {
            KeyAlgorithm::Default => KeyAlgorithm::Ecdsa256,
            other => other,
        }
    }

    fn strategy(self) -> KeyStrategy {
        match self {
            KeyAlgorithm::Rsa2048 => KeyStrategy::Rsa(2048),
            KeyAlgorithm::Rsa3072 => KeyStrategy::Rsa(3072),
            KeyAlgorithm::Rsa4096 => KeyStrategy::Rsa(4096),
            KeyAlgorithm::Rsa8192 => KeyStrategy::Rsa(8192),
            KeyAlgorithm::Ecdsa224 => KeyStrategy::Ec(Nid::SECP224R1),
            KeyAlgorithm::Default | KeyAlgorithm::Ecdsa256 => KeyStrategy::Ec(Nid::X9_62_PRIME256V1),
            KeyAlgorithm::Ecdsa384 => KeyStrategy::Ec(Nid::SECP384R1),
            KeyAlgorithm::Ecdsa521 => KeyStrategy::Ec(Nid::SECP521R1),
            KeyAlgorithm::Ed25519 => KeyStrategy::Ed25519,
        }
    }

    /// Digest used when self-signing with a key of this algorithm
    ///
    /// Ed25519 signs the message directly and takes the null digest.
    pub fn signature_digest(self) -> MessageDigest {
        match self.resolve() {
            KeyAlgorithm::Ecdsa384 => MessageDigest::sha384(),
            KeyAlgorithm::Ecdsa521 => MessageDigest::sha512(),
            KeyAlgorithm::Ed25519 => MessageDigest::null(),
            _ => MessageDigest::sha256(),
        }
    }

    /// Generate a fresh key pair for this algorithm
    pub fn generate(self) -> Result<KeyPair> {
        let key = match self.strategy() {
            KeyStrategy::Rsa(bits) => Rsa::generate(bits).and_then(PKey::from_rsa),
            KeyStrategy::Ec(nid) => EcGroup::from_curve_name(nid)
                .and_then(|group| EcKey::generate(&group))
                .and_then(PKey::from_ec_key),
            KeyStrategy::Ed25519 => PKey::generate_ed25519(),
        }
        .map_err(|source| TlsError::KeyGeneration {
            algorithm: self.as_str(),
            source,
        })?;

        Ok(KeyPair {
            algorithm: self,
            key,
        })
    }

    /// Identify the concrete algorithm of an existing key
    ///
    /// Never returns [`KeyAlgorithm::Default`]; a P-256 key reports `Ecdsa256`.
    pub fn of_key<T: HasPublic>(key: &PKeyRef<T>) -> Option<KeyAlgorithm> {
        match key.id() {
            Id::RSA => match key.rsa().ok()?.size() * 8 {
                2048 => Some(KeyAlgorithm::Rsa2048),
                3072 => Some(KeyAlgorithm::Rsa3072),
                4096 => Some(KeyAlgorithm::Rsa4096),
                8192 => Some(KeyAlgorithm::Rsa8192),
                _ => None,
            },
            Id::EC => match key.ec_key().ok()?.group().curve_name()? {
                Nid::SECP224R1 => Some(KeyAlgorithm::Ecdsa224),
                Nid::X9_62_PRIME256V1 => Some(KeyAlgorithm::Ecdsa256),
                Nid::SECP384R1 => Some(KeyAlgorithm::Ecdsa384),
                Nid::SECP521R1 => Some(KeyAlgorithm::Ecdsa521),
                _ => None,
            },
            Id::ED25519 => Some(KeyAlgorithm::Ed25519),
            _ => None,
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = TlsError;

    /// Parse an algorithm identifier (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        KeyAlgorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TlsError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated private key and the algorithm it was generated for
pub struct KeyPair {
    algorithm: KeyAlgorithm,
    key: PKey<Private>,
}

impl KeyPair {
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Private key (carries the public half as well)
    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.key
    }

    /// DER encoded SubjectPublicKeyInfo
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.key.public_key_to_der()?)
    }

    pub fn into_private_key(self) -> PKey<Private> {
        self.key
    }
}
