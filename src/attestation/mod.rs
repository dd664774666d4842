#[cfg(feature = "mock")]
pub mod mock;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::{AttestError, EvidenceError};

/// Evidence encodings an attestation library may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceFormat {
    /// ECDSA-signed quote, verifiable by a remote party.
    SgxEcdsa,
    /// Local report, verifiable only by another enclave on the same platform.
    SgxLocal,
}

impl EvidenceFormat {
    /// Remote-verifiable format first, local fallback second.
    pub const DEFAULT_PREFERENCE: [EvidenceFormat; 2] =
        [EvidenceFormat::SgxEcdsa, EvidenceFormat::SgxLocal];

    pub const fn is_remote_verifiable(self) -> bool {
        matches!(self, EvidenceFormat::SgxEcdsa)
    }

    pub const fn tag(self) -> u8 {
        match self {
            EvidenceFormat::SgxEcdsa => 1,
            EvidenceFormat::SgxLocal => 2,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EvidenceFormat::SgxEcdsa),
            2 => Some(EvidenceFormat::SgxLocal),
            _ => None,
        }
    }
}

impl fmt::Display for EvidenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceFormat::SgxEcdsa => f.write_str("sgx-ecdsa"),
            EvidenceFormat::SgxLocal => f.write_str("sgx-local"),
        }
    }
}

/// Attestation library running inside the trusted side.
///
/// Requests carry no custom claims and no endorsements.
pub trait EvidenceGenerator: Send + Sync {
    fn supports(&self, format: EvidenceFormat) -> bool;

    fn generate(&self, format: EvidenceFormat) -> Result<Vec<u8>, AttestError>;
}

/// Evidence blob owned by the caller. Dropping it releases the buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Evidence {
    format: EvidenceFormat,
    raw: Bytes,
}

impl Evidence {
    pub fn new(format: EvidenceFormat, raw: Bytes) -> Self {
        Self { format, raw }
    }

    pub fn format(&self) -> EvidenceFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.raw
    }

    /// SHA-256 of the raw evidence.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.raw).into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

impl fmt::Debug for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evidence")
            .field("format", &self.format)
            .field("len", &self.raw.len())
            .field("fingerprint", &hex::encode(self.fingerprint()))
            .finish()
    }
}

/// Produces evidence on demand. Holds no per-call state.
#[derive(Clone)]
pub struct EvidenceProvider {
    generator: Arc<dyn EvidenceGenerator>,
    preferences: Vec<EvidenceFormat>,
}

impl EvidenceProvider {
    pub fn new(generator: Arc<dyn EvidenceGenerator>, preferences: Vec<EvidenceFormat>) -> Self {
        Self {
            generator,
            preferences,
        }
    }

    /// First format in the preference list the generator supports.
    pub fn select_format(&self) -> Result<EvidenceFormat, AttestError> {
        self.preferences
            .iter()
            .copied()
            .find(|&format| self.generator.supports(format))
            .ok_or(AttestError::NoSupportedFormat)
    }

    /// Generate evidence. Any failure yields no evidence at all.
    pub fn get_evidence(&self) -> Result<Evidence, EvidenceError> {
        let result = self.select_format().and_then(|format| {
            let raw = self.generator.generate(format)?;
            if raw.is_empty() {
                return Err(AttestError::GenerationFailed(
                    "attestation library returned empty evidence".into(),
                ));
            }
            Ok(Evidence::new(format, Bytes::from(raw)))
        });

        match result {
            Ok(evidence) => {
                tracing::info!(
                    format = %evidence.format(),
                    len = evidence.len(),
                    fingerprint = %hex::encode(evidence.fingerprint()),
                    "attestation evidence generated"
                );
                Ok(evidence)
            }
            Err(e) => {
                tracing::warn!(error = %e, "attestation evidence unavailable");
                Err(EvidenceError::Failure(e))
            }
        }
    }
}

impl fmt::Debug for EvidenceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceProvider")
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LocalOnly;

    impl EvidenceGenerator for LocalOnly {
        fn supports(&self, format: EvidenceFormat) -> bool {
            format == EvidenceFormat::SgxLocal
        }

        fn generate(&self, format: EvidenceFormat) -> Result<Vec<u8>, AttestError> {
            Ok(vec![format.tag(); 8])
        }
    }

    struct Broken;

    impl EvidenceGenerator for Broken {
        fn supports(&self, _: EvidenceFormat) -> bool {
            true
        }

        fn generate(&self, _: EvidenceFormat) -> Result<Vec<u8>, AttestError> {
            Err(AttestError::GenerationFailed("quoting enclave unreachable".into()))
        }
    }

    struct Silent;

    impl EvidenceGenerator for Silent {
        fn supports(&self, _: EvidenceFormat) -> bool {
            true
        }

        fn generate(&self, _: EvidenceFormat) -> Result<Vec<u8>, AttestError> {
            Ok(Vec::new())
        }
    }

    fn provider(generator: impl EvidenceGenerator + 'static) -> EvidenceProvider {
        EvidenceProvider::new(
            Arc::new(generator),
            EvidenceFormat::DEFAULT_PREFERENCE.to_vec(),
        )
    }

    #[test]
    fn falls_back_to_local_format() {
        let evidence = provider(LocalOnly).get_evidence().unwrap();
        assert_eq!(evidence.format(), EvidenceFormat::SgxLocal);
        assert_eq!(evidence.as_bytes(), &[2u8; 8]);
    }

    #[test]
    fn no_supported_format_is_failure() {
        let p = EvidenceProvider::new(Arc::new(LocalOnly), vec![EvidenceFormat::SgxEcdsa]);
        assert_eq!(
            p.get_evidence().unwrap_err(),
            EvidenceError::Failure(AttestError::NoSupportedFormat)
        );
    }

    #[test]
    fn generation_error_is_failure() {
        assert!(provider(Broken).get_evidence().is_err());
    }

    #[test]
    fn empty_evidence_is_failure() {
        assert!(provider(Silent).get_evidence().is_err());
    }

    #[test]
    fn format_tags_roundtrip() {
        for format in EvidenceFormat::DEFAULT_PREFERENCE {
            assert_eq!(EvidenceFormat::from_tag(format.tag()), Some(format));
        }
        assert_eq!(EvidenceFormat::from_tag(0), None);
    }
}
