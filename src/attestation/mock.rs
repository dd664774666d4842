use rand::Rng;
use sha2::{Digest, Sha256};

use super::{EvidenceFormat, EvidenceGenerator};
use crate::error::AttestError;

const MARKER: &[u8; 12] = b"MOCK_EVD_V1\0";
const MOCK_LEN: usize = MARKER.len() + 1 + 32 + 32;

/// Mock attestation library for testing and simulation mode.
///
/// Produces `marker || format tag || measurement || nonce`, with a fresh
/// random nonce per call.
///
/// # Security Warning
///
/// These documents carry **no cryptographic proof** and must never be
/// accepted by a production verifier. Enable only via `features = ["mock"]`.
#[derive(Debug, Clone)]
pub struct MockEvidenceGenerator {
    measurement: [u8; 32],
    formats: Vec<EvidenceFormat>,
    fail: bool,
}

impl MockEvidenceGenerator {
    pub fn new(measurement: [u8; 32]) -> Self {
        Self {
            measurement,
            formats: EvidenceFormat::DEFAULT_PREFERENCE.to_vec(),
            fail: false,
        }
    }

    /// Use the SHA-256 of a trusted binary image as the measurement.
    pub fn from_binary(image: &[u8]) -> Self {
        Self::new(Sha256::digest(image).into())
    }

    /// Restrict the formats this generator claims to support.
    pub fn with_formats(mut self, formats: Vec<EvidenceFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Make every generation attempt fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn measurement(&self) -> &[u8; 32] {
        &self.measurement
    }

    /// Decode a document produced by this generator.
    pub fn parse(raw: &[u8]) -> Result<MockEvidence, AttestError> {
        if raw.len() != MOCK_LEN || !raw.starts_with(MARKER) {
            return Err(AttestError::GenerationFailed(
                "not a mock evidence document".to_string(),
            ));
        }
        let mut offset = MARKER.len();
        let format = EvidenceFormat::from_tag(raw[offset]).ok_or_else(|| {
            AttestError::GenerationFailed(format!("unknown format tag {}", raw[offset]))
        })?;
        offset += 1;

        let mut measurement = [0u8; 32];
        measurement.copy_from_slice(&raw[offset..offset + 32]);
        offset += 32;
        let mut nonce = [0u8; 32];
        nonce.copy_from_slice(&raw[offset..offset + 32]);

        Ok(MockEvidence {
            format,
            measurement,
            nonce,
        })
    }
}

/// Fields recovered from a mock evidence document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEvidence {
    pub format: EvidenceFormat,
    pub measurement: [u8; 32],
    pub nonce: [u8; 32],
}

impl EvidenceGenerator for MockEvidenceGenerator {
    fn supports(&self, format: EvidenceFormat) -> bool {
        self.formats.contains(&format)
    }

    fn generate(&self, format: EvidenceFormat) -> Result<Vec<u8>, AttestError> {
        if self.fail {
            return Err(AttestError::GenerationFailed("mock generator fault".into()));
        }
        if !self.supports(format) {
            return Err(AttestError::UnsupportedFormat(format.to_string()));
        }

        let nonce: [u8; 32] = rand::thread_rng().gen();

        let mut raw = Vec::with_capacity(MOCK_LEN);
        raw.extend_from_slice(MARKER);
        raw.push(format.tag());
        raw.extend_from_slice(&self.measurement);
        raw.extend_from_slice(&nonce);
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_roundtrip() {
        let generator = MockEvidenceGenerator::from_binary(b"enclave image");
        let raw = generator.generate(EvidenceFormat::SgxEcdsa).unwrap();
        let parsed = MockEvidenceGenerator::parse(&raw).unwrap();
        assert_eq!(parsed.format, EvidenceFormat::SgxEcdsa);
        assert_eq!(&parsed.measurement, generator.measurement());
    }

    #[test]
    fn nonce_differs_per_call() {
        let generator = MockEvidenceGenerator::new([7u8; 32]);
        let a = generator.generate(EvidenceFormat::SgxLocal).unwrap();
        let b = generator.generate(EvidenceFormat::SgxLocal).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unsupported_format_rejected() {
        let generator =
            MockEvidenceGenerator::new([0u8; 32]).with_formats(vec![EvidenceFormat::SgxLocal]);
        assert!(!generator.supports(EvidenceFormat::SgxEcdsa));
        assert!(generator.generate(EvidenceFormat::SgxEcdsa).is_err());
    }

    #[test]
    fn mock_rejects_invalid() {
        assert!(MockEvidenceGenerator::parse(b"INVALID").is_err());
    }
}
