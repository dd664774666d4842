use crate::attestation::EvidenceFormat;
use crate::error::BridgeError;

/// Default maximum model size: 512 MiB.
pub const DEFAULT_MAX_MODEL_SIZE: usize = 512 * 1024 * 1024;

/// Default maximum input and output size: 32 MiB.
pub const DEFAULT_MAX_TENSOR_SIZE: usize = 32 * 1024 * 1024;

/// Limits and preferences for a [`Bridge`](super::Bridge).
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Largest model accepted by `load_model` (default: 512 MiB).
    pub max_model_size: usize,

    /// Largest input accepted by `infer` (default: 32 MiB).
    pub max_input_size: usize,

    /// Largest output capacity a caller may declare (default: 32 MiB).
    /// Bounds the trusted-side staging buffer.
    pub max_output_capacity: usize,

    /// Evidence formats in order of preference.
    pub evidence_formats: Vec<EvidenceFormat>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_model_size: DEFAULT_MAX_MODEL_SIZE,
            max_input_size: DEFAULT_MAX_TENSOR_SIZE,
            max_output_capacity: DEFAULT_MAX_TENSOR_SIZE,
            evidence_formats: EvidenceFormat::DEFAULT_PREFERENCE.to_vec(),
        }
    }
}

impl BridgeConfig {
    /// Create a builder for constructing a `BridgeConfig`.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self {
            config: BridgeConfig::default(),
        }
    }
}

impl BridgeConfigBuilder {
    pub fn max_model_size(mut self, size: usize) -> Self {
        self.config.max_model_size = size;
        self
    }

    pub fn max_input_size(mut self, size: usize) -> Self {
        self.config.max_input_size = size;
        self
    }

    pub fn max_output_capacity(mut self, size: usize) -> Self {
        self.config.max_output_capacity = size;
        self
    }

    pub fn evidence_formats(mut self, formats: Vec<EvidenceFormat>) -> Self {
        self.config.evidence_formats = formats;
        self
    }

    /// Build the `BridgeConfig`, validating that all values are sensible.
    pub fn build(self) -> Result<BridgeConfig, BridgeError> {
        let c = &self.config;
        if c.max_model_size == 0 {
            return Err(BridgeError::InvalidParameter("max_model_size must be > 0"));
        }
        if c.max_input_size == 0 {
            return Err(BridgeError::InvalidParameter("max_input_size must be > 0"));
        }
        if c.max_output_capacity == 0 {
            return Err(BridgeError::InvalidParameter(
                "max_output_capacity must be > 0",
            ));
        }
        if c.evidence_formats.is_empty() {
            return Err(BridgeError::InvalidParameter(
                "evidence_formats must not be empty",
            ));
        }
        Ok(self.config)
    }
}
