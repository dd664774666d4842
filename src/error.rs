use std::fmt;

use crate::status::LogicStatus;

/// Outcome classes shared by every component of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied argument violates a precondition.
    InvalidParameter,
    /// An opaque handle does not refer to a live record.
    NotFound,
    /// The caller's output buffer cannot hold the result; retry with `required` bytes.
    BufferTooSmall,
    /// The untrusted side violated its contract.
    Unexpected,
    /// The cross-boundary call did not dispatch or its return channel is untrustworthy.
    MechanismFailure,
    /// A declared tensor shape cannot be resolved against the input.
    InvalidShape,
    /// Generic failure of an underlying library.
    Failure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::NotFound => "not found",
            ErrorKind::BufferTooSmall => "buffer too small",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::MechanismFailure => "mechanism failure",
            ErrorKind::InvalidShape => "invalid shape",
            ErrorKind::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// Errors from resolving a declared tensor shape against an input buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("{count} dynamic dimensions declared, at most one is supported")]
    MultipleDynamic { count: usize },

    #[error("fixed dimensions multiply to zero")]
    ZeroFixedProduct,

    #[error("{elements} elements cannot be split into rows of {fixed_product}")]
    Indivisible { elements: usize, fixed_product: usize },

    #[error("input size mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("input of {len} bytes is not a whole number of {element_size}-byte elements")]
    UnalignedInput { len: usize, element_size: usize },

    #[error("tensor shape overflow: dimensions produce more elements than representable")]
    Overflow,
}

/// Failure of the cross-boundary call itself. Never carries a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MechanismError {
    #[error("untrusted side unavailable: {0}")]
    Unavailable(String),

    #[error("untrusted handler panicked: {0}")]
    Panicked(String),

    #[error("bridge call exceeded its deadline")]
    DeadlineExceeded,

    #[error("bridge marked compromised after an earlier overrun")]
    Compromised,
}

/// Errors returned by trusted-side bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("input does not fit the model's declared tensor shape")]
    InvalidShape,

    #[error("{what} handle {handle} not found")]
    NotFound { what: &'static str, handle: u64 },

    #[error("output buffer too small: {required} bytes required, capacity {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error("untrusted side violated the call contract: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Mechanism(#[from] MechanismError),

    #[error("operation failed: {0}")]
    Failure(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            BridgeError::InvalidShape => ErrorKind::InvalidShape,
            BridgeError::NotFound { .. } => ErrorKind::NotFound,
            BridgeError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            BridgeError::Unexpected(_) => ErrorKind::Unexpected,
            BridgeError::Mechanism(_) => ErrorKind::MechanismFailure,
            BridgeError::Failure(_) => ErrorKind::Failure,
        }
    }

    /// Bytes the caller must provide to retry, if this is a `BufferTooSmall`.
    pub fn required_size(&self) -> Option<usize> {
        match self {
            BridgeError::BufferTooSmall { required, .. } => Some(*required),
            _ => None,
        }
    }

    /// Translate a non-`Ok` logic status from the untrusted side verbatim.
    ///
    /// `BufferTooSmall` is not translated here because it needs the reported size.
    pub(crate) fn from_status(status: LogicStatus, what: &'static str, handle: u64) -> Self {
        match status {
            LogicStatus::InvalidParameter => {
                BridgeError::InvalidParameter("rejected by the untrusted side")
            }
            LogicStatus::InvalidShape => BridgeError::InvalidShape,
            LogicStatus::NotFound => BridgeError::NotFound { what, handle },
            LogicStatus::Failure => BridgeError::Failure(format!("untrusted {what} call failed")),
            LogicStatus::Ok | LogicStatus::BufferTooSmall | LogicStatus::Unexpected => {
                BridgeError::Unexpected(format!("untrusted side returned {status} from {what}"))
            }
        }
    }
}

/// Errors raised by an inference engine on the untrusted side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("inference failed: {0}")]
    RunFailed(String),

    #[error("engine shutdown failed: {0}")]
    ShutdownFailed(String),
}

/// Errors from the attestation library seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestError {
    #[error("no attestation library configured")]
    NotConfigured,

    #[error("no supported evidence format in the preference list")]
    NoSupportedFormat,

    #[error("evidence format {0} not supported by this generator")]
    UnsupportedFormat(String),

    #[error("evidence generation failed: {0}")]
    GenerationFailed(String),
}

/// All-or-nothing failure of an evidence request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvidenceError {
    #[error("attestation evidence unavailable: {0}")]
    Failure(#[from] AttestError),
}

/// Errors from classifying an output embedding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("embedding of {len} bytes is not a whole number of f32 values")]
    UnalignedEmbedding { len: usize },

    #[error("embedding has {actual} dimensions, references have {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("reference embeddings must be non-empty and of equal width")]
    InvalidReferences,
}

/// Errors from handle registries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("handle space exhausted")]
    Exhausted,

    #[error("record already bound to a live handle")]
    AlreadyBound,
}
