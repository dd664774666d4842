pub mod attestation;
pub mod bridge;
pub mod classify;
pub mod error;
pub mod host;
pub mod registry;
pub mod status;
pub mod tensor;

// Re-export key types at crate root for convenience.
pub use error::{
    AttestError, BridgeError, ClassifyError, EngineError, ErrorKind, EvidenceError,
    MechanismError, ShapeError,
};
pub use registry::{DelegateHandle, Handle, SessionHandle};
pub use status::LogicStatus;
pub use tensor::{DType, TensorRef, TensorSpec};

pub use attestation::{Evidence, EvidenceFormat, EvidenceGenerator, EvidenceProvider};
pub use bridge::deadline::DeadlineBridge;
pub use bridge::{Bridge, BridgeConfig, HostCalls, Termination};
pub use classify::{Classification, Sentiment, SentimentClassifier};
pub use host::engine::{EngineSession, InferenceEngine};
pub use host::DelegateHost;

#[cfg(feature = "mock")]
pub use attestation::mock::MockEvidenceGenerator;
#[cfg(feature = "mock")]
pub use host::mock::MockEngine;
