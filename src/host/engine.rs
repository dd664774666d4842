use std::sync::Arc;

use crate::error::EngineError;
use crate::tensor::{TensorRef, TensorSpec};

/// Loads models into runnable sessions. Implemented by the numeric runtime.
pub trait InferenceEngine: Send + Sync {
    fn load(&self, model: &[u8]) -> Result<Arc<dyn EngineSession>, EngineError>;
}

/// A loaded model plus whatever allocator state it needs.
///
/// `run` takes `&self` and sessions must be `Sync`: two calls against the same
/// session can overlap, so an engine that is not reentrant has to serialize
/// internally. The bridge provides no per-session locking.
pub trait EngineSession: Send + Sync {
    /// Declared input tensor. At most one dimension may be dynamic.
    fn input_spec(&self) -> &TensorSpec;

    /// Execute the model and return the raw output bytes.
    fn run(&self, input: TensorRef<'_>) -> Result<Vec<u8>, EngineError>;

    /// Release engine-held resources ahead of drop.
    fn shutdown(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
